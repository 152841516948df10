//! Config Commands

use anyhow::{bail, Result};
use clap::Subcommand;
use std::path::Path;

use quoteharvest_harvester::HarvestConfig;

use super::load_config;
use crate::output::print_success;

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

pub async fn execute(cmd: ConfigCommands, config_path: &Path) -> Result<()> {
    match cmd {
        ConfigCommands::Init { force } => {
            if config_path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            HarvestConfig::default().save(config_path)?;
            print_success(&format!("Wrote {}", config_path.display()));
        }
        ConfigCommands::Show => {
            let config = load_config(config_path)?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        execute(ConfigCommands::Init { force: false }, &path).await.unwrap();
        assert!(path.exists());

        assert!(execute(ConfigCommands::Init { force: false }, &path).await.is_err());
        execute(ConfigCommands::Init { force: true }, &path).await.unwrap();

        let loaded = HarvestConfig::load(&path).unwrap();
        assert_eq!(loaded.products.len(), 2);
    }
}
