//! Run Command

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use quoteharvest_harvester::{Credentials, HarvestConfig, Harvester, WebDriverForm};

use super::{load_config, open_database};
use crate::output::{print_list, print_success, print_warning, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Database path (overrides the config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Export directory (overrides the config file)
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Portal username
    #[arg(long, env = "QUOTEHARVEST_USERNAME")]
    username: String,

    /// Portal password
    #[arg(long, env = "QUOTEHARVEST_PASSWORD", hide_env_values = true)]
    password: String,

    /// WebDriver endpoint
    #[arg(long)]
    webdriver_url: Option<String>,

    /// Run the browser without a window
    #[arg(long)]
    headless: bool,

    /// First age to quote
    #[arg(long)]
    min_age: Option<u32>,

    /// Last age to quote
    #[arg(long)]
    max_age: Option<u32>,
}

impl RunArgs {
    fn apply(&self, config: &mut HarvestConfig) {
        if let Some(path) = &self.database {
            config.database_path = path.clone();
        }
        if let Some(dir) = &self.export_dir {
            config.export_dir = dir.clone();
        }
        if let Some(url) = &self.webdriver_url {
            config.webdriver_url = url.clone();
        }
        if self.headless {
            config.headless = true;
        }
        if let Some(age) = self.min_age {
            config.min_age = age;
        }
        if let Some(age) = self.max_age {
            config.max_age = age;
        }
    }
}

pub async fn execute(args: RunArgs, config_path: &Path, format: OutputFormat) -> Result<()> {
    let mut config = load_config(config_path)?;
    args.apply(&mut config);
    config.validate()?;

    let db = open_database(&config, None)?;
    let driver = WebDriverForm::connect(
        &config.webdriver_url,
        config.headless,
        config.timeouts.poll_interval(),
    )
    .await
    .with_context(|| format!("Failed to start a browser session at {}", config.webdriver_url))?;
    let driver = Arc::new(driver);

    let credentials = Credentials::new(args.username, args.password);
    let harvester = Harvester::new(driver.clone(), config, credentials, db);
    let outcome = harvester.run().await;
    drop(harvester);

    if let Ok(driver) = Arc::try_unwrap(driver) {
        if let Err(e) = driver.close().await {
            warn!("Failed to close browser session: {}", e);
        }
    }

    let report = outcome?;

    print_list(&report.export.sheets, format);
    if report.persist_failures > 0 {
        print_warning(&format!(
            "{} record(s) could not be stored",
            report.persist_failures
        ));
    }
    print_success(&format!(
        "Harvested {} combination(s) ({} populated, {} empty) in {:.1}s, exported to {}",
        report.requests,
        report.populated,
        report.empty,
        report.duration_ms as f64 / 1000.0,
        report.export.location.display()
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply() {
        let args = RunArgs {
            database: Some(PathBuf::from("/tmp/q.db")),
            export_dir: None,
            username: "agent".to_string(),
            password: "s3cret".to_string(),
            webdriver_url: Some("http://localhost:4444".to_string()),
            headless: true,
            min_age: Some(18),
            max_age: Some(20),
        };
        let mut config = HarvestConfig::default();
        let export_dir = config.export_dir.clone();

        args.apply(&mut config);

        assert_eq!(config.database_path, PathBuf::from("/tmp/q.db"));
        assert_eq!(config.export_dir, export_dir);
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert!(config.headless);
        assert_eq!(config.ages().count(), 3);
    }
}
