//! CLI Commands

pub mod config;
pub mod export;
pub mod records;
pub mod run;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use quoteharvest_common::Database;
use quoteharvest_harvester::HarvestConfig;

/// Load the configuration file, falling back to defaults when it is absent
pub fn load_config(path: &Path) -> Result<HarvestConfig> {
    HarvestConfig::load(path).with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Open the record database, honoring a command-line override
pub fn open_database(config: &HarvestConfig, database: Option<&PathBuf>) -> Result<Database> {
    let path = database.unwrap_or(&config.database_path);
    Database::open(path).with_context(|| format!("Failed to open database at {}", path.display()))
}
