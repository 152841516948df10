//! QuoteHarvest Common Library
//!
//! Shared record types, the append-only SQLite store and the workbook
//! exporter used by the harvester and the CLI.

pub mod db;
pub mod error;
pub mod export;
pub mod types;

pub use db::{Database, QuoteStore};
pub use error::{Error, Result};
pub use export::{ExportReport, SheetSummary};
pub use types::*;

/// Default working directory
pub fn default_store_path() -> std::path::PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(".quoteharvest")
}

/// Default database path
pub fn default_db_path() -> std::path::PathBuf {
    default_store_path().join("quotes.db")
}

/// Default export directory
pub fn default_export_dir() -> std::path::PathBuf {
    default_store_path().join("export")
}

/// Default configuration file path
pub fn default_config_path() -> std::path::PathBuf {
    default_store_path().join("config.toml")
}

/// Home directory helper
mod dirs {
    pub fn home_dir() -> Option<std::path::PathBuf> {
        std::env::var_os("HOME").map(std::path::PathBuf::from)
    }
}
