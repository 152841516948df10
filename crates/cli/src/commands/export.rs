//! Export Command

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use quoteharvest_common::QuoteStore;

use super::{load_config, open_database};
use crate::output::{print_list, print_success, print_warning, OutputFormat};

#[derive(Args)]
pub struct ExportArgs {
    /// Database path (overrides the config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Export directory (overrides the config file)
    #[arg(long)]
    export_dir: Option<PathBuf>,
}

pub async fn execute(args: ExportArgs, config_path: &Path, format: OutputFormat) -> Result<()> {
    let config = load_config(config_path)?;
    let db = open_database(&config, args.database.as_ref())?;

    if db.count()? == 0 {
        print_warning("The database holds no records; writing an empty export");
    }

    let dir = args.export_dir.unwrap_or(config.export_dir);
    let report = db
        .export(&dir)
        .with_context(|| format!("Failed to export to {}", dir.display()))?;

    print_list(&report.sheets, format);
    print_success(&format!(
        "Exported {} row(s) in {} sheet(s) to {}",
        report.total_rows(),
        report.sheets.len(),
        report.location.display()
    ));
    Ok(())
}
