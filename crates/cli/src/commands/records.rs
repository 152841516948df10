//! Records Command

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};

use super::{load_config, open_database};
use crate::output::{print_list, OutputFormat};

#[derive(Args)]
pub struct RecordsArgs {
    /// Only show rows for this plan
    #[arg(long)]
    plan: Option<String>,

    /// Maximum number of rows
    #[arg(long, default_value_t = 50)]
    limit: usize,

    /// Database path (overrides the config file)
    #[arg(long)]
    database: Option<PathBuf>,
}

pub async fn execute(args: RecordsArgs, config_path: &Path, format: OutputFormat) -> Result<()> {
    let config = load_config(config_path)?;
    let db = open_database(&config, args.database.as_ref())?;

    let records = db.records(args.plan.as_deref(), Some(args.limit))?;
    print_list(&records, format);
    Ok(())
}
