//! Spreadsheet-style export of harvested records
//!
//! An export is a directory acting as a workbook: one CSV sheet per plan,
//! rows ordered by age, plus a `manifest.json` describing every sheet.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::types::{PersistedRecord, QuoteField};
use crate::{Error, Result};

/// Name of the manifest written next to the sheets
pub const MANIFEST_FILE: &str = "manifest.json";

/// Rows belonging to one plan
#[derive(Debug, Clone)]
pub struct Sheet {
    pub plan_name: String,
    pub rows: Vec<PersistedRecord>,
}

impl Sheet {
    pub fn new(plan_name: impl Into<String>, rows: Vec<PersistedRecord>) -> Self {
        Self {
            plan_name: plan_name.into(),
            rows,
        }
    }
}

/// Summary of one written sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSummary {
    /// Grouping key the sheet was built from
    pub plan_name: String,
    pub sheet_name: String,
    pub path: PathBuf,
    pub rows: usize,
    pub empty_rows: usize,
}

/// Result of an export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportReport {
    pub location: PathBuf,
    pub sheets: Vec<SheetSummary>,
}

impl ExportReport {
    pub fn total_rows(&self) -> usize {
        self.sheets.iter().map(|s| s.rows).sum()
    }
}

/// Sheet name for a plan: spaces become underscores, anything that is not
/// safe in a file name is replaced as well.
pub fn sheet_name(plan_name: &str) -> String {
    let name: String = plan_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if name.is_empty() {
        "plan".to_string()
    } else {
        name
    }
}

/// Write every sheet into `dir`, creating it if needed
pub fn write_workbook(dir: &Path, sheets: &[Sheet]) -> Result<ExportReport> {
    std::fs::create_dir_all(dir)?;

    let mut used = HashSet::new();
    let mut summaries = Vec::with_capacity(sheets.len());

    for sheet in sheets {
        let base = sheet_name(&sheet.plan_name);
        let mut name = base.clone();
        let mut suffix = 2;
        while !used.insert(name.to_lowercase()) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }

        let path = dir.join(format!("{name}.csv"));
        std::fs::write(&path, render_sheet(&sheet.rows))?;

        summaries.push(SheetSummary {
            plan_name: sheet.plan_name.clone(),
            sheet_name: name,
            path,
            rows: sheet.rows.len(),
            empty_rows: sheet.rows.iter().filter(|r| r.is_empty()).count(),
        });
    }

    let report = ExportReport {
        location: dir.to_path_buf(),
        sheets: summaries,
    };

    let manifest = serde_json::to_string_pretty(&report)?;
    std::fs::write(dir.join(MANIFEST_FILE), manifest)
        .map_err(|e| Error::Export(format!("failed to write manifest: {e}")))?;

    Ok(report)
}

/// Render one sheet as CSV text
fn render_sheet(rows: &[PersistedRecord]) -> String {
    let mut out = String::from("age");
    for field in QuoteField::ALL {
        out.push(',');
        out.push_str(field.column());
    }
    out.push_str(",captured_at\n");

    for row in rows {
        out.push_str(&row.age.to_string());
        for field in QuoteField::ALL {
            out.push(',');
            out.push_str(&csv_escape(row.result.value_or_blank(field)));
        }
        out.push(',');
        out.push_str(&row.captured_at.to_rfc3339());
        out.push('\n');
    }

    out
}

/// Quote a CSV value containing a separator, a quote or a line break
fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
