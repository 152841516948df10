//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use quoteharvest_common::{PersistedRecord, QuoteField, SheetSummary};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for PersistedRecord {
    fn headers() -> Vec<&'static str> {
        vec![
            "ID",
            "Product",
            "Plan",
            "Age",
            "Insured sum",
            "Net premium",
            "First payment",
            "Captured",
        ]
    }

    fn row(&self) -> Vec<String> {
        let figure = |field| {
            if self.is_empty() {
                "-".to_string()
            } else {
                self.result.value_or_blank(field).to_string()
            }
        };

        vec![
            self.id.map(|id| id.to_string()).unwrap_or_default(),
            self.product_name.clone(),
            self.plan_name.clone(),
            self.age.to_string(),
            figure(QuoteField::InsuredSum),
            figure(QuoteField::AnnualNetPremium),
            figure(QuoteField::FirstPayment),
            self.captured_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ]
    }
}

impl TableDisplay for SheetSummary {
    fn headers() -> Vec<&'static str> {
        vec!["Plan", "Sheet", "Rows", "Empty", "Path"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.plan_name.clone(),
            self.sheet_name.clone(),
            self.rows.to_string(),
            self.empty_rows.to_string(),
            self.path.display().to_string(),
        ]
    }
}

fn render_table<T: TableDisplay>(items: &[T]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(T::headers());
    for item in items {
        table.add_row(item.row());
    }
    table
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table if items.is_empty() => println!("No items found."),
        OutputFormat::Table => println!("{}", render_table(items)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "!".yellow().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use quoteharvest_common::QuoteResult;

    #[test]
    fn test_record_row_matches_headers() {
        let record = PersistedRecord::new(
            "Alfa Medical",
            "Pleno",
            42,
            QuoteResult::empty()
                .with(QuoteField::InsuredSum, "$100,000.00")
                .with(QuoteField::AnnualNetPremium, "$9,876.50"),
        );

        let row = record.row();
        assert_eq!(row.len(), PersistedRecord::headers().len());
        assert_eq!(row[0], "");
        assert_eq!(row[3], "42");
        assert_eq!(row[4], "$100,000.00");
        assert_eq!(row[6], "");
    }

    #[test]
    fn test_empty_record_shows_dashes() {
        let record = PersistedRecord::new("Alfa Medical", "Pleno", 1, QuoteResult::empty());
        let row = record.row();
        assert_eq!(row[4], "-");
        assert_eq!(row[5], "-");
    }
}
