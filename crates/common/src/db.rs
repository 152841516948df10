//! SQLite database for harvested quote records

use crate::export::{self, ExportReport, Sheet};
use crate::types::{PersistedRecord, QuoteField, QuoteResult};
use crate::{Error, Result};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Append-only sink for harvested records.
///
/// Rows are never updated or deleted; running a harvest twice adds a second
/// set of rows.
pub trait QuoteStore: Send + Sync {
    /// Persist one record, returning its row id
    fn append_record(&self, record: &PersistedRecord) -> Result<i64>;

    /// Export all stored rows into `dir`, one sheet per plan ordered by age
    fn export(&self, dir: &Path) -> Result<ExportReport>;
}

/// Database wrapper for record persistence
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path.as_ref())?;

        // Records are flushed after every age; WAL keeps that cheap
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.init_schema()?;

        info!("Opened database at {:?}", path.as_ref());
        Ok(db)
    }

    /// Open in-memory database (for testing)
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        // A NULL figure means "not captured", an empty string means the
        // control rendered blank.
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS quote_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                product_name TEXT NOT NULL,
                plan_name TEXT NOT NULL,
                age INTEGER NOT NULL,
                insured_sum TEXT,
                annual_basic_premium TEXT,
                annual_benefits_premium TEXT,
                policy_fee TEXT,
                vat TEXT,
                annual_net_premium TEXT,
                first_payment TEXT,
                captured_at INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_quote_records_plan ON quote_records(plan_name, age);
            CREATE INDEX IF NOT EXISTS idx_quote_records_captured ON quote_records(captured_at);
            "#,
        )?;

        debug!("Database schema initialized");
        Ok(())
    }

    /// Insert a record
    pub fn insert_record(&self, record: &PersistedRecord) -> Result<i64> {
        let conn = self.conn.lock();
        let figure = |field: QuoteField| record.result.get(field).map(str::to_string);

        conn.execute(
            "INSERT INTO quote_records (
                product_name, plan_name, age, insured_sum, annual_basic_premium,
                annual_benefits_premium, policy_fee, vat, annual_net_premium,
                first_payment, captured_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.product_name,
                record.plan_name,
                record.age,
                figure(QuoteField::InsuredSum),
                figure(QuoteField::AnnualBasicPremium),
                figure(QuoteField::AnnualBenefitsPremium),
                figure(QuoteField::PolicyFee),
                figure(QuoteField::Vat),
                figure(QuoteField::AnnualNetPremium),
                figure(QuoteField::FirstPayment),
                record.captured_at.timestamp_millis(),
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(
            "Inserted record {} for plan {} age {}",
            id, record.plan_name, record.age
        );
        Ok(id)
    }

    /// List records, newest first, optionally for a single plan
    pub fn records(&self, plan_name: Option<&str>, limit: Option<usize>) -> Result<Vec<PersistedRecord>> {
        let conn = self.conn.lock();
        let limit = limit.map(|l| l as i64).unwrap_or(-1);

        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM quote_records
             WHERE (?1 IS NULL OR plan_name = ?1)
             ORDER BY captured_at DESC, id DESC
             LIMIT ?2"
        ))?;

        let rows = stmt.query_map(params![plan_name, limit], RawRecord::from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.parse()?);
        }
        Ok(results)
    }

    /// Records for one plan ordered by age, oldest capture first within an age
    pub fn records_by_age(&self, plan_name: &str) -> Result<Vec<PersistedRecord>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORD_COLUMNS} FROM quote_records
             WHERE plan_name = ?1
             ORDER BY age ASC, id ASC"
        ))?;

        let rows = stmt.query_map(params![plan_name], RawRecord::from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?.parse()?);
        }
        Ok(results)
    }

    /// Distinct plan names in the order they were first stored
    pub fn plan_names(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();

        let mut stmt = conn.prepare(
            "SELECT plan_name FROM quote_records GROUP BY plan_name ORDER BY MIN(id)",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(names)
    }

    /// Total number of stored records
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM quote_records", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl QuoteStore for Database {
    fn append_record(&self, record: &PersistedRecord) -> Result<i64> {
        self.insert_record(record)
    }

    fn export(&self, dir: &Path) -> Result<ExportReport> {
        let mut sheets = Vec::new();
        for plan_name in self.plan_names()? {
            let rows = self.records_by_age(&plan_name)?;
            sheets.push(Sheet::new(plan_name, rows));
        }

        let report = export::write_workbook(dir, &sheets)?;
        info!(
            "Exported {} sheet(s) to {}",
            report.sheets.len(),
            report.location.display()
        );
        Ok(report)
    }
}

const RECORD_COLUMNS: &str = "id, product_name, plan_name, age, insured_sum, \
    annual_basic_premium, annual_benefits_premium, policy_fee, vat, \
    annual_net_premium, first_payment, captured_at";

/// Raw database row before parsing
struct RawRecord {
    id: i64,
    product_name: String,
    plan_name: String,
    age: i64,
    figures: [Option<String>; 7],
    captured_at: i64,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(RawRecord {
            id: row.get(0)?,
            product_name: row.get(1)?,
            plan_name: row.get(2)?,
            age: row.get(3)?,
            figures: [
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
                row.get(10)?,
            ],
            captured_at: row.get(11)?,
        })
    }

    fn parse(self) -> Result<PersistedRecord> {
        let mut result = QuoteResult::empty();
        for (field, value) in QuoteField::ALL.iter().zip(self.figures) {
            if let Some(value) = value {
                result.insert(*field, value);
            }
        }

        let captured_at = Utc
            .timestamp_millis_opt(self.captured_at)
            .single()
            .ok_or_else(|| {
                Error::CorruptRecord(format!(
                    "record {} has invalid timestamp {}",
                    self.id, self.captured_at
                ))
            })?;

        Ok(PersistedRecord {
            id: Some(self.id),
            product_name: self.product_name,
            plan_name: self.plan_name,
            age: u32::try_from(self.age).map_err(|_| {
                Error::CorruptRecord(format!("record {} has invalid age {}", self.id, self.age))
            })?,
            result,
            captured_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> QuoteResult {
        QuoteField::ALL
            .iter()
            .fold(QuoteResult::empty(), |acc, field| acc.with(*field, "$1.00"))
    }

    #[test]
    fn test_append_and_list() {
        let db = Database::open_memory().unwrap();

        let id = db
            .append_record(&PersistedRecord::new("Alfa Medical", "Pleno", 0, populated()))
            .unwrap();
        db.append_record(&PersistedRecord::new("Alfa Medical", "Pleno", 1, QuoteResult::empty()))
            .unwrap();

        assert!(id > 0);
        assert_eq!(db.count().unwrap(), 2);

        let rows = db.records_by_age("Pleno").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].age, 0);
        assert!(rows[0].result.is_complete());
        assert!(rows[1].result.is_empty());
    }

    #[test]
    fn test_blank_figure_is_not_missing() {
        let db = Database::open_memory().unwrap();
        let result = QuoteResult::empty().with(QuoteField::PolicyFee, "");
        db.append_record(&PersistedRecord::new("P", "Flex A", 3, result)).unwrap();

        let rows = db.records(Some("Flex A"), None).unwrap();
        assert_eq!(rows[0].result.get(QuoteField::PolicyFee), Some(""));
        assert_eq!(rows[0].result.get(QuoteField::Vat), None);
        assert!(!rows[0].is_empty());
    }

    #[test]
    fn test_rerun_appends_rows() {
        let db = Database::open_memory().unwrap();
        for _ in 0..2 {
            db.append_record(&PersistedRecord::new("P", "Pleno", 5, populated()))
                .unwrap();
        }

        assert_eq!(db.records(Some("Pleno"), None).unwrap().len(), 2);
        assert_eq!(db.records(Some("Pleno"), Some(1)).unwrap().len(), 1);
        assert!(db.records(Some("Integro"), None).unwrap().is_empty());
    }

    #[test]
    fn test_plan_names_in_first_seen_order() {
        let db = Database::open_memory().unwrap();
        for plan in ["Integro", "Pleno", "Integro"] {
            db.append_record(&PersistedRecord::new("P", plan, 0, QuoteResult::empty()))
                .unwrap();
        }

        assert_eq!(db.plan_names().unwrap(), vec!["Integro", "Pleno"]);
    }

    #[test]
    fn test_corrupt_row_is_reported() {
        let db = Database::open_memory().unwrap();
        db.conn
            .lock()
            .execute(
                "INSERT INTO quote_records (product_name, plan_name, age, captured_at)
                 VALUES ('P', 'Pleno', -1, 0)",
                [],
            )
            .unwrap();

        let err = db.records(Some("Pleno"), None).unwrap_err();
        assert!(matches!(err, Error::CorruptRecord(_)));
    }
}
