use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Local};
use rusqlite::{params, Connection, Row};
use tracing::debug;

use super::{ScanDetails, ScanHistory, ScanRecord};
use crate::error::{Result, VigilError};
use crate::history::schema;
use crate::models::{HeaderStatus, ScanReport};

/// Scan history backed by SQLite.
///
/// The connection sits behind a mutex, so writes are serialized.
pub struct SqliteHistory {
    conn: Mutex<Connection>,
}

impl SqliteHistory {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                VigilError::StoreError(format!(
                    "failed to create history directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        debug!(path = %path.display(), "history database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| VigilError::StoreError("history connection poisoned".to_string()))
    }
}

fn header_column(status: HeaderStatus) -> Option<bool> {
    status.as_bool()
}

fn decode_json<T: serde::de::DeserializeOwned>(index: usize, raw: &str) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(index, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ScanRecord> {
    let millis: i64 = row.get(2)?;
    let scanned_at = DateTime::from_timestamp_millis(millis)
        .map(|utc| utc.with_timezone(&Local))
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(2, millis))?;

    let open_ports: String = row.get(7)?;
    let errors: Option<String> = row.get(13)?;
    let details: String = row.get(14)?;

    Ok(ScanRecord {
        id: row.get(0)?,
        target_url: row.get(1)?,
        scanned_at,
        link_valid: row.get(3)?,
        vulnerabilities_tested: row.get(4)?,
        sqli_potential: row.get(5)?,
        xss_potential: row.get(6)?,
        open_ports: decode_json(7, &open_ports)?,
        header_x_frame: HeaderStatus::from_bool(row.get(8)?),
        header_hsts: HeaderStatus::from_bool(row.get(9)?),
        header_policy: HeaderStatus::from_bool(row.get(10)?),
        header_xxss: HeaderStatus::from_bool(row.get(11)?),
        header_nosniff: HeaderStatus::from_bool(row.get(12)?),
        errors: errors.as_deref().map(|e| decode_json(13, e)).transpose()?,
        details: decode_json::<ScanDetails>(14, &details)?,
    })
}

impl ScanHistory for SqliteHistory {
    fn record(&self, report: &ScanReport) -> Result<i64> {
        let record = ScanRecord::from_report(report);
        let open_ports = serde_json::to_string(&record.open_ports)?;
        let errors = record
            .errors
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let details = serde_json::to_string(&record.details)?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO scan_results (target_url, scan_timestamp, is_link_valid, \
             vulnerabilities_test_ran, sqli_potential, xss_potential, open_ports, \
             header_x_frame, header_hsts, header_policy, header_xxss, header_nonsnif, \
             scan_errors, details) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.target_url,
                record.scanned_at.timestamp_millis(),
                record.link_valid,
                record.vulnerabilities_tested,
                record.sqli_potential,
                record.xss_potential,
                open_ports,
                header_column(record.header_x_frame),
                header_column(record.header_hsts),
                header_column(record.header_policy),
                header_column(record.header_xxss),
                header_column(record.header_nosniff),
                errors,
                details,
            ],
        )?;

        let id = conn.last_insert_rowid();
        debug!(id, target = %record.target_url, "scan recorded");
        Ok(id)
    }

    fn recent(&self, limit: usize) -> Result<Vec<ScanRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, target_url, scan_timestamp, is_link_valid, vulnerabilities_test_ran, \
             sqli_potential, xss_potential, open_ports, header_x_frame, header_hsts, \
             header_policy, header_xxss, header_nonsnif, scan_errors, details \
             FROM scan_results ORDER BY scan_timestamp DESC, id DESC LIMIT ?1",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![limit], row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
