//! Scan history persistence
//!
//! The engine hands every completed report to a [`ScanHistory`]. Records are
//! flat rows so that any store able to answer "most recent N" can back it.

pub mod schema;
pub mod store;

pub use store::SqliteHistory;

use crate::error::Result;
use crate::models::{FormFinding, HeaderStatus, ReflectionFinding, ScanReport};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Destination for completed scans
pub trait ScanHistory: Send + Sync {
    /// Stores one report, returning its row id
    fn record(&self, report: &ScanReport) -> Result<i64>;

    /// Returns up to `limit` records, most recent first
    fn recent(&self, limit: usize) -> Result<Vec<ScanRecord>>;
}

/// Form and reflection findings stored alongside a record
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanDetails {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sqli: Vec<FormFinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub xss: Vec<ReflectionFinding>,
}

/// One persisted scan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanRecord {
    pub id: i64,
    pub target_url: String,
    pub scanned_at: DateTime<Local>,
    pub link_valid: bool,
    pub vulnerabilities_tested: bool,
    pub sqli_potential: bool,
    pub xss_potential: bool,
    pub open_ports: Vec<u16>,
    pub header_x_frame: HeaderStatus,
    pub header_hsts: HeaderStatus,
    pub header_policy: HeaderStatus,
    pub header_xxss: HeaderStatus,
    pub header_nosniff: HeaderStatus,
    /// `None` when the scan had no probe errors
    pub errors: Option<BTreeMap<String, String>>,
    pub details: ScanDetails,
}

impl ScanRecord {
    /// Flattens a report into the persisted shape. `id` is assigned by the store.
    pub fn from_report(report: &ScanReport) -> Self {
        Self {
            id: 0,
            target_url: report.target.clone(),
            scanned_at: report.scanned_at,
            link_valid: report.link_valid,
            vulnerabilities_tested: report.vulnerabilities_tested,
            sqli_potential: report.sqli_test,
            xss_potential: report.xss_test,
            open_ports: report.open_ports.clone(),
            header_x_frame: report.headers.x_frame_options,
            header_hsts: report.headers.strict_transport_security,
            header_policy: report.headers.content_security_policy,
            header_xxss: report.headers.x_xss_protection,
            header_nosniff: report.headers.x_content_type_nosniff,
            errors: report.has_errors().then(|| report.errors.clone()),
            details: ScanDetails {
                sqli: report.forms.clone(),
                xss: report.reflections.clone(),
            },
        }
    }
}
