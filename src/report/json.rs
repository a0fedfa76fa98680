//! JSON report output
//!
//! The file holds exactly the serialized [`ScanReport`], so `load` accepts
//! anything `export` wrote, including reports of partially failed scans.

use crate::error::Result;
use crate::models::ScanReport;
use std::path::Path;
use tracing::{debug, info};

/// Writes `report` as pretty JSON, creating missing parent directories
pub fn export(report: &ScanReport, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    std::fs::write(output_path, json)?;
    info!(
        "Report for {} saved to {}",
        report.target,
        output_path.display()
    );
    Ok(())
}

/// Reads back a report written by [`export`]
pub fn load(input_path: &Path) -> Result<ScanReport> {
    let content = std::fs::read_to_string(input_path)?;
    let report: ScanReport = serde_json::from_str(&content)?;
    debug!("Loaded report for {} from {}", report.target, input_path.display());
    Ok(report)
}
