use crate::error::Result;

const SCHEMA_SQL: &str = r#"
-- One row per scan, successful or not
CREATE TABLE IF NOT EXISTS scan_results (
    id                       INTEGER PRIMARY KEY AUTOINCREMENT,
    target_url               TEXT NOT NULL,
    scan_timestamp           INTEGER NOT NULL,
    is_link_valid            INTEGER NOT NULL,
    vulnerabilities_test_ran INTEGER NOT NULL,
    sqli_potential           INTEGER NOT NULL,
    xss_potential            INTEGER NOT NULL,
    open_ports               TEXT NOT NULL,
    -- NULL means the header could not be checked
    header_x_frame           INTEGER,
    header_hsts              INTEGER,
    header_policy            INTEGER,
    header_xxss              INTEGER,
    header_nonsnif           INTEGER,
    scan_errors              TEXT,
    details                  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_scan_results_timestamp ON scan_results(scan_timestamp);
"#;

pub fn initialize(conn: &rusqlite::Connection) -> Result<()> {
    // In-memory databases report "memory" here and ignore the request
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
