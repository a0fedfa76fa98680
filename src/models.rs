//! Core data models for Vigil

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;
use std::path::PathBuf;

/// Ports checked by the port probe unless configured otherwise
pub const DEFAULT_PORTS: [u16; 9] = [80, 443, 8080, 21, 22, 23, 25, 53, 110];

/// Identifying client string sent with every request
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Vigil/0.1.0";

/// Outcome of a header check
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HeaderStatus {
    Present,
    Absent,
    /// The response could not be obtained, so nothing was checked
    Undetermined,
}

impl HeaderStatus {
    pub fn from_present(present: bool) -> Self {
        if present {
            HeaderStatus::Present
        } else {
            HeaderStatus::Absent
        }
    }

    /// `None` when the header was never checked
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderStatus::Present => Some(true),
            HeaderStatus::Absent => Some(false),
            HeaderStatus::Undetermined => None,
        }
    }

    pub fn from_bool(value: Option<bool>) -> Self {
        match value {
            Some(present) => Self::from_present(present),
            None => HeaderStatus::Undetermined,
        }
    }
}

impl fmt::Display for HeaderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderStatus::Present => write!(f, "present"),
            HeaderStatus::Absent => write!(f, "absent"),
            HeaderStatus::Undetermined => write!(f, "undetermined"),
        }
    }
}

/// Hardening headers observed on the target's response
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderFindings {
    /// X-Frame-Options
    pub x_frame_options: HeaderStatus,
    /// Strict-Transport-Security
    pub strict_transport_security: HeaderStatus,
    /// Content-Security-Policy
    pub content_security_policy: HeaderStatus,
    /// X-XSS-Protection (deprecated, reported for completeness)
    pub x_xss_protection: HeaderStatus,
    /// X-Content-Type-Options carrying `nosniff`
    pub x_content_type_nosniff: HeaderStatus,
}

impl HeaderFindings {
    pub fn undetermined() -> Self {
        Self {
            x_frame_options: HeaderStatus::Undetermined,
            strict_transport_security: HeaderStatus::Undetermined,
            content_security_policy: HeaderStatus::Undetermined,
            x_xss_protection: HeaderStatus::Undetermined,
            x_content_type_nosniff: HeaderStatus::Undetermined,
        }
    }

    /// Display label and status, in reporting order
    pub fn entries(&self) -> [(&'static str, HeaderStatus); 5] {
        [
            ("X-Frame-Options", self.x_frame_options),
            ("Strict-Transport-Security", self.strict_transport_security),
            ("Content-Security-Policy", self.content_security_policy),
            ("X-XSS-Protection", self.x_xss_protection),
            ("X-Content-Type-Options: nosniff", self.x_content_type_nosniff),
        ]
    }
}

/// Result of resolving the target and connecting to candidate ports
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortFindings {
    pub ip_address: Option<IpAddr>,
    /// Ascending, a subset of the configured candidates
    pub open_ports: Vec<u16>,
}

/// A form field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// A form found on the target page. A possible injection surface, nothing more.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FormFinding {
    /// Absolute URL the form submits to
    pub action: String,
    /// Upper-cased, GET when unspecified
    pub method: String,
    pub inputs: Vec<InputDescriptor>,
}

/// Where a reflected payload ended up
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ReflectionContext {
    /// Inside a parsed `<script>` element
    ScriptTag,
    /// Verbatim in the body but not as an executable element
    PlainText,
}

impl fmt::Display for ReflectionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReflectionContext::ScriptTag => write!(f, "script-tag"),
            ReflectionContext::PlainText => write!(f, "plain-text"),
        }
    }
}

/// A query parameter that echoed the script payload unescaped
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReflectionFinding {
    pub parameter: String,
    pub method: String,
    pub context: ReflectionContext,
    pub test_url: String,
    pub detail: String,
}

/// Everything the reflection probe learned
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReflectionFindings {
    /// Parameters whose responses were evaluated
    pub tested_parameters: Vec<String>,
    /// First reflecting parameter in declaration order
    pub reflection: Option<ReflectionFinding>,
    pub detail: String,
}

/// Whether each probe ran to completion
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeStatus {
    pub headers: bool,
    pub ports: bool,
    pub forms: bool,
    pub reflection: bool,
}

/// Aggregated result of one scan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanReport {
    /// Canonical target URL
    pub target: String,
    pub scanned_at: DateTime<Local>,
    /// The target passed normalization
    pub link_valid: bool,
    /// Probe execution was reached. Says nothing about individual probes.
    pub vulnerabilities_tested: bool,
    pub probes: ProbeStatus,
    pub headers: HeaderFindings,
    pub ip_address: Option<IpAddr>,
    pub open_ports: Vec<u16>,
    /// At least one form exists on the page
    pub sqli_test: bool,
    pub forms: Vec<FormFinding>,
    /// A query parameter reflected the script payload
    pub xss_test: bool,
    pub reflections: Vec<ReflectionFinding>,
    pub xss_detail: String,
    /// Probe name to failure message
    pub errors: BTreeMap<String, String>,
    pub total_requests: u64,
}

impl ScanReport {
    /// Creates an empty report with every probe field undetermined
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            scanned_at: Local::now(),
            link_valid: true,
            vulnerabilities_tested: false,
            probes: ProbeStatus::default(),
            headers: HeaderFindings::undetermined(),
            ip_address: None,
            open_ports: Vec::new(),
            sqli_test: false,
            forms: Vec::new(),
            xss_test: false,
            reflections: Vec::new(),
            xss_detail: String::new(),
            errors: BTreeMap::new(),
            total_requests: 0,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Configuration for a scan session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
    /// User-Agent header value
    pub user_agent: String,
    /// Whether to follow HTTP redirects
    pub follow_redirects: bool,
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    /// Extra attempts after a transport failure
    #[serde(default)]
    pub retries: u32,
    /// HTTP/HTTPS proxy URL
    pub proxy: Option<String>,
    /// Candidate ports for the port probe
    pub ports: Vec<u16>,
    /// Per-port TCP connect timeout in milliseconds
    pub port_timeout_ms: u64,
    /// Host resolution timeout in seconds
    pub dns_timeout_secs: u64,
    /// Maximum simultaneous sockets in the port probe
    pub max_port_connections: usize,
    /// Maximum simultaneous requests in the reflection probe
    pub max_reflection_requests: usize,
    /// SQLite database used for scan history
    pub history_path: PathBuf,
    /// Rows returned by a history query
    pub history_limit: usize,
}

fn default_max_redirects() -> usize {
    10
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            follow_redirects: true,
            max_redirects: 10,
            retries: 0,
            proxy: None,
            ports: DEFAULT_PORTS.to_vec(),
            port_timeout_ms: 1000,
            dns_timeout_secs: 5,
            max_port_connections: 10,
            max_reflection_requests: 4,
            history_path: PathBuf::from("vigil_history.db"),
            history_limit: 50,
        }
    }
}
