//! Configuration management for Vigil

use crate::error::{Result, VigilError};
use crate::models::ScanConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// File-based configuration structure
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    scan: Option<ScanSection>,
    ports: Option<PortsSection>,
    reflection: Option<ReflectionSection>,
    history: Option<HistorySection>,
}

#[derive(Debug, Deserialize)]
struct ScanSection {
    timeout_secs: Option<u64>,
    user_agent: Option<String>,
    follow_redirects: Option<bool>,
    max_redirects: Option<usize>,
    retries: Option<u32>,
    proxy: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PortsSection {
    candidates: Option<Vec<u16>>,
    connect_timeout_ms: Option<u64>,
    dns_timeout_secs: Option<u64>,
    max_concurrent: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ReflectionSection {
    max_concurrent: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct HistorySection {
    path: Option<PathBuf>,
    limit: Option<usize>,
}

/// Loads configuration from a TOML file and merges with defaults
pub fn load_config(path: &Path) -> Result<ScanConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses TOML configuration text on top of the defaults
pub fn parse_config(content: &str) -> Result<ScanConfig> {
    let file_config: FileConfig = toml::from_str(content)?;
    let mut config = ScanConfig::default();

    if let Some(scan) = file_config.scan {
        if let Some(timeout) = scan.timeout_secs {
            config.timeout_secs = timeout;
        }
        if let Some(ua) = scan.user_agent {
            config.user_agent = ua;
        }
        if let Some(follow) = scan.follow_redirects {
            config.follow_redirects = follow;
        }
        if let Some(max) = scan.max_redirects {
            config.max_redirects = max;
        }
        if let Some(retries) = scan.retries {
            config.retries = retries;
        }
        if scan.proxy.is_some() {
            config.proxy = scan.proxy;
        }
    }

    if let Some(ports) = file_config.ports {
        if let Some(candidates) = ports.candidates {
            config.ports = candidates;
        }
        if let Some(timeout) = ports.connect_timeout_ms {
            config.port_timeout_ms = timeout;
        }
        if let Some(timeout) = ports.dns_timeout_secs {
            config.dns_timeout_secs = timeout;
        }
        if let Some(max) = ports.max_concurrent {
            config.max_port_connections = max;
        }
    }

    if let Some(reflection) = file_config.reflection {
        if let Some(max) = reflection.max_concurrent {
            config.max_reflection_requests = max;
        }
    }

    if let Some(history) = file_config.history {
        if let Some(path) = history.path {
            config.history_path = path;
        }
        if let Some(limit) = history.limit {
            config.history_limit = limit;
        }
    }

    validate(&config)?;
    Ok(config)
}

/// Upper bound on transport retries per request
pub const MAX_RETRIES: u32 = 5;

/// Rejects settings that would make a probe unable to run, or that would
/// stop the HTTP client from being built once a scan has started
pub fn validate(config: &ScanConfig) -> Result<()> {
    if config.timeout_secs == 0 {
        return Err(VigilError::ConfigError(
            "timeout_secs must be greater than zero".to_string(),
        ));
    }
    if config.dns_timeout_secs == 0 {
        return Err(VigilError::ConfigError(
            "dns_timeout_secs must be greater than zero".to_string(),
        ));
    }
    if config.retries > MAX_RETRIES {
        return Err(VigilError::ConfigError(format!(
            "retries must be at most {MAX_RETRIES}, got {}",
            config.retries
        )));
    }
    if let Some(ref proxy_url) = config.proxy {
        reqwest::Proxy::all(proxy_url.as_str())
            .map_err(|e| VigilError::ConfigError(format!("Invalid proxy URL: {e}")))?;
    }
    if config.port_timeout_ms == 0 {
        return Err(VigilError::ConfigError(
            "port connect timeout must be greater than zero".to_string(),
        ));
    }
    if config.ports.contains(&0) {
        return Err(VigilError::ConfigError(
            "port 0 is not a valid candidate".to_string(),
        ));
    }
    Ok(())
}

/// Merges CLI arguments into an existing ScanConfig
pub fn merge_cli_args(
    config: &mut ScanConfig,
    timeout: Option<u64>,
    ports: Option<Vec<u16>>,
    proxy: Option<String>,
    user_agent: Option<String>,
    history_path: Option<PathBuf>,
) {
    if let Some(t) = timeout {
        config.timeout_secs = t;
    }
    if let Some(p) = ports {
        config.ports = p;
    }
    if let Some(p) = proxy {
        config.proxy = Some(p);
    }
    if let Some(ua) = user_agent {
        config.user_agent = ua;
    }
    if let Some(path) = history_path {
        config.history_path = path;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_PORTS;

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = parse_config("").expect("parse");
        assert_eq!(config.timeout_secs, 10);
        assert_eq!(config.ports, DEFAULT_PORTS.to_vec());
        assert_eq!(config.port_timeout_ms, 1000);
        assert_eq!(config.history_limit, 50);
    }

    #[test]
    fn test_sections_override_defaults() {
        let config = parse_config(
            r#"
            [scan]
            timeout_secs = 3
            retries = 2

            [ports]
            candidates = [22, 443]
            connect_timeout_ms = 250
            max_concurrent = 2

            [reflection]
            max_concurrent = 1

            [history]
            path = "/tmp/vigil.db"
            limit = 5
            "#,
        )
        .expect("parse");

        assert_eq!(config.timeout_secs, 3);
        assert_eq!(config.retries, 2);
        assert_eq!(config.ports, vec![22, 443]);
        assert_eq!(config.port_timeout_ms, 250);
        assert_eq!(config.max_port_connections, 2);
        assert_eq!(config.max_reflection_requests, 1);
        assert_eq!(config.history_path, PathBuf::from("/tmp/vigil.db"));
        assert_eq!(config.history_limit, 5);
        assert!(config.follow_redirects);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            parse_config("[scan]\ntimeout_secs = 0"),
            Err(VigilError::ConfigError(_))
        ));
        assert!(matches!(
            parse_config("[ports]\ncandidates = [0, 80]"),
            Err(VigilError::ConfigError(_))
        ));
        assert!(matches!(
            parse_config("[scan\n"),
            Err(VigilError::TomlError(_))
        ));
    }

    #[test]
    fn test_dns_timeout_and_retries_are_bounded() {
        assert!(matches!(
            parse_config("[ports]\ndns_timeout_secs = 0"),
            Err(VigilError::ConfigError(_))
        ));
        assert!(matches!(
            parse_config("[scan]\nretries = 65"),
            Err(VigilError::ConfigError(_))
        ));

        let config = parse_config(&format!("[scan]\nretries = {MAX_RETRIES}")).expect("parse");
        assert_eq!(config.retries, MAX_RETRIES);
    }

    #[test]
    fn test_proxy_is_checked_up_front() {
        assert!(matches!(
            parse_config("[scan]\nproxy = \"not a proxy url\""),
            Err(VigilError::ConfigError(_))
        ));

        let config = parse_config("[scan]\nproxy = \"http://127.0.0.1:3128\"").expect("parse");
        assert_eq!(config.proxy.as_deref(), Some("http://127.0.0.1:3128"));

        let mut merged = ScanConfig::default();
        merge_cli_args(
            &mut merged,
            None,
            None,
            Some("not a proxy url".to_string()),
            None,
            None,
        );
        assert!(validate(&merged).is_err());
    }

    #[test]
    fn test_cli_args_take_precedence() {
        let mut config = parse_config("[scan]\ntimeout_secs = 30").expect("parse");
        merge_cli_args(
            &mut config,
            Some(5),
            Some(vec![8080]),
            None,
            Some("custom-agent".to_string()),
            None,
        );
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.ports, vec![8080]);
        assert_eq!(config.user_agent, "custom-agent");
        assert!(config.proxy.is_none());
    }
}
