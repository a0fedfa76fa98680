//! Common test utilities

#![allow(dead_code)]

use vigil::http::HttpClient;
use vigil::models::ScanConfig;
use vigil::scanner::ProbeContext;
use vigil::target::Target;

pub const TEST_USER_AGENT: &str = "Vigil-Test/0.1.0";

/// Creates a fast ScanConfig suitable for loopback targets
pub fn test_config() -> ScanConfig {
    ScanConfig {
        timeout_secs: 5,
        user_agent: TEST_USER_AGENT.to_string(),
        ports: Vec::new(),
        port_timeout_ms: 300,
        dns_timeout_secs: 2,
        ..ScanConfig::default()
    }
}

/// Port the wiremock server listens on
pub fn server_port(uri: &str) -> u16 {
    url::Url::parse(uri)
        .ok()
        .and_then(|u| u.port())
        .expect("mock server uri carries a port")
}

/// Builds a probe context for `raw_target`, as the engine would
pub fn probe_context(raw_target: &str, config: ScanConfig) -> ProbeContext {
    let target = Target::parse(raw_target).expect("valid target");
    let client = HttpClient::from_config(&config).expect("Failed to create client");
    ProbeContext::new(target, config, client)
}

/// A loopback port with nothing listening on it
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind loopback");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    port
}
