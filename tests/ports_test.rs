//! Integration tests for host resolution and the port probe

mod common;

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::net::TcpListener;
use vigil::error::ProbeError;
use vigil::scanner::ports::{resolve_host, scan_ports, PortProbe};
use vigil::scanner::Probe;

const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[tokio::test]
async fn test_only_listening_port_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let open = listener.local_addr().expect("addr").port();
    let closed = common::closed_port();

    let found = scan_ports(
        LOOPBACK,
        &[closed, open, open],
        Duration::from_millis(500),
        4,
    )
    .await;

    assert_eq!(found, vec![open]);
}

#[tokio::test]
async fn test_open_ports_are_sorted() {
    let first = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let second = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let mut expected = vec![
        first.local_addr().expect("addr").port(),
        second.local_addr().expect("addr").port(),
    ];
    let candidates = vec![expected[1], expected[0]];
    expected.sort_unstable();

    let found = scan_ports(LOOPBACK, &candidates, Duration::from_millis(500), 1).await;

    assert_eq!(found, expected);
}

#[tokio::test]
async fn test_port_probe_resolves_and_scans_target_host() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let open = listener.local_addr().expect("addr").port();

    let mut config = common::test_config();
    config.ports = vec![open, common::closed_port()];

    let ctx = common::probe_context(&format!("http://127.0.0.1:{open}/"), config);
    let findings = PortProbe.run(&ctx).await.expect("Probe failed");

    assert_eq!(findings.ip_address, Some(LOOPBACK));
    assert_eq!(findings.open_ports, vec![open]);
}

#[tokio::test]
async fn test_localhost_resolves() {
    let ip = resolve_host("localhost", Duration::from_secs(2))
        .await
        .expect("localhost should resolve");
    assert!(ip.is_loopback());
}

#[tokio::test]
async fn test_unresolvable_host_fails_the_probe() {
    let mut config = common::test_config();
    config.ports = vec![80];

    let ctx = common::probe_context("http://vigil-no-such-host.invalid/", config);
    let result = PortProbe.run(&ctx).await;

    assert!(matches!(result, Err(ProbeError::DnsResolution(_))));
}
