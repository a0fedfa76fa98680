//! Common port reachability probe

use crate::error::ProbeError;
use crate::models::PortFindings;
use async_trait::async_trait;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::ProbeContext;

/// Resolves the target host and tries a TCP connect on each candidate port
pub struct PortProbe;

/// Resolves `host` to a single address, preferring IPv4.
///
/// IP literals are returned as-is without a lookup.
pub async fn resolve_host(host: &str, timeout: Duration) -> Result<IpAddr, ProbeError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(ip);
    }

    let addrs: Vec<SocketAddr> = tokio::time::timeout(timeout, tokio::net::lookup_host((host, 0)))
        .await
        .map_err(|_| ProbeError::DnsResolution(format!("{host} (timed out)")))?
        .map_err(|e| ProbeError::DnsResolution(format!("{host} ({e})")))?
        .collect();

    addrs
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| addrs.first())
        .map(|a| a.ip())
        .ok_or_else(|| ProbeError::DnsResolution(format!("{host} (no addresses)")))
}

/// Connects to `ip:port`. Open means the handshake finished before `timeout`.
async fn is_port_open(ip: IpAddr, port: u16, timeout: Duration) -> bool {
    let addr = SocketAddr::new(ip, port);
    match tokio::time::timeout(timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => {
            debug!("{addr} -> open");
            true
        }
        Ok(Err(e)) => {
            debug!("{addr} -> closed ({e})");
            false
        }
        Err(_) => {
            debug!("{addr} -> filtered (timeout)");
            false
        }
    }
}

/// Probes every candidate port concurrently, at most `max_concurrent` sockets
/// at a time. Returns open ports in ascending order.
pub async fn scan_ports(
    ip: IpAddr,
    candidates: &[u16],
    timeout: Duration,
    max_concurrent: usize,
) -> Vec<u16> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut set = JoinSet::new();

    let mut ports = candidates.to_vec();
    ports.sort_unstable();
    ports.dedup();

    for port in ports {
        let sem = Arc::clone(&semaphore);
        set.spawn(async move {
            let _permit = sem.acquire_owned().await.ok()?;
            is_port_open(ip, port, timeout).await.then_some(port)
        });
    }

    let mut open_ports = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Some(port)) => open_ports.push(port),
            Ok(None) => {}
            Err(e) => warn!("Port task failed: {e}"),
        }
    }

    open_ports.sort_unstable();
    open_ports
}

#[async_trait]
impl super::Probe for PortProbe {
    type Findings = PortFindings;

    fn name(&self) -> &'static str {
        "ports"
    }

    fn description(&self) -> &'static str {
        "Resolves the host and checks a fixed set of common TCP ports"
    }

    async fn run(&self, ctx: &ProbeContext) -> Result<PortFindings, ProbeError> {
        let host = ctx.target.host();
        let ip = resolve_host(&host, Duration::from_secs(ctx.config.dns_timeout_secs)).await?;
        debug!("Resolved {host} to {ip}");

        let open_ports = scan_ports(
            ip,
            &ctx.config.ports,
            Duration::from_millis(ctx.config.port_timeout_ms),
            ctx.config.max_port_connections,
        )
        .await;
        info!(
            "{} of {} candidate ports open on {ip}",
            open_ports.len(),
            ctx.config.ports.len()
        );

        Ok(PortFindings {
            ip_address: Some(ip),
            open_ports,
        })
    }
}
