//! Destination checks for outbound page fetches.

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use tracing::warn;
use url::{Host, Url};

use super::{FetchError, FetchResult};

/// Loopback, private, link-local, CGNAT, benchmarking, documentation,
/// broadcast and unspecified ranges.
pub fn is_private_ipv4(ip: &Ipv4Addr) -> bool {
    if ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_broadcast()
        || ip.is_unspecified()
        || ip.is_documentation()
    {
        return true;
    }
    let octets = ip.octets();
    // 100.64.0.0/10
    if octets[0] == 100 && (octets[1] & 0xC0) == 64 {
        return true;
    }
    // 198.18.0.0/15
    octets[0] == 198 && (octets[1] == 18 || octets[1] == 19)
}

pub fn is_private_ipv6(ip: &Ipv6Addr) -> bool {
    if ip.is_loopback() || ip.is_unspecified() {
        return true;
    }
    let segments = ip.segments();
    // fe80::/10
    if segments[0] & 0xFFC0 == 0xFE80 {
        return true;
    }
    // fc00::/7
    if segments[0] & 0xFE00 == 0xFC00 {
        return true;
    }
    // 2001:db8::/32
    if segments[0] == 0x2001 && segments[1] == 0x0DB8 {
        return true;
    }
    ip.to_ipv4_mapped().is_some_and(|v4| is_private_ipv4(&v4))
}

pub fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_ipv4(v4),
        IpAddr::V6(v6) => is_private_ipv6(v6),
    }
}

/// Refuse URLs whose host is, or resolves to, a private address. Name
/// resolution gets at most `timeout`.
pub(super) async fn ensure_public_destination(url: &Url, timeout: Duration) -> FetchResult<()> {
    let host = match url.host() {
        Some(Host::Ipv4(ip)) => return reject_if_private(url, IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => return reject_if_private(url, IpAddr::V6(ip)),
        Some(Host::Domain(domain)) => domain,
        None => return Err(FetchError::InvalidUrl(format!("{url}: missing host"))),
    };

    if host.eq_ignore_ascii_case("localhost") {
        return Err(FetchError::Blocked(host.to_string()));
    }

    let port = url.port_or_known_default().unwrap_or(443);
    let addrs = resolve_within(host, timeout, tokio::net::lookup_host((host, port))).await?;

    let mut resolved = false;
    for addr in addrs {
        resolved = true;
        reject_if_private(url, addr.ip())?;
    }
    if !resolved {
        return Err(FetchError::Network(format!("{host} did not resolve")));
    }
    Ok(())
}

async fn resolve_within<T>(
    host: &str,
    timeout: Duration,
    lookup: impl Future<Output = io::Result<T>>,
) -> FetchResult<T> {
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(addrs)) => Ok(addrs),
        Ok(Err(e)) => Err(FetchError::Network(format!("Failed to resolve {host}: {e}"))),
        Err(_) => Err(FetchError::Network(format!(
            "Timed out resolving {host} after {}s",
            timeout.as_secs_f32()
        ))),
    }
}

fn reject_if_private(url: &Url, ip: IpAddr) -> FetchResult<()> {
    if is_private_ip(&ip) {
        warn!(url = %url, ip = %ip, "Refusing page fetch to private address");
        return Err(FetchError::Blocked(ip.to_string()));
    }
    Ok(())
}
