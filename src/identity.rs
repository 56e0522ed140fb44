//! Best-effort client identity for admission control.
//!
//! Proxy headers are consulted in the order commonly set by load balancers and
//! CDNs, then the socket peer address. Values that do not parse as an IP
//! address are skipped, so garbage headers cannot mint fresh identities.

use axum::http::HeaderMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Identity shared by every request whose address cannot be determined.
pub const UNKNOWN_IDENTITY: &str = "unknown";

const ADDRESS_HEADERS: &[&str] = &[
    "x-client-ip",
    "x-forwarded-for",
    "cf-connecting-ip",
    "fastly-client-ip",
    "true-client-ip",
    "x-real-ip",
    "x-cluster-client-ip",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    pub fn unknown() -> Self {
        Self(UNKNOWN_IDENTITY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unknown(&self) -> bool {
        self.0 == UNKNOWN_IDENTITY
    }
}

impl From<IpAddr> for ClientIdentity {
    fn from(ip: IpAddr) -> Self {
        Self(ip.to_string())
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the client identity from proxy headers, then the peer address.
///
/// Never fails: anything unresolvable maps to [`UNKNOWN_IDENTITY`].
pub fn resolve_identity(headers: &HeaderMap, peer: Option<SocketAddr>) -> ClientIdentity {
    ADDRESS_HEADERS
        .iter()
        .find_map(|name| header_ip(headers, name))
        .or_else(|| forwarded_ip(headers))
        .or_else(|| peer.map(|addr| addr.ip()))
        .map(ClientIdentity::from)
        .unwrap_or_else(ClientIdentity::unknown)
}

fn header_ip(headers: &HeaderMap, name: &str) -> Option<IpAddr> {
    let value = headers.get(name)?.to_str().ok()?;
    // x-forwarded-for is "client, proxy1, proxy2"; the first parseable entry wins
    value.split(',').find_map(parse_ip)
}

/// RFC 7239 `Forwarded: for=1.2.3.4;proto=https`
fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let value = headers.get("forwarded")?.to_str().ok()?;
    value
        .split([',', ';'])
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, _)| key.eq_ignore_ascii_case("for"))
        .find_map(|(_, addr)| parse_ip(addr))
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    let raw = raw.trim().trim_matches('"');
    if let Ok(ip) = raw.parse::<IpAddr>() {
        return Some(ip);
    }
    // "1.2.3.4:5678" or "[::1]:5678"
    if let Ok(addr) = raw.parse::<SocketAddr>() {
        return Some(addr.ip());
    }
    raw.strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .and_then(|s| s.parse().ok())
}
