use crate::error::Error;
use axum::http::HeaderMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

const HEX_ADDR_LEN: usize = 8;

/// Decode a PXELINUX hex token: an IPv4 address as 8 hex digits in network byte order.
pub(super) fn addr_from_hex(token: &str) -> Result<IpAddr, Error> {
    if token.len() != HEX_ADDR_LEN || !token.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(Error::InvalidHexAddr(token.to_string()));
    }
    u32::from_str_radix(token, 16)
        .map(|raw| IpAddr::V4(Ipv4Addr::from(raw)))
        .map_err(|_| Error::InvalidHexAddr(token.to_string()))
}

pub(super) fn addr_from_str(raw: &str) -> Result<IpAddr, Error> {
    raw.trim()
        .parse()
        .map_err(|_| Error::InvalidAddr(raw.to_string()))
}

/// The client address a reverse proxy forwarded to us, or the peer address if there is none.
///
/// IPv4-mapped IPv6 addresses, as seen on dual-stack sockets, are returned as plain IPv4.
pub(super) fn client_addr(headers: &HeaderMap, forwarded_header: &str, peer: SocketAddr) -> IpAddr {
    let forwarded = headers
        .get(forwarded_header)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let addr = match forwarded.map(addr_from_str) {
        Some(Ok(addr)) => addr,
        Some(Err(err)) => {
            tracing::debug!("ignoring {forwarded_header} header from {peer}: {err}");
            peer.ip()
        }
        None => peer.ip(),
    };
    addr.to_canonical()
}
