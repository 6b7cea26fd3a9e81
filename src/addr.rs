// IPv4 address and prefix validation and classification

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::error::{AppError, AppResult};

/// Coarse address category used to filter discovery results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AddressClass {
    Unspecified,
    Loopback,
    LinkLocal,
    Multicast,
    Broadcast,
    Private,
    Public,
}

/// Position of a host address inside its subnet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HostRole {
    NetworkAddress,
    BroadcastAddress,
    FirstUsable,
    LastUsable,
    Usable,
}

/// Parse a strict dotted-quad IPv4 address.
pub fn parse_ipv4(input: &str) -> AppResult<Ipv4Addr> {
    let parts: Vec<&str> = input.split('.').collect();
    if parts.len() != 4 {
        return Err(AppError::validation(
            input,
            format!("expected 4 octets, found {}", parts.len()),
        ));
    }

    let mut octets = [0u8; 4];
    for (slot, part) in octets.iter_mut().zip(&parts) {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AppError::validation(input, format!("bad octet {:?}", part)));
        }
        if part.len() > 1 && part.starts_with('0') {
            return Err(AppError::validation(
                input,
                format!("octet {:?} has a leading zero", part),
            ));
        }
        let value: u16 = part
            .parse()
            .map_err(|_| AppError::validation(input, format!("bad octet {:?}", part)))?;
        *slot = u8::try_from(value)
            .map_err(|_| AppError::validation(input, format!("octet {} out of range", value)))?;
    }

    Ok(Ipv4Addr::from(octets))
}

/// Validate a prefix length in the range 0-32.
pub fn parse_prefix_len(input: &str) -> AppResult<u8> {
    let len: u8 = input
        .parse()
        .map_err(|_| AppError::validation(input, "mask is not a number"))?;
    if len > 32 {
        return Err(AppError::validation(
            input,
            format!("mask /{} is outside 0-32", len),
        ));
    }
    Ok(len)
}

/// Parse `a.b.c.d/len`. Host bits are kept, so formatting the result gives the
/// input back.
pub fn parse_cidr(input: &str) -> AppResult<Ipv4Net> {
    let (addr, len) = input
        .split_once('/')
        .ok_or_else(|| AppError::validation(input, "missing '/<mask>'"))?;
    let addr = parse_ipv4(addr)?;
    let len = parse_prefix_len(len)?;
    Ipv4Net::new(addr, len).map_err(|e| AppError::validation(input, e.to_string()))
}

pub fn format_cidr(net: &Ipv4Net) -> String {
    net.to_string()
}

/// Convert a dotted netmask (255.255.255.0) into a prefix length.
pub fn netmask_to_prefix_len(input: &str) -> AppResult<u8> {
    let mask = u32::from(parse_ipv4(input)?);
    let len = mask.leading_ones();
    if mask.checked_shl(len).unwrap_or(0) != 0 {
        return Err(AppError::validation(input, "netmask is not contiguous"));
    }
    Ok(len as u8)
}

pub fn classify(addr: Ipv4Addr) -> AddressClass {
    if addr.is_unspecified() {
        AddressClass::Unspecified
    } else if addr.is_loopback() {
        AddressClass::Loopback
    } else if addr.is_link_local() {
        AddressClass::LinkLocal
    } else if addr.is_multicast() {
        AddressClass::Multicast
    } else if addr.is_broadcast() {
        AddressClass::Broadcast
    } else if addr.is_private() {
        AddressClass::Private
    } else {
        AddressClass::Public
    }
}

/// Role of `addr` inside `net`, or `None` if the address is outside it.
/// Point-to-point (/31) and host (/32) prefixes have no network or broadcast
/// address.
pub fn host_role(addr: Ipv4Addr, net: &Ipv4Net) -> Option<HostRole> {
    let net = net.trunc();
    if !net.contains(&addr) {
        return None;
    }

    let first = u32::from(net.network());
    let last = u32::from(net.broadcast());
    let value = u32::from(addr);

    let role = if net.prefix_len() >= 31 {
        if value == first {
            HostRole::FirstUsable
        } else {
            HostRole::LastUsable
        }
    } else if value == first {
        HostRole::NetworkAddress
    } else if value == last {
        HostRole::BroadcastAddress
    } else if value == first + 1 {
        HostRole::FirstUsable
    } else if value == last - 1 {
        HostRole::LastUsable
    } else {
        HostRole::Usable
    };

    Some(role)
}

/// Check that `addr` is an assignable host address inside `net`.
pub fn validate_host_in_subnet(addr: Ipv4Addr, net: &Ipv4Net) -> AppResult<HostRole> {
    match host_role(addr, net) {
        None => Err(AppError::validation(
            addr.to_string(),
            format!("not inside {}", net.trunc()),
        )),
        Some(HostRole::NetworkAddress) => Err(AppError::validation(
            addr.to_string(),
            format!("network address of {}", net.trunc()),
        )),
        Some(HostRole::BroadcastAddress) => Err(AppError::validation(
            addr.to_string(),
            format!("broadcast address of {}", net.trunc()),
        )),
        Some(role) => Ok(role),
    }
}
