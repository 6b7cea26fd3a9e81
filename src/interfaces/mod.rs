// Interface listings and explicit adjacency tables

pub mod arista;
pub mod cisco;
pub mod huawei;
pub mod juniper;
pub mod nokia;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::addr::{classify, parse_cidr, parse_ipv4, AddressClass};
use crate::error::{AppError, AppResult};
use crate::identity::RouterIdentity;
use crate::routes::parser::{parser_for, ParseWarning, Parsed};
use crate::routes::{Protocol, RouteEntry};
use crate::vendor::VendorTag;

/// One addressed interface on a router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub router: RouterIdentity,
    pub name: String,
    pub ip: Ipv4Addr,
    /// Prefix length
    pub mask: u8,
    pub admin_up: bool,
    pub protocol_up: bool,
}

impl InterfaceRecord {
    pub fn new(router: RouterIdentity, name: &str, ip: Ipv4Addr, mask: u8) -> Self {
        InterfaceRecord {
            router,
            name: name.to_string(),
            ip,
            mask,
            admin_up: true,
            protocol_up: true,
        }
    }

    /// Subnet the interface sits on, host bits cleared.
    pub fn subnet(&self) -> Ipv4Net {
        Ipv4Net::new(self.ip, self.mask)
            .map(|net| net.trunc())
            .unwrap_or_else(|_| Ipv4Net::from(self.ip))
    }

    pub fn is_up(&self) -> bool {
        self.admin_up && self.protocol_up
    }

    pub fn is_loopback(&self) -> bool {
        is_loopback_name(&self.name)
    }
}

/// Loopback0, lo0.0, LoopBack1, and the Nokia `system` interface.
pub fn is_loopback_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("loopback")
        || lower == "system"
        || lower
            .strip_prefix("lo")
            .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

pub trait InterfaceParser: Send + Sync {
    fn parse_interfaces(
        &self,
        router: RouterIdentity,
        text: &str,
    ) -> AppResult<Parsed<InterfaceRecord>>;
}

/// Parse an interface listing with the parser bound to `vendor`.
pub fn parse_interfaces(
    vendor: VendorTag,
    router: RouterIdentity,
    text: &str,
) -> AppResult<Parsed<InterfaceRecord>> {
    let parser = parser_for(vendor)
        .ok_or_else(|| AppError::parse(vendor, router, "no interface parser for this vendor"))?;
    let parsed = parser.parse_interfaces(router, text)?;

    let up = parsed.records.iter().filter(|i| i.is_up()).count();
    tracing::debug!(
        "Parsed {} interfaces from {} ({}), {} up",
        parsed.records.len(),
        router,
        vendor,
        up
    );
    if !parsed.warnings.is_empty() {
        tracing::warn!(
            "{} interface lines from {} ({}) were not recognized",
            parsed.warnings.len(),
            router,
            vendor
        );
    }

    Ok(parsed)
}

/// `a.b.c.d/len`, or a bare address taken as a /32 when `bare_is_host`.
/// Host loopback (127/8) and unspecified addresses are not interface
/// addresses and return `None`.
pub(crate) fn interface_address(token: &str, bare_is_host: bool) -> Option<(Ipv4Addr, u8)> {
    let (ip, len) = match parse_cidr(token) {
        Ok(net) => (net.addr(), net.prefix_len()),
        Err(_) if bare_is_host => (parse_ipv4(token).ok()?, 32),
        Err(_) => return None,
    };
    match classify(ip) {
        AddressClass::Loopback | AddressClass::Unspecified => None,
        _ => Some((ip, len)),
    }
}

/// Address of the router's loopback: the first up loopback-named interface.
pub fn loopback_address(interfaces: &[InterfaceRecord]) -> Option<Ipv4Addr> {
    interfaces
        .iter()
        .find(|i| i.is_loopback() && i.is_up())
        .map(|i| i.ip)
}

/// Fallback when no interface listing exists: a connected /32 on a
/// loopback-named interface.
pub fn loopback_from_routes(routes: &[RouteEntry]) -> Option<Ipv4Addr> {
    routes
        .iter()
        .find(|r| {
            r.protocol == Protocol::Connected
                && r.prefix.prefix_len() == 32
                && r.interface.as_deref().is_some_and(is_loopback_name)
        })
        .map(|r| r.prefix.addr())
}

/// One row of an explicit direct-connection table. Router columns hold any
/// address of the router and are resolved to identities by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectConnection {
    pub a: Ipv4Addr,
    pub a_ip: Ipv4Addr,
    pub a_iface: String,
    pub b_iface: String,
    pub b_ip: Ipv4Addr,
    pub b: Ipv4Addr,
    pub weight: Option<u32>,
}

fn parse_connection_line(line: &str) -> AppResult<DirectConnection> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (cols, weight) = match tokens.as_slice() {
        [a, a_ip, a_if, b_if, b_ip, b] => ([*a, *a_ip, *a_if, *b_if, *b_ip, *b], None),
        [a, a_ip, a_if, b_if, b_ip, b, w] => {
            let weight: u32 = w
                .parse()
                .map_err(|_| AppError::validation(*w, "weight is not a number"))?;
            ([*a, *a_ip, *a_if, *b_if, *b_ip, *b], Some(weight))
        }
        _ => {
            return Err(AppError::validation(
                line,
                format!("expected 6 or 7 columns, found {}", tokens.len()),
            ));
        }
    };
    Ok(DirectConnection {
        a: parse_ipv4(cols[0])?,
        a_ip: parse_ipv4(cols[1])?,
        a_iface: cols[2].to_string(),
        b_iface: cols[3].to_string(),
        b_ip: parse_ipv4(cols[4])?,
        b: parse_ipv4(cols[5])?,
        weight,
    })
}

/// Parse a direct-connection table:
/// `<router_a> <ip_a> <iface_a> <iface_b> <ip_b> <router_b> [weight]`.
/// Blank lines and `#` comments are ignored. A table with content but no
/// valid row is an error; an empty table is not.
pub fn parse_direct_connections(text: &str) -> AppResult<Parsed<DirectConnection>> {
    let mut records = Vec::new();
    let mut warnings = Vec::new();
    let mut first_error: Option<AppError> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }
        match parse_connection_line(line) {
            Ok(conn) => records.push(conn),
            Err(e) => {
                warnings.push(ParseWarning {
                    line: idx + 1,
                    text: raw.to_string(),
                    reason: e.to_string(),
                });
                first_error.get_or_insert(e);
            }
        }
    }

    if records.is_empty() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }
    tracing::debug!(
        "Parsed {} direct connections ({} lines skipped)",
        records.len(),
        warnings.len()
    );
    Ok(Parsed { records, warnings })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::parser::parse_rib;

    fn router() -> RouterIdentity {
        RouterIdentity::new(Ipv4Addr::new(10, 255, 0, 1))
    }

    #[test]
    fn test_loopback_names() {
        assert!(is_loopback_name("Loopback0"));
        assert!(is_loopback_name("LoopBack1"));
        assert!(is_loopback_name("lo0.0"));
        assert!(is_loopback_name("system"));
        assert!(!is_loopback_name("local-lan"));
        assert!(!is_loopback_name("GigabitEthernet0/0"));
        assert!(!is_loopback_name("InLoopBack0"));
    }

    #[test]
    fn test_subnet_clears_host_bits() {
        let iface = InterfaceRecord::new(router(), "Gi0/0", Ipv4Addr::new(10, 0, 12, 1), 24);
        assert_eq!(iface.subnet().to_string(), "10.0.12.0/24");
    }

    #[test]
    fn test_interface_address() {
        assert_eq!(
            interface_address("10.0.12.1/24", false),
            Some((Ipv4Addr::new(10, 0, 12, 1), 24))
        );
        assert_eq!(interface_address("10.255.0.2", false), None);
        assert_eq!(
            interface_address("10.255.0.2", true),
            Some((Ipv4Addr::new(10, 255, 0, 2), 32))
        );
        assert_eq!(interface_address("127.0.0.1/8", false), None);
        assert_eq!(interface_address("unassigned", true), None);
    }

    #[test]
    fn test_loopback_address_skips_down_interfaces() {
        let mut down = InterfaceRecord::new(router(), "Loopback1", Ipv4Addr::new(10, 255, 9, 9), 32);
        down.admin_up = false;
        let up = InterfaceRecord::new(router(), "Loopback0", Ipv4Addr::new(10, 255, 0, 1), 32);
        let eth = InterfaceRecord::new(router(), "Ethernet1", Ipv4Addr::new(10, 0, 13, 1), 24);
        assert_eq!(
            loopback_address(&[eth.clone(), down, up]),
            Some(Ipv4Addr::new(10, 255, 0, 1))
        );
        assert_eq!(loopback_address(&[eth]), None);
    }

    #[test]
    fn test_loopback_from_routes() {
        let text = "\
C        10.0.12.0/24 is directly connected, GigabitEthernet0/0
L        10.0.12.1/32 is directly connected, GigabitEthernet0/0
C        10.255.0.1/32 is directly connected, Loopback0
";
        let routes = parse_rib(VendorTag::Cisco, router(), text).unwrap().records;
        assert_eq!(loopback_from_routes(&routes), Some(Ipv4Addr::new(10, 255, 0, 1)));
        assert_eq!(loopback_from_routes(&routes[..2]), None);
    }

    #[test]
    fn test_direct_connections() {
        let text = "\
# router_a  ip_a  iface_a  iface_b  ip_b  router_b  [weight]
10.255.0.1 10.0.12.1 Gi0/0 ge-0/0/0.0 10.0.12.2 10.255.0.2
10.255.0.2 10.0.23.2 ge-0/0/1.0 Ethernet1 10.0.23.3 10.255.0.3 10   # slow link

10.255.0.3 10.0.34.3 Ethernet2
";
        let parsed = parse_direct_connections(text).unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[0].weight, None);
        assert_eq!(parsed.records[1].weight, Some(10));
        assert_eq!(parsed.records[1].b_iface, "Ethernet1");
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].line, 5);
    }

    #[test]
    fn test_direct_connections_empty_and_invalid() {
        assert!(parse_direct_connections("# nothing yet\n\n").unwrap().records.is_empty());
        let err = parse_direct_connections("10.255.0.1 10.0.12.1 Gi0/0 ge-0/0/0 10.0.12.02 10.255.0.2\n")
            .unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn test_unknown_vendor_interfaces() {
        let err = parse_interfaces(VendorTag::Unknown, router(), "Ethernet1 10.0.0.1/24 up up")
            .unwrap_err();
        assert!(matches!(err, AppError::Parse { .. }));
    }
}
