// Huawei VRP `display ip routing-table` parser
//
// Format:
//   Route Flags: R - relay, D - download to fib
//   ------------------------------------------------------------------------------
//   Routing Tables: Public
//            Destinations : 8        Routes : 9
//
//   Destination/Mask    Proto   Pre  Cost      Flags NextHop         Interface
//
//           0.0.0.0/0   Static  60   0          RD   10.0.45.4       GigabitEthernet0/0/0
//         10.0.34.0/24  OSPF    10   2           D   10.0.45.4       GigabitEthernet0/0/0
//                       OSPF    10   2           D   10.0.56.6       GigabitEthernet0/0/1
//
// A line without a destination continues the previous one (ECMP).

use ipnet::Ipv4Net;
use regex::Regex;
use std::net::Ipv4Addr;
use std::sync::LazyLock;

use super::{
    addr_token, ensure_not_empty, is_cli_prompt, is_ruler, prefix_token, ParseOutput, Parsed,
    RibParser,
};
use crate::error::AppResult;
use crate::identity::RouterIdentity;
use crate::routes::{Protocol, RouteEntry, DEFAULT_VRF};
use crate::vendor::VendorTag;

pub struct HuaweiParser;

static TABLE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Routing Tables?\s*:\s*(?P<table>\S+)").expect("valid routing table header regex")
});

fn protocol_for_name(name: &str) -> Option<Protocol> {
    let upper = name.to_ascii_uppercase();
    let protocol = match upper.as_str() {
        "DIRECT" => Protocol::Connected,
        "STATIC" => Protocol::Static,
        "OSPF" | "O_ASE" | "O_NSSA" => Protocol::Ospf,
        "BGP" | "IBGP" | "EBGP" => Protocol::Bgp,
        _ if upper.starts_with("ISIS") => Protocol::Isis,
        "RIP" | "UNR" | "IPV4-DIRECT" => Protocol::Other,
        _ => return None,
    };
    Some(protocol)
}

fn table_vrf(table: &str) -> String {
    match table {
        "Public" => DEFAULT_VRF.to_string(),
        other => other.to_string(),
    }
}

/// Columns after the destination: Proto Pre Cost [Flags] NextHop Interface
struct Columns {
    protocol: Protocol,
    preference: Option<u32>,
    cost: Option<u32>,
    next_hop: Option<Ipv4Addr>,
    interface: Option<String>,
}

fn parse_columns(tokens: &[&str]) -> Option<Columns> {
    let (proto, rest) = tokens.split_first()?;
    let protocol = protocol_for_name(proto)?;
    let (next_hop, interface) = match rest {
        [_, _, _, nh, iface] | [_, _, nh, iface] => (addr_token(nh)?, Some(iface.to_string())),
        _ => return None,
    };
    // Direct routes list the local address; loopback/null hops are not neighbors
    let next_hop = if protocol == Protocol::Connected
        || next_hop.is_unspecified()
        || next_hop.is_loopback()
    {
        None
    } else {
        Some(next_hop)
    };
    Some(Columns {
        protocol,
        preference: rest.first().and_then(|p| p.parse().ok()),
        cost: rest.get(1).and_then(|c| c.parse().ok()),
        next_hop,
        interface,
    })
}

impl RibParser for HuaweiParser {
    fn vendor(&self) -> VendorTag {
        VendorTag::Huawei
    }

    fn parse_rib(&self, router: RouterIdentity, text: &str) -> AppResult<Parsed<RouteEntry>> {
        ensure_not_empty(VendorTag::Huawei, router, text)?;

        let mut out = ParseOutput::new(VendorTag::Huawei, router);
        let mut vrf = DEFAULT_VRF.to_string();
        let mut last: Option<Ipv4Net> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if line.is_empty()
                || is_ruler(line)
                || is_cli_prompt(line)
                || line.starts_with("Route Flags")
                || line.starts_with("Destinations")
                || line.starts_with("Destination/Mask")
            {
                continue;
            }
            if let Some(caps) = TABLE_HEADER.captures(line) {
                vrf = table_vrf(&caps["table"]);
                last = None;
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            let (prefix, columns) = match tokens.first().and_then(|t| prefix_token(t)) {
                Some(net) => (net, &tokens[1..]),
                None => match last {
                    Some(net) if protocol_for_name(tokens[0]).is_some() => (net, &tokens[..]),
                    _ => {
                        out.warn(line_no, raw, "no destination prefix");
                        continue;
                    }
                },
            };

            let Some(cols) = parse_columns(columns) else {
                out.warn(line_no, raw, "unrecognized route columns");
                continue;
            };
            let mut entry = RouteEntry::new(router, prefix, cols.protocol, raw);
            entry.vrf = vrf.clone();
            entry.admin_distance = cols.preference;
            entry.metric = cols.cost;
            entry.next_hop = cols.next_hop;
            entry.interface = cols.interface;
            out.push(entry);
            last = Some(prefix);
        }

        out.finish("routes")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> RouterIdentity {
        RouterIdentity::new(Ipv4Addr::new(10, 255, 0, 5))
    }

    const ROUTING_TABLE: &str = r#"<R5>display ip routing-table
Route Flags: R - relay, D - download to fib
------------------------------------------------------------------------------
Routing Tables: Public
         Destinations : 8        Routes : 9

Destination/Mask    Proto   Pre  Cost      Flags NextHop         Interface

        0.0.0.0/0   Static  60   0          RD   10.0.45.4       GigabitEthernet0/0/0
       10.0.34.0/24 OSPF    10   2           D   10.0.45.4       GigabitEthernet0/0/0
                    OSPF    10   2           D   10.0.56.6       GigabitEthernet0/0/1
       10.0.45.0/24 Direct  0    0           D   10.0.45.5       GigabitEthernet0/0/0
       10.0.45.5/32 Direct  0    0           D   127.0.0.1       GigabitEthernet0/0/0
       10.0.56.0/24 Direct  0    0           D   10.0.56.5       GigabitEthernet0/0/1
      10.255.0.5/32 Direct  0    0           D   127.0.0.1       LoopBack0
      127.0.0.0/8   Direct  0    0           D   127.0.0.1       InLoopBack0
    192.168.70.0/24 EBGP    255  0           D   10.0.56.6       GigabitEthernet0/0/1
"#;

    #[test]
    fn test_routing_table() {
        let parsed = HuaweiParser.parse_rib(router(), ROUTING_TABLE).unwrap();
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        let routes = parsed.records;
        assert_eq!(routes.len(), 9);

        assert!(routes[0].is_default());
        assert_eq!(routes[0].protocol, Protocol::Static);
        assert_eq!(routes[0].admin_distance, Some(60));
        assert_eq!(routes[0].next_hop, Some(Ipv4Addr::new(10, 0, 45, 4)));

        let direct = routes
            .iter()
            .find(|r| r.prefix.to_string() == "10.0.45.0/24")
            .unwrap();
        assert_eq!(direct.protocol, Protocol::Connected);
        assert_eq!(direct.next_hop, None);
        assert_eq!(direct.interface.as_deref(), Some("GigabitEthernet0/0/0"));

        let bgp = routes.iter().find(|r| r.protocol == Protocol::Bgp).unwrap();
        assert_eq!(bgp.admin_distance, Some(255));
        assert!(routes.iter().all(|r| r.vrf == "default"));
    }

    #[test]
    fn test_ecmp_continuation() {
        let parsed = HuaweiParser.parse_rib(router(), ROUTING_TABLE).unwrap();
        let ecmp: Vec<_> = parsed
            .records
            .iter()
            .filter(|r| r.prefix.to_string() == "10.0.34.0/24")
            .collect();
        assert_eq!(ecmp.len(), 2);
        assert_eq!(ecmp[1].next_hop, Some(Ipv4Addr::new(10, 0, 56, 6)));
        assert_eq!(ecmp[1].metric, Some(2));
    }

    #[test]
    fn test_vpn_instance_table() {
        let text = "\
Routing Tables: CUST_C
         Destinations : 1        Routes : 1
Destination/Mask    Proto   Pre  Cost      Flags NextHop         Interface
     172.20.3.0/24  Direct  0    0           D   172.20.3.1      GigabitEthernet0/0/3
";
        let parsed = HuaweiParser.parse_rib(router(), text).unwrap();
        assert_eq!(parsed.records[0].vrf, "CUST_C");
    }

    #[test]
    fn test_garbage_is_an_error() {
        let err = HuaweiParser
            .parse_rib(router(), "Error: Unrecognized command found at '^' position.\n")
            .unwrap_err();
        assert!(err.to_string().contains("huawei"));
    }

    #[test]
    fn test_rows_with_and_without_flags() {
        let text = "\
Routing Tables: Public
Destination/Mask    Proto   Pre  Cost      Flags NextHop         Interface
       10.0.34.0/24 OSPF    10   2           D   10.0.45.4       GigabitEthernet0/0/0
       10.0.67.0/24 OSPF    10   3               10.0.56.6       GigabitEthernet0/0/1
";
        let parsed = HuaweiParser.parse_rib(router(), text).unwrap();
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.records[1].next_hop, Some(Ipv4Addr::new(10, 0, 56, 6)));
        assert_eq!(parsed.records[1].interface.as_deref(), Some("GigabitEthernet0/0/1"));
        assert_eq!(parsed.records[1].metric, Some(3));
    }
}
