// Routes module - normalized RIB entries, vendor parsers and route lookups

pub mod lookup;
pub mod parser;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

use crate::identity::RouterIdentity;

pub const DEFAULT_VRF: &str = "default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Connected,
    Static,
    Ospf,
    Bgp,
    Isis,
    Other,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Protocol::Connected => "connected",
            Protocol::Static => "static",
            Protocol::Ospf => "ospf",
            Protocol::Bgp => "bgp",
            Protocol::Isis => "isis",
            Protocol::Other => "other",
        };
        f.write_str(name)
    }
}

/// One RIB line, normalized. Fields a vendor does not print stay `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub router: RouterIdentity,
    pub prefix: Ipv4Net,
    pub next_hop: Option<Ipv4Addr>,
    pub protocol: Protocol,
    pub metric: Option<u32>,
    pub admin_distance: Option<u32>,
    pub vrf: String,
    pub interface: Option<String>,
    pub raw_line: String,
}

/// Row key of a route inside one router's table. ECMP entries differ by next hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteKey {
    pub prefix: Ipv4Net,
    pub next_hop: Option<Ipv4Addr>,
    pub protocol: Protocol,
}

impl RouteEntry {
    pub fn new(router: RouterIdentity, prefix: Ipv4Net, protocol: Protocol, raw_line: &str) -> Self {
        RouteEntry {
            router,
            prefix,
            next_hop: None,
            protocol,
            metric: None,
            admin_distance: None,
            vrf: DEFAULT_VRF.to_string(),
            interface: None,
            raw_line: raw_line.to_string(),
        }
    }

    pub fn key(&self) -> RouteKey {
        RouteKey {
            prefix: self.prefix,
            next_hop: self.next_hop,
            protocol: self.protocol,
        }
    }

    pub fn is_default(&self) -> bool {
        self.prefix.prefix_len() == 0
    }
}
