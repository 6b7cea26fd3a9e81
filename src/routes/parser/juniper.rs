// Juniper Junos `show route` parser
//
// Format:
//   inet.0: 6 destinations, 7 routes (6 active, 0 holddown, 0 hidden)
//   + = Active Route, - = Last Active, * = Both
//
//   10.0.12.0/24       *[Direct/0] 2d 03:04:05
//                       > via ge-0/0/0.0
//   10.0.34.0/24       *[OSPF/10] 00:10:00, metric 3
//                       > to 10.0.12.1 via ge-0/0/0.0
//                         to 10.0.23.3 via ge-0/0/1.0
//                       [Static/200] 00:20:00
//                       > to 10.0.12.1 via ge-0/0/0.0
//
// Every next-hop line is its own RouteEntry. An entry with no next-hop line
// (Discard, Reject) yields one entry without a next hop.

use ipnet::Ipv4Net;
use regex::Regex;
use std::sync::LazyLock;

use super::{
    addr_token, ensure_not_empty, is_cli_prompt, prefix_token, ParseOutput, Parsed, RibParser,
};
use crate::error::AppResult;
use crate::identity::RouterIdentity;
use crate::routes::{Protocol, RouteEntry, DEFAULT_VRF};
use crate::vendor::VendorTag;

pub struct JuniperParser;

static TABLE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<table>\S+):\s+\d+ destinations").expect("valid table header regex")
});

static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[*+\-]?\[(?P<proto>[A-Za-z0-9\-]+)/(?P<pref>\d+)(?:/\d+)?\](?P<tail>.*)$")
        .expect("valid route entry regex")
});

static METRIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bmetric (?P<metric>\d+)").expect("valid metric regex"));

fn protocol_for_name(name: &str) -> Protocol {
    match name.to_ascii_uppercase().as_str() {
        "DIRECT" | "LOCAL" => Protocol::Connected,
        "STATIC" => Protocol::Static,
        "OSPF" | "OSPF3" => Protocol::Ospf,
        "BGP" => Protocol::Bgp,
        "IS-IS" => Protocol::Isis,
        _ => Protocol::Other,
    }
}

/// Routing instance of a table name: `inet.0` is the default instance,
/// `CUST_A.inet.0` belongs to CUST_A. Non-IPv4 tables return `None`.
fn table_vrf(table: &str) -> Option<String> {
    if table == "inet.0" {
        return Some(DEFAULT_VRF.to_string());
    }
    table.strip_suffix(".inet.0").map(String::from)
}

struct Entry {
    prefix: Ipv4Net,
    protocol: Protocol,
    preference: u32,
    metric: Option<u32>,
    raw: String,
    emitted: usize,
}

impl Entry {
    fn route(&self, router: RouterIdentity, vrf: &str, hop_line: Option<&str>) -> RouteEntry {
        let raw = match hop_line {
            Some(hop) => format!("{}\n{}", self.raw, hop),
            None => self.raw.clone(),
        };
        let mut entry = RouteEntry::new(router, self.prefix, self.protocol, &raw);
        entry.admin_distance = Some(self.preference);
        entry.metric = self.metric;
        entry.vrf = vrf.to_string();
        entry
    }
}

fn flush(out: &mut ParseOutput<RouteEntry>, entry: Option<Entry>, router: RouterIdentity, vrf: &str) {
    if let Some(entry) = entry {
        if entry.emitted == 0 {
            out.push(entry.route(router, vrf, None));
        }
    }
}

/// Next-hop line forms: `> to X via IF`, `to X via IF`, `via IF`,
/// `Local via IF`, `Discard`, `Reject`, `Receive`.
enum Hop {
    Forward { next_hop: Option<std::net::Ipv4Addr>, interface: Option<String> },
    NoNextHop,
}

// Route attribute lines printed under an entry, skipped without a warning
const ATTRIBUTE_PREFIXES: &[&str] = &[
    "AS path:",
    "Age:",
    "validation-state",
    "Communities:",
    "Local Preference:",
    "Localpref:",
    "Metric:",
    "Next hop type:",
    "Protocol next hop:",
    "Router ID:",
    "State:",
    "Task:",
];

fn is_attribute_line(line: &str) -> bool {
    ATTRIBUTE_PREFIXES.iter().any(|p| line.starts_with(p))
}

fn parse_hop(line: &str) -> Option<Hop> {
    let line = line.trim_start_matches('>').trim();
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        ["to", nh, "via", iface, ..] => Some(Hop::Forward {
            next_hop: Some(addr_token(nh)?),
            interface: Some(iface.to_string()),
        }),
        ["to", nh] => Some(Hop::Forward {
            next_hop: Some(addr_token(nh)?),
            interface: None,
        }),
        ["via", iface, ..] | ["Local", "via", iface, ..] => Some(Hop::Forward {
            next_hop: None,
            interface: Some(iface.to_string()),
        }),
        ["Discard"] | ["Reject"] | ["Receive"] | ["Multicast"] => Some(Hop::NoNextHop),
        _ => None,
    }
}

impl RibParser for JuniperParser {
    fn vendor(&self) -> VendorTag {
        VendorTag::Juniper
    }

    fn parse_rib(&self, router: RouterIdentity, text: &str) -> AppResult<Parsed<RouteEntry>> {
        ensure_not_empty(VendorTag::Juniper, router, text)?;

        let mut out = ParseOutput::new(VendorTag::Juniper, router);
        // None while inside a table that is not IPv4 unicast
        let mut vrf: Option<String> = Some(DEFAULT_VRF.to_string());
        let mut prefix: Option<Ipv4Net> = None;
        let mut entry: Option<Entry> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if line.is_empty() || is_cli_prompt(line) || line.starts_with("+ =") {
                continue;
            }

            if let Some(caps) = TABLE_HEADER.captures(line) {
                let current_vrf = vrf.clone().unwrap_or_default();
                flush(&mut out, entry.take(), router, &current_vrf);
                prefix = None;
                vrf = table_vrf(&caps["table"]);
                continue;
            }
            let Some(current_vrf) = vrf.clone() else {
                continue;
            };

            // Route header: destination in the first column
            let mut rest = line;
            if !raw.starts_with(char::is_whitespace) {
                let mut split = line.splitn(2, char::is_whitespace);
                let first = split.next().unwrap_or_default();
                let Some(net) = prefix_token(first) else {
                    out.warn(line_no, raw, "no destination prefix");
                    continue;
                };
                flush(&mut out, entry.take(), router, &current_vrf);
                prefix = Some(net);
                rest = split.next().unwrap_or_default().trim();
                if rest.is_empty() {
                    continue;
                }
            }

            if let Some(caps) = ENTRY.captures(rest) {
                flush(&mut out, entry.take(), router, &current_vrf);
                let Some(net) = prefix else {
                    out.warn(line_no, raw, "route entry without a destination");
                    continue;
                };
                entry = Some(Entry {
                    prefix: net,
                    protocol: protocol_for_name(&caps["proto"]),
                    preference: caps["pref"].parse().unwrap_or_default(),
                    metric: METRIC
                        .captures(&caps["tail"])
                        .and_then(|m| m["metric"].parse().ok()),
                    raw: raw.to_string(),
                    emitted: 0,
                });
                continue;
            }

            match (parse_hop(rest), entry.as_mut()) {
                (Some(Hop::Forward { next_hop, interface }), Some(current)) => {
                    let mut route = current.route(router, &current_vrf, Some(raw));
                    route.next_hop = next_hop;
                    route.interface = interface;
                    current.emitted += 1;
                    out.push(route);
                }
                (Some(Hop::NoNextHop), Some(_)) => {}
                (Some(_), None) => out.warn(line_no, raw, "next hop without a route entry"),
                (None, _) if is_attribute_line(rest) => {}
                (None, _) => out.warn(line_no, raw, "unrecognized line"),
            }
        }

        let current_vrf = vrf.unwrap_or_default();
        flush(&mut out, entry.take(), router, &current_vrf);

        out.finish("routes")
    }
}
