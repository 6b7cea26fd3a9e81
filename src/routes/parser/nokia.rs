// Nokia SR OS `show router route-table` parser
//
// Format:
//   ===============================================================================
//   Route Table (Router: Base)
//   ===============================================================================
//   Dest Prefix[Flags]                            Type    Proto     Age        Pref
//         Next Hop[Interface Name]                                    Metric
//   -------------------------------------------------------------------------------
//   10.0.24.0/24                                  Local   Local     01h02m03s  0
//          to-r2                                                        0
//   10.0.12.0/24                                  Remote  OSPF      00h10m00s  10
//          10.0.24.2                                                    200
//   -------------------------------------------------------------------------------
//   No. of Routes: 2
//
// Records span two lines. Several next-hop lines under one prefix are ECMP.

use ipnet::Ipv4Net;
use regex::Regex;
use std::sync::LazyLock;

use super::{
    addr_token, ensure_not_empty, is_cli_prompt, is_ruler, prefix_token, ParseOutput, Parsed,
    RibParser,
};
use crate::error::AppResult;
use crate::identity::RouterIdentity;
use crate::routes::{Protocol, RouteEntry, DEFAULT_VRF};
use crate::vendor::VendorTag;

pub struct NokiaParser;

static TABLE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Route Table \((?:Router|Service): (?P<instance>[^)]+)\)")
        .expect("valid route table header regex")
});

fn protocol_for_name(name: &str) -> Protocol {
    let upper = name.to_ascii_uppercase();
    match upper.as_str() {
        "LOCAL" => Protocol::Connected,
        "STATIC" => Protocol::Static,
        "OSPF" | "OSPF3" => Protocol::Ospf,
        "ISIS" => Protocol::Isis,
        _ if upper.starts_with("BGP") => Protocol::Bgp,
        _ => Protocol::Other,
    }
}

fn instance_vrf(instance: &str) -> String {
    match instance.trim() {
        "Base" => DEFAULT_VRF.to_string(),
        other => other.to_string(),
    }
}

struct PrefixLine {
    prefix: Ipv4Net,
    protocol: Protocol,
    preference: Option<u32>,
    raw: String,
    emitted: usize,
}

impl PrefixLine {
    fn route(&self, router: RouterIdentity, vrf: &str, hop_line: Option<&str>) -> RouteEntry {
        let raw = match hop_line {
            Some(hop) => format!("{}\n{}", self.raw, hop),
            None => self.raw.clone(),
        };
        let mut entry = RouteEntry::new(router, self.prefix, self.protocol, &raw);
        entry.admin_distance = self.preference;
        entry.vrf = vrf.to_string();
        entry
    }
}

fn flush(out: &mut ParseOutput<RouteEntry>, current: Option<PrefixLine>, router: RouterIdentity, vrf: &str) {
    if let Some(current) = current {
        if current.emitted == 0 {
            out.push(current.route(router, vrf, None));
        }
    }
}

/// "10.0.0.0/24 [L]" and "10.0.0.0/24[L]" carry route flags after the prefix.
fn strip_flags(token: &str) -> &str {
    token.split('[').next().unwrap_or(token)
}

impl RibParser for NokiaParser {
    fn vendor(&self) -> VendorTag {
        VendorTag::Nokia
    }

    fn parse_rib(&self, router: RouterIdentity, text: &str) -> AppResult<Parsed<RouteEntry>> {
        ensure_not_empty(VendorTag::Nokia, router, text)?;

        let mut out = ParseOutput::new(VendorTag::Nokia, router);
        let mut vrf = DEFAULT_VRF.to_string();
        let mut in_trailer = false;
        let mut current: Option<PrefixLine> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if line.is_empty() || is_ruler(line) || is_cli_prompt(line) {
                continue;
            }
            if let Some(caps) = TABLE_HEADER.captures(line) {
                flush(&mut out, current.take(), router, &vrf);
                vrf = instance_vrf(&caps["instance"]);
                in_trailer = false;
                continue;
            }
            if line.starts_with("No. of Routes") {
                flush(&mut out, current.take(), router, &vrf);
                in_trailer = true;
                continue;
            }
            if in_trailer || line.starts_with("Dest Prefix") || line.starts_with("Next Hop[") {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();

            if !raw.starts_with(char::is_whitespace) {
                // Prefix line: prefix [flags] type proto age pref
                let Some(prefix) = tokens.first().map(|t| strip_flags(t)).and_then(prefix_token) else {
                    out.warn(line_no, raw, "no destination prefix");
                    continue;
                };
                let fields: Vec<&str> = tokens[1..]
                    .iter()
                    .copied()
                    .filter(|t| !t.starts_with('['))
                    .collect();
                if fields.len() < 3 {
                    out.warn(line_no, raw, "missing type/protocol columns");
                    continue;
                }
                flush(&mut out, current.take(), router, &vrf);
                current = Some(PrefixLine {
                    prefix,
                    protocol: protocol_for_name(fields[1]),
                    preference: fields.last().and_then(|p| p.parse().ok()),
                    raw: raw.to_string(),
                    emitted: 0,
                });
                continue;
            }

            // Next-hop line: next hop address or interface name, then metric
            let Some(prefix_line) = current.as_mut() else {
                out.warn(line_no, raw, "next hop without a route");
                continue;
            };
            let Some(first) = tokens.first() else {
                continue;
            };
            let mut entry = prefix_line.route(router, &vrf, Some(raw));
            match addr_token(first) {
                Some(nh) => entry.next_hop = Some(nh),
                None => entry.interface = Some(first.to_string()),
            }
            if tokens.len() > 1 {
                entry.metric = tokens.last().and_then(|m| m.parse().ok());
            }
            prefix_line.emitted += 1;
            out.push(entry);
        }

        flush(&mut out, current.take(), router, &vrf);

        out.finish("routes")
    }
}
