// Arista EOS `show ip route` parser
//
// Format:
//   VRF: default
//   Codes: C - connected, S - static, K - kernel,
//          O - OSPF, IA - OSPF inter area, E1 - OSPF external type 1,
//          ...
//
//   Gateway of last resort:
//    S        0.0.0.0/0 [1/0] via 10.0.13.1, Ethernet1
//
//    C        10.0.13.0/24 is directly connected, Ethernet1
//    O        10.0.24.0/24 [110/20] via 10.0.13.1, Ethernet1
//                                   via 10.0.34.4, Ethernet2

use ipnet::Ipv4Net;

use super::{
    addr_token, ensure_not_empty, is_cli_prompt, parse_via_tail, prefix_token, ParseOutput,
    Parsed, RibParser,
};
use crate::error::AppResult;
use crate::identity::RouterIdentity;
use crate::routes::{Protocol, RouteEntry, DEFAULT_VRF};
use crate::vendor::VendorTag;

pub struct AristaParser;

fn protocol_for_code(code: &str) -> Protocol {
    match code {
        "C" => Protocol::Connected,
        "S" => Protocol::Static,
        "O" => Protocol::Ospf,
        "B" => Protocol::Bgp,
        "I" => Protocol::Isis,
        _ => Protocol::Other,
    }
}

impl RibParser for AristaParser {
    fn vendor(&self) -> VendorTag {
        VendorTag::Arista
    }

    fn parse_rib(&self, router: RouterIdentity, text: &str) -> AppResult<Parsed<RouteEntry>> {
        ensure_not_empty(VendorTag::Arista, router, text)?;

        let mut out = ParseOutput::new(VendorTag::Arista, router);
        let mut vrf = DEFAULT_VRF.to_string();
        let mut in_legend = false;
        let mut last: Option<(Ipv4Net, Protocol, Option<(u32, u32)>)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if line.is_empty() {
                in_legend = false;
                continue;
            }
            if let Some(name) = line.strip_prefix("VRF:") {
                vrf = name.trim().to_string();
                last = None;
                continue;
            }
            if line.starts_with("Codes:") {
                in_legend = true;
                continue;
            }
            if line.starts_with("Gateway of last resort") {
                in_legend = false;
                continue;
            }
            if in_legend || is_cli_prompt(line) {
                continue;
            }

            // ECMP continuation: "via 10.0.34.4, Ethernet2"
            if line.starts_with("via ") || line.starts_with('[') {
                let Some((prefix, protocol, distance_metric)) = last else {
                    out.warn(line_no, raw, "next hop without a preceding route");
                    continue;
                };
                match parse_via_tail(line) {
                    Some(mut tail) => {
                        tail.distance_metric = tail.distance_metric.or(distance_metric);
                        let mut entry = RouteEntry::new(router, prefix, protocol, raw);
                        entry.vrf = vrf.clone();
                        tail.apply(&mut entry);
                        out.push(entry);
                    }
                    None => out.warn(line_no, raw, "unrecognized next hop line"),
                }
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            let Some((pos, prefix)) = tokens
                .iter()
                .enumerate()
                .find_map(|(i, t)| prefix_token(t).map(|net| (i, net)))
            else {
                let reason = if tokens.iter().any(|t| addr_token(t).is_some()) {
                    "destination without a mask"
                } else {
                    "no destination prefix"
                };
                out.warn(line_no, raw, reason);
                continue;
            };
            if pos == 0 {
                out.warn(line_no, raw, "route without a protocol code");
                continue;
            }
            let protocol = protocol_for_code(tokens[0]);
            let tail = tokens[pos + 1..].join(" ");

            match parse_via_tail(&tail) {
                Some(tail) => {
                    let distance_metric = tail.distance_metric;
                    let mut entry = RouteEntry::new(router, prefix, protocol, raw);
                    entry.vrf = vrf.clone();
                    tail.apply(&mut entry);
                    out.push(entry);
                    last = Some((prefix, protocol, distance_metric));
                }
                None => out.warn(line_no, raw, "unrecognized route tail"),
            }
        }

        out.finish("routes")
    }
}
