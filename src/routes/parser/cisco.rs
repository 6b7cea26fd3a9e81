// Cisco IOS / IOS-XE `show ip route` parser
//
// Format:
//   Codes: L - local, C - connected, S - static, ...
//
//   Gateway of last resort is 10.0.12.2 to network 0.0.0.0
//
//   S*    0.0.0.0/0 [1/0] via 10.0.12.2
//         10.0.0.0/8 is variably subnetted, 5 subnets, 2 masks
//   C        10.0.12.0/24 is directly connected, GigabitEthernet0/0
//   O        10.0.34.0/24 [110/3] via 10.0.12.2, 00:01:02, GigabitEthernet0/0
//                         [110/3] via 10.0.13.3, 00:01:02, GigabitEthernet0/1

use ipnet::Ipv4Net;

use super::{
    addr_token, ensure_not_empty, is_cli_prompt, parse_via_tail, prefix_token, ParseOutput,
    Parsed, RibParser,
};
use crate::error::AppResult;
use crate::identity::RouterIdentity;
use crate::routes::{Protocol, RouteEntry, DEFAULT_VRF};
use crate::vendor::VendorTag;

pub struct CiscoParser;

fn protocol_for_code(code: &str) -> Protocol {
    let base: String = code.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    match base.as_str() {
        "C" | "L" => Protocol::Connected,
        "S" => Protocol::Static,
        "O" => Protocol::Ospf,
        "B" => Protocol::Bgp,
        "i" => Protocol::Isis,
        _ => Protocol::Other,
    }
}

/// Prefix token, optionally without mask when a classful "is subnetted"
/// header supplied one.
fn destination(token: &str, classful_len: Option<u8>) -> Option<Ipv4Net> {
    if token.contains('/') {
        return prefix_token(token);
    }
    let addr = addr_token(token)?;
    Ipv4Net::new(addr, classful_len?).ok()
}

impl RibParser for CiscoParser {
    fn vendor(&self) -> VendorTag {
        VendorTag::Cisco
    }

    fn parse_rib(&self, router: RouterIdentity, text: &str) -> AppResult<Parsed<RouteEntry>> {
        ensure_not_empty(VendorTag::Cisco, router, text)?;

        let mut out = ParseOutput::new(VendorTag::Cisco, router);
        let mut vrf = DEFAULT_VRF.to_string();
        let mut in_legend = false;
        let mut classful_len: Option<u8> = None;
        // Prefix and protocol of the last route line, for ECMP continuations
        let mut last: Option<(Ipv4Net, Protocol)> = None;
        // Long entries wrap: the prefix line has no tail and the next
        // "[ad/metric] via ..." line completes it
        let mut wrapped: Option<(usize, &str)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();

            if line.is_empty() {
                in_legend = false;
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
            if let Some(name) = line.strip_prefix("Routing Table:") {
                vrf = name.trim().to_string();
                last = None;
                continue;
            }
            if line.contains(" is subnetted") || line.contains(" is variably subnetted") {
                classful_len = if line.contains("variably") {
                    None
                } else {
                    line.split_whitespace()
                        .next()
                        .and_then(prefix_token)
                        .map(|net| net.prefix_len())
                };
                continue;
            }

            if let Some((wrapped_no, wrapped_raw)) = wrapped.take() {
                if !line.starts_with('[') {
                    out.warn(wrapped_no, wrapped_raw, "route without a next hop");
                    last = None;
                }
            }

            // ECMP continuation: "[110/3] via 10.0.13.3, 00:01:02, Gi0/1"
            if line.starts_with('[') {
                let Some((prefix, protocol)) = last else {
                    out.warn(line_no, raw, "next hop without a preceding route");
                    continue;
                };
                match parse_via_tail(line) {
                    Some(tail) => {
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
            let Some(pos) = tokens
                .iter()
                .position(|t| addr_token(t.split('/').next().unwrap_or(t)).is_some())
            else {
                out.warn(line_no, raw, "no destination prefix");
                last = None;
                continue;
            };
            if pos == 0 {
                out.warn(line_no, raw, "route without a protocol code");
                last = None;
                continue;
            }
            let Some(prefix) = destination(tokens[pos], classful_len) else {
                out.warn(line_no, raw, "destination without a usable mask");
                last = None;
                continue;
            };
            let protocol = protocol_for_code(tokens[0]);
            let tail = tokens[pos + 1..].join(" ");

            if tail.is_empty() {
                last = Some((prefix, protocol));
                wrapped = Some((line_no, raw));
                continue;
            }
            match parse_via_tail(&tail) {
                Some(tail) => {
                    let mut entry = RouteEntry::new(router, prefix, protocol, raw);
                    entry.vrf = vrf.clone();
                    tail.apply(&mut entry);
                    out.push(entry);
                    last = Some((prefix, protocol));
                }
                None => {
                    out.warn(line_no, raw, "unrecognized route tail");
                    last = None;
                }
            }
        }
        if let Some((wrapped_no, wrapped_raw)) = wrapped {
            out.warn(wrapped_no, wrapped_raw, "route without a next hop");
        }

        out.finish("routes")
    }
}
