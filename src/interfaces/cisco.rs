// Cisco IOS `show ip interface`
//
//   GigabitEthernet0/0 is up, line protocol is up
//     Internet address is 10.0.12.1/24
//     Broadcast address is 255.255.255.255
//   GigabitEthernet0/2 is administratively down, line protocol is down
//     Internet protocol processing disabled

use regex::Regex;
use std::sync::LazyLock;

use super::{interface_address, InterfaceParser, InterfaceRecord};
use crate::addr::{netmask_to_prefix_len, parse_ipv4};
use crate::error::AppResult;
use crate::identity::RouterIdentity;
use crate::routes::parser::{ensure_not_empty, is_cli_prompt, CiscoParser, ParseOutput, Parsed};
use crate::vendor::VendorTag;

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?P<name>\S+) is (?P<admin>administratively down|up|down|deleted)[^,]*, line protocol is (?P<proto>\w+)",
    )
    .expect("valid interface header regex")
});

static ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Internet address is|Secondary address) (?P<addr>\S+)(?:\s+(?P<mask>\d+\.\d+\.\d+\.\d+))?")
        .expect("valid interface address regex")
});

/// `10.0.12.1/24` or `10.0.12.1 255.255.255.0`
fn address(addr: &str, mask: Option<&str>) -> Option<(std::net::Ipv4Addr, u8)> {
    match mask {
        Some(mask) => {
            let ip = parse_ipv4(addr).ok()?;
            let len = netmask_to_prefix_len(mask).ok()?;
            interface_address(&format!("{}/{}", ip, len), false)
        }
        None => interface_address(addr, false),
    }
}

impl InterfaceParser for CiscoParser {
    fn parse_interfaces(&self, router: RouterIdentity, text: &str) -> AppResult<Parsed<InterfaceRecord>> {
        ensure_not_empty(VendorTag::Cisco, router, text)?;

        let mut out = ParseOutput::new(VendorTag::Cisco, router);
        // name, admin up, protocol up
        let mut current: Option<(String, bool, bool)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || is_cli_prompt(line) {
                continue;
            }

            if !raw.starts_with(char::is_whitespace) {
                match HEADER.captures(line) {
                    Some(caps) => {
                        current = Some((
                            caps["name"].to_string(),
                            // plain "down" is a shut peer or pulled cable, not a shutdown
                            !matches!(&caps["admin"], "administratively down" | "deleted"),
                            &caps["proto"] == "up",
                        ));
                    }
                    None => {
                        current = None;
                        out.warn(idx + 1, raw, "unrecognized interface header");
                    }
                }
                continue;
            }

            let Some(caps) = ADDRESS.captures(line) else {
                // MTU, helper addresses, ACLs and the rest of the detail block
                continue;
            };
            let Some((name, admin_up, protocol_up)) = current.as_ref() else {
                out.warn(idx + 1, raw, "address without an interface");
                continue;
            };
            let Some((ip, mask)) = address(&caps["addr"], caps.name("mask").map(|m| m.as_str())) else {
                out.warn(idx + 1, raw, "bad interface address");
                continue;
            };
            let mut record = InterfaceRecord::new(router, name, ip, mask);
            record.admin_up = *admin_up;
            record.protocol_up = *protocol_up;
            out.push(record);
        }

        out.finish("interfaces")
    }
}
