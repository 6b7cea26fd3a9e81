// Juniper `show interfaces terse`
//
//   Interface               Admin Link Proto    Local                 Remote
//   ge-0/0/0                up    up
//   ge-0/0/0.0              up    up   inet     10.0.12.2/24
//                                      multiservice
//   lo0.0                   up    up   inet     10.255.0.2          --> 0/0
//                                               127.0.0.1           --> 0/0
//
// Logical units (ge-0/0/0.0) are down when their physical port is down.
// Loopback addresses without a mask are host routes.

use std::collections::HashMap;

use super::{interface_address, InterfaceParser, InterfaceRecord};
use crate::error::AppResult;
use crate::identity::RouterIdentity;
use crate::routes::parser::{ensure_not_empty, is_cli_prompt, JuniperParser, ParseOutput, Parsed};
use crate::vendor::VendorTag;

fn state(token: &str) -> Option<bool> {
    match token {
        "up" => Some(true),
        "down" => Some(false),
        _ => None,
    }
}

struct Current {
    name: String,
    admin_up: bool,
    link_up: bool,
    family: Option<String>,
}

fn record(router: RouterIdentity, current: &Current, token: &str) -> Option<InterfaceRecord> {
    if current.family.as_deref() != Some("inet") {
        return None;
    }
    let (ip, mask) = interface_address(token, true)?;
    let mut record = InterfaceRecord::new(router, &current.name, ip, mask);
    record.admin_up = current.admin_up;
    record.protocol_up = current.link_up;
    Some(record)
}

impl InterfaceParser for JuniperParser {
    fn parse_interfaces(&self, router: RouterIdentity, text: &str) -> AppResult<Parsed<InterfaceRecord>> {
        ensure_not_empty(VendorTag::Juniper, router, text)?;

        let mut out = ParseOutput::new(VendorTag::Juniper, router);
        let mut physical: HashMap<String, (bool, bool)> = HashMap::new();
        let mut current: Option<Current> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || is_cli_prompt(line) || line.starts_with("Interface ") {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();

            if !raw.starts_with(char::is_whitespace) {
                let (Some(admin), Some(link)) = (
                    tokens.get(1).and_then(|t| state(t)),
                    tokens.get(2).and_then(|t| state(t)),
                ) else {
                    current = None;
                    out.warn(idx + 1, raw, "missing admin/link state");
                    continue;
                };
                let name = tokens[0].to_string();
                let (admin_up, link_up) = match name.split_once('.') {
                    Some((port, _)) => {
                        let (port_admin, port_link) =
                            physical.get(port).copied().unwrap_or((true, true));
                        (admin && port_admin, link && port_link)
                    }
                    None => {
                        physical.insert(name.clone(), (admin, link));
                        (admin, link)
                    }
                };
                let unit = Current {
                    name,
                    admin_up,
                    link_up,
                    family: tokens.get(3).map(|f| f.to_string()),
                };
                if let Some(addr) = tokens.get(4) {
                    if let Some(rec) = record(router, &unit, addr) {
                        out.push(rec);
                    }
                }
                current = Some(unit);
                continue;
            }

            // Continuation: "inet 10.0.1.1/24", "10.0.2.1/24", "multiservice"
            let Some(unit) = current.as_mut() else {
                out.warn(idx + 1, raw, "address without an interface");
                continue;
            };
            let addr = if tokens[0].starts_with(|c: char| c.is_ascii_digit()) {
                tokens[0]
            } else {
                unit.family = Some(tokens[0].to_string());
                match tokens.get(1) {
                    Some(addr) => *addr,
                    None => continue,
                }
            };
            if let Some(rec) = record(router, unit, addr) {
                out.push(rec);
            }
        }

        out.finish("interfaces")
    }
}
