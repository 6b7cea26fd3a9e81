// Huawei VRP `display ip interface brief`
//
//   *down: administratively down
//   ^down: standby
//   Interface                         IP Address/Mask      Physical   Protocol
//   GigabitEthernet0/0/0              10.0.45.5/24         up         up
//   GigabitEthernet0/0/2              unassigned           *down      down
//   LoopBack0                         10.255.0.5/32        up         up(s)

use super::{interface_address, InterfaceParser, InterfaceRecord};
use crate::error::AppResult;
use crate::identity::RouterIdentity;
use crate::routes::parser::{ensure_not_empty, is_cli_prompt, HuaweiParser, ParseOutput, Parsed};
use crate::vendor::VendorTag;

fn is_legend(line: &str) -> bool {
    line.starts_with("*down")
        || line.starts_with("^down")
        || line.starts_with('(')
        || line.starts_with("The number of")
        || line.starts_with("Interface ")
}

impl InterfaceParser for HuaweiParser {
    fn parse_interfaces(&self, router: RouterIdentity, text: &str) -> AppResult<Parsed<InterfaceRecord>> {
        ensure_not_empty(VendorTag::Huawei, router, text)?;

        let mut out = ParseOutput::new(VendorTag::Huawei, router);

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || is_cli_prompt(line) || is_legend(line) {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            let [name, addr, physical, protocol, ..] = tokens.as_slice() else {
                out.warn(idx + 1, raw, "too few columns");
                continue;
            };
            if addr.eq_ignore_ascii_case("unassigned") {
                continue;
            }
            let Some((ip, mask)) = interface_address(addr, false) else {
                out.warn(idx + 1, raw, "bad interface address");
                continue;
            };

            let mut record = InterfaceRecord::new(router, name, ip, mask);
            // *down is shutdown, ^down is a standby member
            record.admin_up = !physical.starts_with('*') && !physical.starts_with('^');
            record.protocol_up = protocol.starts_with("up");
            out.push(record);
        }

        out.finish("interfaces")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn router() -> RouterIdentity {
        RouterIdentity::new(Ipv4Addr::new(10, 255, 0, 5))
    }

    const BRIEF: &str = r#"<R5>display ip interface brief
*down: administratively down
^down: standby
(l): loopback
(s): spoofing
(E): E-Trunk down
The number of interface that is UP in Physical is 4
The number of interface that is DOWN in Physical is 1
The number of interface that is UP in Protocol is 4
The number of interface that is DOWN in Protocol is 1

Interface                         IP Address/Mask      Physical   Protocol
GigabitEthernet0/0/0              10.0.45.5/24         up         up
GigabitEthernet0/0/1              10.0.56.5/24         up         up
GigabitEthernet0/0/2              10.0.59.5/24         *down      down
GigabitEthernet0/0/3              unassigned           up         down
LoopBack0                         10.255.0.5/32        up         up(s)
NULL0                             unassigned           up         up(s)
"#;

    #[test]
    fn test_display_ip_interface_brief() {
        let parsed = HuaweiParser.parse_interfaces(router(), BRIEF).unwrap();
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        let ifaces = parsed.records;
        assert_eq!(ifaces.len(), 4);

        assert!(ifaces[0].is_up());
        assert_eq!(ifaces[2].name, "GigabitEthernet0/0/2");
        assert!(!ifaces[2].admin_up);
        assert!(ifaces[3].is_loopback());
        assert!(ifaces[3].protocol_up);
    }
}
