// Arista EOS `show ip interface brief`
//
//   Interface       IP Address         Status       Protocol         MTU
//   Ethernet1       10.0.13.3/24       up           up              1500
//   Ethernet3       10.0.36.3/24       admin down   down            1500

use super::{interface_address, InterfaceParser, InterfaceRecord};
use crate::error::AppResult;
use crate::identity::RouterIdentity;
use crate::routes::parser::{
    ensure_not_empty, is_cli_prompt, is_ruler, AristaParser, ParseOutput, Parsed,
};
use crate::vendor::VendorTag;

impl InterfaceParser for AristaParser {
    fn parse_interfaces(&self, router: RouterIdentity, text: &str) -> AppResult<Parsed<InterfaceRecord>> {
        ensure_not_empty(VendorTag::Arista, router, text)?;

        let mut out = ParseOutput::new(VendorTag::Arista, router);

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty()
                || is_cli_prompt(line)
                || is_ruler(line)
                || line.starts_with("Interface ")
                || line == "Address"
            {
                continue;
            }

            let tokens: Vec<&str> = line.split_whitespace().collect();
            let [name, addr, rest @ ..] = tokens.as_slice() else {
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
            let (admin_up, protocol) = match rest {
                ["admin", "down", protocol, ..] => (false, *protocol),
                [_status, protocol, ..] => (true, *protocol),
                _ => {
                    out.warn(idx + 1, raw, "missing status columns");
                    continue;
                }
            };

            let mut record = InterfaceRecord::new(router, name, ip, mask);
            record.admin_up = admin_up;
            record.protocol_up = protocol == "up";
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
        RouterIdentity::new(Ipv4Addr::new(10, 255, 0, 3))
    }

    const BRIEF: &str = r#"R3#show ip interface brief
                                                                        Address
Interface       IP Address         Status       Protocol         MTU    Owner
--------------- ------------------ ------------ -------------- -------- -------
Ethernet1       10.0.13.3/24       up           up              1500
Ethernet2       10.0.34.3/24       up           up              1500
Ethernet3       10.0.36.3/24       admin down   down            1500
Ethernet4       unassigned         up           up              1500
Loopback0       10.255.0.3/32      up           up             65535
Management1     192.168.100.13/24  up           lowerlayerdown  1500
"#;

    #[test]
    fn test_show_ip_interface_brief() {
        let parsed = AristaParser.parse_interfaces(router(), BRIEF).unwrap();
        assert!(parsed.warnings.is_empty(), "{:?}", parsed.warnings);
        let ifaces = parsed.records;
        assert_eq!(ifaces.len(), 5);

        assert_eq!(ifaces[0].name, "Ethernet1");
        assert!(ifaces[0].is_up());

        assert_eq!(ifaces[2].name, "Ethernet3");
        assert!(!ifaces[2].admin_up);

        assert!(ifaces[3].is_loopback());
        assert!(!ifaces[4].protocol_up);
    }
}
