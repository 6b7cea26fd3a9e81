// Nokia SR OS `show router interface`
//
//   Interface-Name                   Adm       Opr(v4/v6)  Mode    Port/SapId
//      IP-Address                                                  PfxState
//   -------------------------------------------------------------------------------
//   system                           Up        Up/Down     Network system
//      10.255.0.4/32                                               n/a
//   to-r2                            Up        Up/Down     Network 1/1/1
//      10.0.24.4/24                                                n/a

use super::{interface_address, InterfaceParser, InterfaceRecord};
use crate::error::AppResult;
use crate::identity::RouterIdentity;
use crate::routes::parser::{
    ensure_not_empty, is_cli_prompt, is_ruler, NokiaParser, ParseOutput, Parsed,
};
use crate::vendor::VendorTag;

impl InterfaceParser for NokiaParser {
    fn parse_interfaces(&self, router: RouterIdentity, text: &str) -> AppResult<Parsed<InterfaceRecord>> {
        ensure_not_empty(VendorTag::Nokia, router, text)?;

        let mut out = ParseOutput::new(VendorTag::Nokia, router);
        let mut current: Option<(String, bool, bool)> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty()
                || is_cli_prompt(line)
                || is_ruler(line)
                || line.starts_with("Interface Table")
                || line.starts_with("Interface-Name")
                || line.starts_with("IP-Address")
                || line.starts_with("Interfaces :")
            {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();

            if !raw.starts_with(char::is_whitespace) {
                let [name, adm, opr, ..] = tokens.as_slice() else {
                    current = None;
                    out.warn(idx + 1, raw, "too few columns");
                    continue;
                };
                let v4_oper = opr.split('/').next().unwrap_or_default();
                current = Some((
                    name.to_string(),
                    adm.eq_ignore_ascii_case("up"),
                    v4_oper.eq_ignore_ascii_case("up"),
                ));
                continue;
            }

            let Some((name, admin_up, protocol_up)) = current.as_ref() else {
                out.warn(idx + 1, raw, "address without an interface");
                continue;
            };
            // IPv6 and unnumbered rows carry no IPv4 address
            let Some((ip, mask)) = interface_address(tokens[0], false) else {
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
