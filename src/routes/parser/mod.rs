// Vendor RIB parsers. Each vendor grammar lives in its own module and turns
// raw `show route` style text into normalized `RouteEntry` records.

pub mod arista;
pub mod cisco;
pub mod huawei;
pub mod juniper;
pub mod nokia;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use super::{Protocol, RouteEntry};
use crate::addr::{parse_cidr, parse_ipv4};
use crate::error::{AppError, AppResult};
use crate::identity::RouterIdentity;
use crate::interfaces::InterfaceParser;
use crate::vendor::VendorTag;

pub use arista::AristaParser;
pub use cisco::CiscoParser;
pub use huawei::HuaweiParser;
pub use juniper::JuniperParser;
pub use nokia::NokiaParser;

/// A line that could not be understood. Parsing continues past it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    /// 1-based line number in the raw text
    pub line: usize,
    pub text: String,
    pub reason: String,
}

/// Records produced from one raw text blob plus the lines that were skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub warnings: Vec<ParseWarning>,
}

pub trait RibParser: Send + Sync {
    fn vendor(&self) -> VendorTag;

    fn parse_rib(&self, router: RouterIdentity, text: &str) -> AppResult<Parsed<RouteEntry>>;
}

/// Everything needed to ingest one vendor's output.
pub trait VendorParser: RibParser + InterfaceParser {}

impl<T: RibParser + InterfaceParser> VendorParser for T {}

/// Parser bound to a vendor tag. `Unknown` has none.
pub fn parser_for(vendor: VendorTag) -> Option<&'static dyn VendorParser> {
    match vendor {
        VendorTag::Cisco => Some(&CiscoParser),
        VendorTag::Juniper => Some(&JuniperParser),
        VendorTag::Arista => Some(&AristaParser),
        VendorTag::Nokia => Some(&NokiaParser),
        VendorTag::Huawei => Some(&HuaweiParser),
        VendorTag::Unknown => None,
    }
}

/// Parse a raw RIB dump with the parser bound to `vendor`.
pub fn parse_rib(
    vendor: VendorTag,
    router: RouterIdentity,
    text: &str,
) -> AppResult<Parsed<RouteEntry>> {
    let parser = parser_for(vendor)
        .ok_or_else(|| AppError::parse(vendor, router, "no RIB parser for this vendor"))?;
    let parsed = parser.parse_rib(router, text)?;

    let mut counts: BTreeMap<Protocol, usize> = BTreeMap::new();
    for route in &parsed.records {
        *counts.entry(route.protocol).or_default() += 1;
    }
    tracing::debug!(
        "Parsed {} routes from {} ({}): {:?}",
        parsed.records.len(),
        router,
        vendor,
        counts
    );
    if !parsed.warnings.is_empty() {
        tracing::warn!(
            "{} RIB lines from {} ({}) were not recognized",
            parsed.warnings.len(),
            router,
            vendor
        );
    }

    Ok(parsed)
}

/// Accumulates records and warnings for one parse and applies the shared
/// failure rule: empty input or nothing recognized is an error.
pub(crate) struct ParseOutput<T> {
    vendor: VendorTag,
    router: RouterIdentity,
    records: Vec<T>,
    warnings: Vec<ParseWarning>,
}

impl<T> ParseOutput<T> {
    pub(crate) fn new(vendor: VendorTag, router: RouterIdentity) -> Self {
        ParseOutput {
            vendor,
            router,
            records: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, record: T) {
        self.records.push(record);
    }

    pub(crate) fn warn(&mut self, line: usize, text: &str, reason: impl Into<String>) {
        self.warnings.push(ParseWarning {
            line,
            text: text.to_string(),
            reason: reason.into(),
        });
    }

    pub(crate) fn finish(self, what: &str) -> AppResult<Parsed<T>> {
        if self.records.is_empty() {
            let reason = if self.warnings.is_empty() {
                format!("no {} found in input", what)
            } else {
                format!(
                    "no {} recognized, {} lines skipped",
                    what,
                    self.warnings.len()
                )
            };
            return Err(AppError::parse(self.vendor, self.router, reason));
        }
        Ok(Parsed {
            records: self.records,
            warnings: self.warnings,
        })
    }
}

/// Reject input that has no content at all.
pub(crate) fn ensure_not_empty(vendor: VendorTag, router: RouterIdentity, text: &str) -> AppResult<()> {
    if text.trim().is_empty() {
        return Err(AppError::parse(vendor, router, "empty input"));
    }
    Ok(())
}

/// Device prompts echoed into captured output ("r1#show ip route",
/// "<HUAWEI>display ...", "admin@r2> show route").
pub(crate) fn is_cli_prompt(line: &str) -> bool {
    let line = line.trim();
    line.contains('#')
        || (line.starts_with('<') && line.contains('>'))
        || (line.contains('@') && line.contains("> "))
}

/// Table rulers made of '=' or '-' characters.
pub(crate) fn is_ruler(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.chars().all(|c| c == '=' || c == '-' || c == ' ')
}

pub(crate) fn prefix_token(token: &str) -> Option<Ipv4Net> {
    parse_cidr(token).ok()
}

pub(crate) fn addr_token(token: &str) -> Option<Ipv4Addr> {
    parse_ipv4(token.trim_end_matches(',')).ok()
}

/// `[110/20]` -> (110, 20)
pub(crate) fn distance_metric(token: &str) -> Option<(u32, u32)> {
    let inner = token.strip_prefix('[')?.strip_suffix(']')?;
    let (ad, metric) = inner.split_once('/')?;
    Some((ad.parse().ok()?, metric.parse().ok()?))
}

/// Route ages as printed by IOS and EOS: 00:01:02, 1d02h, 2w3d, 5y2w.
pub(crate) fn looks_like_age(token: &str) -> bool {
    let token = token.trim();
    !token.is_empty()
        && token.chars().next().is_some_and(|c| c.is_ascii_digit())
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ':' | 'd' | 'h' | 'w' | 'm' | 'y' | 's'))
}

/// Next hop, interface and distance/metric taken from the part of a route
/// line that follows the prefix.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct RouteTail {
    pub distance_metric: Option<(u32, u32)>,
    pub next_hop: Option<Ipv4Addr>,
    pub interface: Option<String>,
}

/// Parse the IOS/EOS style route tail:
/// `is directly connected, Gi0/0`, `[110/2] via 10.0.12.2, 00:01:02, Gi0/0`,
/// `via 10.0.13.3, Ethernet2` or `is a summary, 00:10:00, Null0`.
pub(crate) fn parse_via_tail(tail: &str) -> Option<RouteTail> {
    let tail = tail.trim();
    let mut out = RouteTail::default();

    if tail.starts_with("is directly connected") || tail.starts_with("is a summary") {
        out.interface = tail
            .split(',')
            .skip(1)
            .map(str::trim)
            .filter(|piece| !piece.is_empty() && !looks_like_age(piece))
            .last()
            .map(String::from);
        return Some(out);
    }

    let mut pieces = tail.split(',').map(str::trim);
    let head = pieces.next()?;
    let mut tokens = head.split_whitespace();
    let mut token = tokens.next()?;

    if token.starts_with('[') {
        out.distance_metric = Some(distance_metric(token)?);
        token = tokens.next()?;
    }
    if token != "via" {
        return None;
    }
    out.next_hop = Some(addr_token(tokens.next()?)?);

    out.interface = pieces
        .filter(|piece| !piece.is_empty() && !looks_like_age(piece))
        .last()
        .map(String::from);

    Some(out)
}

impl RouteTail {
    pub(crate) fn apply(self, entry: &mut RouteEntry) {
        if let Some((ad, metric)) = self.distance_metric {
            entry.admin_distance = Some(ad);
            entry.metric = Some(metric);
        }
        entry.next_hop = self.next_hop;
        entry.interface = self.interface;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_metric() {
        assert_eq!(distance_metric("[110/20]"), Some((110, 20)));
        assert_eq!(distance_metric("[1/0]"), Some((1, 0)));
        assert_eq!(distance_metric("110/20"), None);
        assert_eq!(distance_metric("[x/1]"), None);
    }

    #[test]
    fn test_looks_like_age() {
        assert!(looks_like_age("00:01:02"));
        assert!(looks_like_age("1d02h"));
        assert!(looks_like_age("2w3d"));
        assert!(!looks_like_age("GigabitEthernet0/0"));
        assert!(!looks_like_age("Null0"));
    }

    #[test]
    fn test_parse_via_tail() {
        let tail = parse_via_tail("[110/2] via 10.0.12.2, 00:01:02, GigabitEthernet0/0").unwrap();
        assert_eq!(tail.distance_metric, Some((110, 2)));
        assert_eq!(tail.next_hop, Some(Ipv4Addr::new(10, 0, 12, 2)));
        assert_eq!(tail.interface.as_deref(), Some("GigabitEthernet0/0"));

        let tail = parse_via_tail("is directly connected, Ethernet1").unwrap();
        assert_eq!(tail.next_hop, None);
        assert_eq!(tail.interface.as_deref(), Some("Ethernet1"));

        let tail = parse_via_tail("[20/0] via 10.0.12.2, 00:00:10").unwrap();
        assert_eq!(tail.interface, None);

        let tail = parse_via_tail("via 10.0.13.3, Ethernet2").unwrap();
        assert_eq!(tail.distance_metric, None);
        assert_eq!(tail.next_hop, Some(Ipv4Addr::new(10, 0, 13, 3)));

        assert!(parse_via_tail("something else entirely").is_none());
    }

    #[test]
    fn test_cli_prompt() {
        assert!(is_cli_prompt("r1#show ip route"));
        assert!(is_cli_prompt("<HUAWEI>display ip routing-table"));
        assert!(is_cli_prompt("admin@r2> show route"));
        assert!(!is_cli_prompt("                    > to 10.0.12.1 via ge-0/0/0.0"));
    }

    #[test]
    fn test_unknown_vendor_has_no_parser() {
        let router = RouterIdentity::new(Ipv4Addr::new(10, 255, 0, 1));
        let err = parse_rib(VendorTag::Unknown, router, "C 10.0.0.0/24 is directly connected, Gi0/0")
            .unwrap_err();
        assert!(matches!(err, AppError::Parse { vendor: VendorTag::Unknown, .. }));
    }

    #[test]
    fn test_every_known_vendor_has_a_parser() {
        for vendor in VendorTag::ALL {
            assert_eq!(parser_for(vendor).is_some(), vendor != VendorTag::Unknown);
            if let Some(parser) = parser_for(vendor) {
                assert_eq!(parser.vendor(), vendor);
            }
        }
    }
}
