// Device ingestion: one captured device (banner, RIB text, interface text)
// turned into records keyed by the router's resolved identity

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use crate::error::{AppError, AppResult};
use crate::identity::RouterIdentity;
use crate::interfaces::{loopback_address, loopback_from_routes, parse_interfaces, InterfaceRecord};
use crate::routes::parser::{parse_rib, ParseWarning};
use crate::routes::RouteEntry;
use crate::vendor::{detect_vendor, VendorTag};

/// Raw text collected from one device by the session layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCapture {
    pub name: String,
    pub management_ip: Ipv4Addr,
    /// Overrides detection when set
    pub vendor: Option<VendorTag>,
    /// Login banner, `show version` or NETCONF capability reply
    pub banner: Option<String>,
    pub rib: String,
    pub interfaces: Option<String>,
}

/// Everything parsed from one device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecords {
    pub identity: RouterIdentity,
    pub hostname: String,
    pub vendor: VendorTag,
    pub management_ip: Ipv4Addr,
    pub loopback: Option<Ipv4Addr>,
    pub routes: Vec<RouteEntry>,
    pub interfaces: Vec<InterfaceRecord>,
    pub warnings: Vec<ParseWarning>,
}

impl DeviceRecords {
    /// Every address this router is known by.
    pub fn aliases(&self) -> BTreeSet<Ipv4Addr> {
        let mut aliases: BTreeSet<Ipv4Addr> = self.interfaces.iter().map(|i| i.ip).collect();
        aliases.insert(self.identity.addr());
        aliases.insert(self.management_ip);
        aliases.extend(self.loopback);
        aliases
    }
}

fn vendor_of(capture: &DeviceCapture) -> VendorTag {
    if let Some(vendor) = capture.vendor {
        return vendor;
    }
    let detected = capture
        .banner
        .as_deref()
        .map(detect_vendor)
        .unwrap_or(VendorTag::Unknown);
    if detected != VendorTag::Unknown {
        return detected;
    }
    // Captures without a banner often still carry a vendor string in the
    // echoed prompt or table headers
    detect_vendor(&capture.rib)
}

/// Parse one device capture. Records are first keyed by the management
/// address, then re-keyed once the loopback is known.
pub fn ingest(capture: &DeviceCapture) -> AppResult<DeviceRecords> {
    let vendor = vendor_of(capture);
    let provisional = RouterIdentity::new(capture.management_ip);
    if vendor == VendorTag::Unknown {
        return Err(AppError::parse(
            vendor,
            provisional,
            format!("could not detect the vendor of {}", capture.name),
        ));
    }

    let rib = parse_rib(vendor, provisional, &capture.rib)?;
    let mut warnings = rib.warnings;
    let mut routes = rib.records;

    let mut interfaces = match capture.interfaces.as_deref() {
        Some(text) => {
            let parsed = parse_interfaces(vendor, provisional, text)?;
            warnings.extend(parsed.warnings);
            parsed.records
        }
        None => Vec::new(),
    };

    let loopback = loopback_address(&interfaces).or_else(|| loopback_from_routes(&routes));
    let identity = RouterIdentity::resolve(loopback, capture.management_ip);
    for route in &mut routes {
        route.router = identity;
    }
    for iface in &mut interfaces {
        iface.router = identity;
    }

    tracing::info!(
        "Ingested {} ({}) as {}: {} routes, {} interfaces, {} warnings",
        capture.name,
        vendor,
        identity,
        routes.len(),
        interfaces.len(),
        warnings.len()
    );

    Ok(DeviceRecords {
        identity,
        hostname: capture.name.clone(),
        vendor,
        management_ip: capture.management_ip,
        loopback,
        routes,
        interfaces,
        warnings,
    })
}
