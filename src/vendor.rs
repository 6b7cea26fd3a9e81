// Vendor detection from device banners and NETCONF capability lists

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VendorTag {
    Cisco,
    Juniper,
    Arista,
    Nokia,
    Huawei,
    Unknown,
}

impl VendorTag {
    pub const ALL: [VendorTag; 6] = [
        VendorTag::Cisco,
        VendorTag::Juniper,
        VendorTag::Arista,
        VendorTag::Nokia,
        VendorTag::Huawei,
        VendorTag::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VendorTag::Cisco => "cisco",
            VendorTag::Juniper => "juniper",
            VendorTag::Arista => "arista",
            VendorTag::Nokia => "nokia",
            VendorTag::Huawei => "huawei",
            VendorTag::Unknown => "unknown",
        }
    }
}

impl fmt::Display for VendorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VendorTag {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        VendorTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == lower)
            .ok_or_else(|| AppError::Config(format!("unknown vendor '{}'", s)))
    }
}

// Checked in order, first match wins. Cisco capability lists may mention other
// vendors' models, so the more specific markers come first.
static VENDOR_MARKERS: LazyLock<Vec<(VendorTag, Regex)>> = LazyLock::new(|| {
    [
        (VendorTag::Cisco, r"(?i)cisco|ios-xe|ios xr|nx-os"),
        (VendorTag::Juniper, r"(?i)juniper|junos"),
        (VendorTag::Nokia, r"(?i)nokia|alcatel|timos|\bsr os\b"),
        (VendorTag::Huawei, r"(?i)huawei|\bvrp\b"),
        (VendorTag::Arista, r"(?i)arista|\beos\b"),
    ]
    .into_iter()
    .filter_map(|(tag, pattern)| Regex::new(pattern).ok().map(|re| (tag, re)))
    .collect()
});

/// Classify a banner or capability text into a vendor tag.
pub fn detect_vendor(text: &str) -> VendorTag {
    VENDOR_MARKERS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(tag, _)| *tag)
        .unwrap_or(VendorTag::Unknown)
}
