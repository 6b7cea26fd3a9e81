// Router identity: the loopback address, or the management address when no
// loopback is known

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouterIdentity(Ipv4Addr);

impl RouterIdentity {
    pub fn new(addr: Ipv4Addr) -> Self {
        RouterIdentity(addr)
    }

    /// Prefer the loopback address, fall back to the management address.
    pub fn resolve(loopback: Option<Ipv4Addr>, management: Ipv4Addr) -> Self {
        RouterIdentity(loopback.unwrap_or(management))
    }

    pub fn addr(&self) -> Ipv4Addr {
        self.0
    }
}

impl From<Ipv4Addr> for RouterIdentity {
    fn from(addr: Ipv4Addr) -> Self {
        RouterIdentity(addr)
    }
}

impl fmt::Display for RouterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
