// Route lookup engine with longest prefix matching over a normalized RIB

use super::RouteEntry;
use crate::identity::RouterIdentity;
use std::cmp::Reverse;
use std::net::Ipv4Addr;

/// Higher is better: longest prefix, then lowest distance, then lowest metric.
fn rank(route: &RouteEntry) -> (u8, Reverse<u32>, Reverse<u32>) {
    (
        route.prefix.prefix_len(),
        Reverse(route.admin_distance.unwrap_or(0)),
        Reverse(route.metric.unwrap_or(0)),
    )
}

pub struct RouteEngine<'a> {
    routes: Vec<&'a RouteEntry>,
}

impl<'a> RouteEngine<'a> {
    /// Build an engine over the routes of one VRF.
    pub fn new(routes: &'a [RouteEntry], vrf: &str) -> Self {
        RouteEngine {
            routes: routes.iter().filter(|r| r.vrf == vrf).collect(),
        }
    }

    /// Same, restricted to one router's entries of a shared table.
    pub fn for_router(routes: &'a [RouteEntry], router: RouterIdentity, vrf: &str) -> Self {
        RouteEngine {
            routes: routes
                .iter()
                .filter(|r| r.router == router && r.vrf == vrf)
                .collect(),
        }
    }

    /// Find the best matching routes for a destination. All ECMP entries of
    /// the winning prefix are returned; between routes for the same prefix
    /// the lowest administrative distance wins, then the lowest metric
    /// (unprinted values count as 0).
    pub fn lookup(&self, dest: Ipv4Addr) -> Vec<&'a RouteEntry> {
        let Some(best) = self
            .routes
            .iter()
            .filter(|r| r.prefix.trunc().contains(&dest))
            .map(|r| rank(r))
            .max()
        else {
            return Vec::new();
        };

        self.routes
            .iter()
            .filter(|r| r.prefix.trunc().contains(&dest) && rank(r) == best)
            .copied()
            .collect()
    }
}
