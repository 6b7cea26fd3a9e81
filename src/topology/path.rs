// Path computation over the topology graph
//
// Primary path: uniform-cost search with a BTreeMap candidate list keyed by
// (cost, hops, router sequence). The first time the destination leaves the
// list it carries the cheapest path, ties broken by hop count and then by
// the lower router at the first diverging hop.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;

use super::{LinkRecord, TopologyGraph};
use crate::error::{AppError, AppResult};
use crate::identity::RouterIdentity;
use crate::interfaces::InterfaceRecord;
use crate::routes::lookup::RouteEngine;
use crate::routes::{Protocol, RouteEntry, DEFAULT_VRF};

/// Hop limit for path enumeration when none is configured.
pub const DEFAULT_MAX_HOPS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathRole {
    Primary,
    Alternate,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub hops: Vec<RouterIdentity>,
    pub links: Vec<LinkRecord>,
    pub cost: u64,
    pub role: PathRole,
}

/// One router along a path, with the interfaces the path uses on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathHop {
    pub router: RouterIdentity,
    pub entry_interface: Option<String>,
    pub entry_ip: Option<Ipv4Addr>,
    pub exit_interface: Option<String>,
    pub exit_ip: Option<Ipv4Addr>,
    /// How this router reaches the next hop: a routing protocol, or
    /// "directly connected". `None` on the last router.
    pub connection: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "path", rename_all = "snake_case")]
pub enum PathResult {
    Found(Path),
    NoPath,
}

impl PathResult {
    pub fn path(&self) -> Option<&Path> {
        match self {
            PathResult::Found(path) => Some(path),
            PathResult::NoPath => None,
        }
    }
}

impl Path {
    fn trivial(router: RouterIdentity, role: PathRole) -> Self {
        Path {
            hops: vec![router],
            links: Vec::new(),
            cost: 0,
            role,
        }
    }

    pub fn source(&self) -> Option<RouterIdentity> {
        self.hops.first().copied()
    }

    pub fn destination(&self) -> Option<RouterIdentity> {
        self.hops.last().copied()
    }

    /// Number of links traversed.
    pub fn hop_count(&self) -> usize {
        self.links.len()
    }

    fn sort_key(&self) -> (u64, usize, &[RouterIdentity], &[LinkRecord]) {
        (self.cost, self.hops.len(), &self.hops, &self.links)
    }

    /// Per-router description of the path. Interface addresses come from
    /// `interfaces`, the connection protocol from the RIB in `routes`.
    pub fn describe(&self, routes: &[RouteEntry], interfaces: &[InterfaceRecord]) -> Vec<PathHop> {
        let Some(destination) = self.destination() else {
            return Vec::new();
        };
        let address_of = |router: RouterIdentity, name: Option<&str>| -> Option<Ipv4Addr> {
            let name = name?;
            interfaces
                .iter()
                .find(|i| i.router == router && i.name == name)
                .map(|i| i.ip)
        };

        self.hops
            .iter()
            .enumerate()
            .map(|(idx, &router)| {
                let entry_link = idx.checked_sub(1).and_then(|i| self.links.get(i));
                let exit_link = self.links.get(idx);
                let entry_interface = entry_link.and_then(|l| l.interface_of(router));
                let exit_interface = exit_link.and_then(|l| l.interface_of(router));

                let connection = exit_link.map(|link| {
                    let next = link.other(router).unwrap_or(router);
                    let next_ip = address_of(next, link.interface_of(next));
                    let own_ip = address_of(router, exit_interface);
                    connection_protocol(routes, destination, (router, own_ip), (next, next_ip))
                });

                PathHop {
                    router,
                    entry_interface: entry_interface.map(String::from),
                    entry_ip: address_of(router, entry_interface),
                    exit_interface: exit_interface.map(String::from),
                    exit_ip: address_of(router, exit_interface),
                    connection,
                }
            })
            .collect()
    }
}

/// Protocol `router` uses towards `next`: the route it would forward the
/// destination's loopback on, else any learned route between the two routers
/// in either direction. Falls back to "directly connected".
fn connection_protocol(
    routes: &[RouteEntry],
    destination: RouterIdentity,
    (router, own_ip): (RouterIdentity, Option<Ipv4Addr>),
    (next, next_ip): (RouterIdentity, Option<Ipv4Addr>),
) -> String {
    let forwarding = next_ip.and_then(|via| {
        RouteEngine::for_router(routes, router, DEFAULT_VRF)
            .lookup(destination.addr())
            .into_iter()
            .find(|r| r.next_hop == Some(via) && r.protocol != Protocol::Connected)
            .map(|r| r.protocol)
    });
    let learned = |from: RouterIdentity, via: Option<Ipv4Addr>| {
        let via = via?;
        routes
            .iter()
            .find(|r| r.router == from && r.next_hop == Some(via) && r.protocol != Protocol::Connected)
            .map(|r| r.protocol)
    };
    forwarding
        .or_else(|| learned(router, next_ip))
        .or_else(|| learned(next, own_ip))
        .map(|p| p.to_string())
        .unwrap_or_else(|| "directly connected".to_string())
}

fn ensure_known(graph: &TopologyGraph, router: RouterIdentity) -> AppResult<()> {
    if graph.contains(router) {
        Ok(())
    } else {
        Err(AppError::NotFound(router.to_string()))
    }
}

/// Cheapest path from `src` to `dst`. Unknown endpoints are an error, a
/// disconnected pair is `PathResult::NoPath`.
pub fn find_primary_path(
    graph: &TopologyGraph,
    src: RouterIdentity,
    dst: RouterIdentity,
) -> AppResult<PathResult> {
    ensure_known(graph, src)?;
    ensure_known(graph, dst)?;

    if src == dst {
        return Ok(PathResult::Found(Path::trivial(src, PathRole::Primary)));
    }

    let mut settled: BTreeSet<RouterIdentity> = BTreeSet::new();
    let mut cand_list: BTreeMap<(u64, usize, Vec<RouterIdentity>), Vec<LinkRecord>> = BTreeMap::new();
    cand_list.insert((0, 0, vec![src]), Vec::new());

    while let Some(((cost, hops, nodes), links)) = cand_list.pop_first() {
        let Some(&node) = nodes.last() else {
            continue;
        };
        if !settled.insert(node) {
            continue;
        }

        if node == dst {
            tracing::debug!("Primary path {} -> {}: cost {}, {} hops", src, dst, cost, hops);
            return Ok(PathResult::Found(Path {
                hops: nodes,
                links,
                cost,
                role: PathRole::Primary,
            }));
        }

        for (peer, link) in graph.neighbors(node) {
            if settled.contains(&peer) {
                continue;
            }
            let mut next_nodes = nodes.clone();
            next_nodes.push(peer);
            let key = (cost + u64::from(link.weight), hops + 1, next_nodes);
            // Parallel links of equal weight: the first in edge order wins
            cand_list.entry(key).or_insert_with(|| {
                let mut next_links = links.clone();
                next_links.push(link.clone());
                next_links
            });
        }
    }

    tracing::debug!("No path between {} and {}", src, dst);
    Ok(PathResult::NoPath)
}

/// Every simple path from `src` to `dst` with at most `max_hops` links.
/// Parallel links give distinct paths. Sorted by cost, hop count, then
/// router sequence.
pub fn find_all_paths(
    graph: &TopologyGraph,
    src: RouterIdentity,
    dst: RouterIdentity,
    max_hops: usize,
) -> AppResult<Vec<Path>> {
    ensure_known(graph, src)?;
    ensure_known(graph, dst)?;

    if src == dst {
        return Ok(vec![Path::trivial(src, PathRole::All)]);
    }

    let mut found = Vec::new();
    let mut nodes = vec![src];
    let mut links = Vec::new();
    walk(graph, dst, max_hops, &mut nodes, &mut links, &mut found);

    found.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    tracing::debug!(
        "Found {} paths {} -> {} within {} hops",
        found.len(),
        src,
        dst,
        max_hops
    );
    Ok(found)
}

fn walk(
    graph: &TopologyGraph,
    dst: RouterIdentity,
    max_hops: usize,
    nodes: &mut Vec<RouterIdentity>,
    links: &mut Vec<LinkRecord>,
    found: &mut Vec<Path>,
) {
    let Some(&node) = nodes.last() else {
        return;
    };
    if node == dst {
        found.push(Path {
            hops: nodes.clone(),
            links: links.clone(),
            cost: links.iter().map(|l| u64::from(l.weight)).sum(),
            role: PathRole::All,
        });
        return;
    }
    if links.len() >= max_hops {
        return;
    }

    for (peer, link) in graph.neighbors(node) {
        if nodes.contains(&peer) {
            continue;
        }
        nodes.push(peer);
        links.push(link.clone());
        walk(graph, dst, max_hops, nodes, links, found);
        nodes.pop();
        links.pop();
    }
}

/// Paths whose router sequence differs from the primary path, cheapest first.
/// One path per router sequence: parallel-link variants of the same sequence
/// collapse into the cheapest, so use `find_all_paths` to see every link.
pub fn find_alternate_paths(
    graph: &TopologyGraph,
    src: RouterIdentity,
    dst: RouterIdentity,
    max_hops: usize,
) -> AppResult<Vec<Path>> {
    let primary = match find_primary_path(graph, src, dst)? {
        PathResult::Found(path) => path,
        PathResult::NoPath => return Ok(Vec::new()),
    };

    let mut seen: BTreeSet<Vec<RouterIdentity>> = BTreeSet::new();
    let alternates = find_all_paths(graph, src, dst, max_hops)?
        .into_iter()
        .filter(|path| path.hops != primary.hops)
        // Parallel links repeat a router sequence; keep the cheapest one
        .filter(|path| seen.insert(path.hops.clone()))
        .map(|path| Path {
            role: PathRole::Alternate,
            ..path
        })
        .collect();
    Ok(alternates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::build_topology;

    fn rid(n: u8) -> RouterIdentity {
        RouterIdentity::new(Ipv4Addr::new(10, 255, 0, n))
    }

    fn link(a: u8, b: u8, weight: u32) -> LinkRecord {
        LinkRecord::new(rid(a), format!("to-r{}", b), rid(b), format!("to-r{}", a), weight)
    }

    fn graph(links: &[LinkRecord]) -> TopologyGraph {
        build_topology(&[], links)
    }

    /// A - B - C - D plus a detour A - E - D
    fn chain_with_detour(detour_weight: u32) -> TopologyGraph {
        graph(&[
            link(1, 2, 1),
            link(2, 3, 1),
            link(3, 4, 1),
            link(1, 5, detour_weight),
            link(5, 4, detour_weight),
        ])
    }

    #[test]
    fn test_same_router_is_zero_path() {
        let g = graph(&[link(1, 2, 1)]);
        let result = find_primary_path(&g, rid(1), rid(1)).unwrap();
        let path = result.path().unwrap();
        assert_eq!(path.hops, vec![rid(1)]);
        assert_eq!(path.cost, 0);
        assert_eq!(path.hop_count(), 0);

        let all = find_all_paths(&g, rid(2), rid(2), 4).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].cost, 0);
    }

    #[test]
    fn test_chain_cost() {
        let g = graph(&[link(1, 2, 1), link(2, 3, 1), link(3, 4, 1)]);
        let result = find_primary_path(&g, rid(1), rid(4)).unwrap();
        let path = result.path().unwrap();
        assert_eq!(path.hops, vec![rid(1), rid(2), rid(3), rid(4)]);
        assert_eq!(path.cost, 3);
        assert_eq!(path.role, PathRole::Primary);
    }

    #[test]
    fn test_weights_beat_hop_count() {
        let g = chain_with_detour(5);
        let path = find_primary_path(&g, rid(1), rid(4)).unwrap();
        assert_eq!(path.path().unwrap().hops.len(), 4);

        let g = chain_with_detour(1);
        let path = find_primary_path(&g, rid(1), rid(4)).unwrap();
        assert_eq!(path.path().unwrap().hops, vec![rid(1), rid(5), rid(4)]);
    }

    #[test]
    fn test_equal_cost_tie_breaks() {
        // 1-2-4 and 1-3-4, both cost 2 and 2 hops: lower router at the fork wins
        let g = graph(&[link(1, 3, 1), link(3, 4, 1), link(1, 2, 1), link(2, 4, 1)]);
        let path = find_primary_path(&g, rid(1), rid(4)).unwrap();
        assert_eq!(path.path().unwrap().hops, vec![rid(1), rid(2), rid(4)]);

        // equal cost, fewer hops wins
        let g = graph(&[link(1, 2, 1), link(2, 3, 1), link(3, 4, 1), link(1, 4, 3)]);
        let path = find_primary_path(&g, rid(1), rid(4)).unwrap();
        assert_eq!(path.path().unwrap().hops, vec![rid(1), rid(4)]);
    }

    #[test]
    fn test_disjoint_components() {
        let g = graph(&[link(1, 2, 1), link(3, 4, 1)]);
        assert_eq!(find_primary_path(&g, rid(1), rid(4)).unwrap(), PathResult::NoPath);
        assert!(find_all_paths(&g, rid(1), rid(4), 8).unwrap().is_empty());
        assert!(find_alternate_paths(&g, rid(1), rid(4), 8).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_router() {
        let g = graph(&[link(1, 2, 1)]);
        let err = find_primary_path(&g, rid(1), rid(9)).unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref r) if r == "10.255.0.9"));
        assert!(find_all_paths(&g, rid(9), rid(1), 8).is_err());
    }

    #[test]
    fn test_all_paths_ordered() {
        let g = chain_with_detour(1);
        let all = find_all_paths(&g, rid(1), rid(4), 8).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].hops, vec![rid(1), rid(5), rid(4)]);
        assert_eq!(all[1].cost, 3);
        assert!(all.iter().all(|p| p.role == PathRole::All));

        // the long way round no longer fits
        let short = find_all_paths(&g, rid(1), rid(4), 2).unwrap();
        assert_eq!(short.len(), 1);
    }

    #[test]
    fn test_parallel_links_are_distinct_paths() {
        let g = graph(&[
            LinkRecord::new(rid(1), "Gi0/0", rid(2), "Ethernet1", 1),
            LinkRecord::new(rid(1), "Gi0/1", rid(2), "Ethernet2", 2),
        ]);
        let all = find_all_paths(&g, rid(1), rid(2), 4).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].links[0].a_iface, "Gi0/0");

        let primary = find_primary_path(&g, rid(1), rid(2)).unwrap();
        assert_eq!(primary.path().unwrap().cost, 1);
        // same router sequence as the primary
        assert!(find_alternate_paths(&g, rid(1), rid(2), 4).unwrap().is_empty());
    }

    #[test]
    fn test_alternate_keeps_cheapest_parallel_variant() {
        let g = graph(&[
            link(1, 2, 1),
            LinkRecord::new(rid(1), "Gi0/1", rid(3), "Ethernet1", 4),
            LinkRecord::new(rid(1), "Gi0/2", rid(3), "Ethernet2", 3),
            link(3, 2, 1),
        ]);
        assert_eq!(find_all_paths(&g, rid(1), rid(2), 4).unwrap().len(), 3);

        let alternates = find_alternate_paths(&g, rid(1), rid(2), 4).unwrap();
        assert_eq!(alternates.len(), 1);
        assert_eq!(alternates[0].hops, vec![rid(1), rid(3), rid(2)]);
        assert_eq!(alternates[0].cost, 4);
        assert_eq!(alternates[0].links[0].a_iface, "Gi0/2");
    }

    #[test]
    fn test_alternates_exclude_primary() {
        let g = chain_with_detour(5);
        let primary = find_primary_path(&g, rid(1), rid(4)).unwrap();
        let primary = primary.path().unwrap();
        let alternates = find_alternate_paths(&g, rid(1), rid(4), 8).unwrap();
        assert_eq!(alternates.len(), 1);
        assert!(alternates.iter().all(|p| p.hops != primary.hops));
        assert_eq!(alternates[0].hops, vec![rid(1), rid(5), rid(4)]);
        assert_eq!(alternates[0].role, PathRole::Alternate);
        assert_eq!(alternates[0].cost, 10);
    }

    #[test]
    fn test_describe_hops() {
        let r1 = rid(1);
        let r2 = rid(2);
        let interfaces = vec![
            InterfaceRecord::new(r1, "Gi0/0", Ipv4Addr::new(10, 0, 12, 1), 24),
            InterfaceRecord::new(r2, "Ethernet1", Ipv4Addr::new(10, 0, 12, 2), 24),
            InterfaceRecord::new(r2, "Ethernet2", Ipv4Addr::new(10, 0, 23, 2), 24),
            InterfaceRecord::new(rid(3), "ge-0/0/0.0", Ipv4Addr::new(10, 0, 23, 3), 24),
        ];
        let mut ospf = RouteEntry::new(
            r1,
            "10.0.23.0/24".parse().unwrap(),
            Protocol::Ospf,
            "O 10.0.23.0/24 [110/2] via 10.0.12.2",
        );
        ospf.next_hop = Some(Ipv4Addr::new(10, 0, 12, 2));

        let g = build_topology(&interfaces, &[]);
        let result = find_primary_path(&g, r1, rid(3)).unwrap();
        let hops = result.path().unwrap().describe(&[ospf], &interfaces);
        assert_eq!(hops.len(), 3);

        assert_eq!(hops[0].entry_interface, None);
        assert_eq!(hops[0].exit_interface.as_deref(), Some("Gi0/0"));
        assert_eq!(hops[0].exit_ip, Some(Ipv4Addr::new(10, 0, 12, 1)));
        assert_eq!(hops[0].connection.as_deref(), Some("ospf"));

        assert_eq!(hops[1].entry_interface.as_deref(), Some("Ethernet1"));
        assert_eq!(hops[1].exit_interface.as_deref(), Some("Ethernet2"));
        assert_eq!(hops[1].connection.as_deref(), Some("directly connected"));

        assert_eq!(hops[2].entry_ip, Some(Ipv4Addr::new(10, 0, 23, 3)));
        assert_eq!(hops[2].connection, None);
    }

    #[test]
    fn test_describe_prefers_forwarding_route() {
        let r1 = rid(1);
        let r2 = rid(2);
        let interfaces = vec![
            InterfaceRecord::new(r1, "Gi0/0", Ipv4Addr::new(10, 0, 12, 1), 24),
            InterfaceRecord::new(r2, "Ethernet1", Ipv4Addr::new(10, 0, 12, 2), 24),
        ];
        let mut bgp = RouteEntry::new(r1, "172.16.0.0/16".parse().unwrap(), Protocol::Bgp, "B 172.16.0.0/16");
        bgp.next_hop = Some(Ipv4Addr::new(10, 0, 12, 2));
        let mut default = RouteEntry::new(r1, "0.0.0.0/0".parse().unwrap(), Protocol::Static, "S* 0.0.0.0/0");
        default.next_hop = Some(Ipv4Addr::new(10, 0, 12, 2));

        let g = build_topology(&interfaces, &[]);
        let result = find_primary_path(&g, r1, r2).unwrap();
        let hops = result.path().unwrap().describe(&[bgp, default], &interfaces);
        assert_eq!(hops[0].connection.as_deref(), Some("static"));
    }
}
