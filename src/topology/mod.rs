// Topology module - router adjacency graph built from interface subnets and
// explicit direct-connection tables

pub mod path;

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::identity::RouterIdentity;
use crate::interfaces::InterfaceRecord;

pub use path::{find_all_paths, find_alternate_paths, find_primary_path, Path, PathHop, PathResult, PathRole};

/// Weight of a link inferred from a shared subnet.
pub const DEFAULT_LINK_WEIGHT: u32 = 1;

/// Undirected link between two routers, stored with `a <= b`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkRecord {
    pub a: RouterIdentity,
    pub a_iface: String,
    pub b: RouterIdentity,
    pub b_iface: String,
    pub weight: u32,
}

impl LinkRecord {
    pub fn new(
        a: RouterIdentity,
        a_iface: impl Into<String>,
        b: RouterIdentity,
        b_iface: impl Into<String>,
        weight: u32,
    ) -> Self {
        LinkRecord {
            a,
            a_iface: a_iface.into(),
            b,
            b_iface: b_iface.into(),
            weight,
        }
        .canonical()
    }

    /// Swap the ends so that `a <= b`.
    pub fn canonical(self) -> Self {
        if self.a <= self.b {
            return self;
        }
        LinkRecord {
            a: self.b,
            a_iface: self.b_iface,
            b: self.a,
            b_iface: self.a_iface,
            weight: self.weight,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.a == self.b
    }

    /// Same endpoints and interfaces, weight ignored.
    pub fn same_attachment(&self, other: &LinkRecord) -> bool {
        self.a == other.a
            && self.b == other.b
            && self.a_iface == other.a_iface
            && self.b_iface == other.b_iface
    }

    /// The end opposite `router`, if the link touches it.
    pub fn other(&self, router: RouterIdentity) -> Option<RouterIdentity> {
        if self.a == router {
            Some(self.b)
        } else if self.b == router {
            Some(self.a)
        } else {
            None
        }
    }

    /// Interface name used by `router` on this link.
    pub fn interface_of(&self, router: RouterIdentity) -> Option<&str> {
        if self.a == router {
            Some(&self.a_iface)
        } else if self.b == router {
            Some(&self.b_iface)
        } else {
            None
        }
    }
}

/// Undirected multigraph of routers. Parallel links are kept, self-loops are
/// not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TopologyGraph {
    nodes: BTreeSet<RouterIdentity>,
    edges: Vec<LinkRecord>,
    #[serde(skip)]
    adjacency: BTreeMap<RouterIdentity, Vec<usize>>,
}

impl TopologyGraph {
    pub fn new(
        nodes: impl IntoIterator<Item = RouterIdentity>,
        edges: impl IntoIterator<Item = LinkRecord>,
    ) -> Self {
        let mut nodes: BTreeSet<RouterIdentity> = nodes.into_iter().collect();
        let mut edges: Vec<LinkRecord> = edges
            .into_iter()
            .map(LinkRecord::canonical)
            .filter(|link| !link.is_self_loop())
            .collect();
        edges.sort();
        edges.dedup();

        let mut adjacency: BTreeMap<RouterIdentity, Vec<usize>> = BTreeMap::new();
        for (idx, link) in edges.iter().enumerate() {
            nodes.insert(link.a);
            nodes.insert(link.b);
            adjacency.entry(link.a).or_default().push(idx);
            adjacency.entry(link.b).or_default().push(idx);
        }

        TopologyGraph {
            nodes,
            edges,
            adjacency,
        }
    }

    pub fn nodes(&self) -> &BTreeSet<RouterIdentity> {
        &self.nodes
    }

    pub fn edges(&self) -> &[LinkRecord] {
        &self.edges
    }

    /// Add a router without links.
    pub fn add_node(&mut self, router: RouterIdentity) {
        self.nodes.insert(router);
    }

    pub fn contains(&self, router: RouterIdentity) -> bool {
        self.nodes.contains(&router)
    }

    /// Links touching `router` paired with the router on the other end,
    /// in edge order.
    pub fn neighbors(&self, router: RouterIdentity) -> impl Iterator<Item = (RouterIdentity, &LinkRecord)> {
        self.adjacency
            .get(&router)
            .into_iter()
            .flatten()
            .filter_map(move |&idx| {
                let link = &self.edges[idx];
                link.other(router).map(|peer| (peer, link))
            })
    }
}

/// Builds the graph from interface records and explicit links.
#[derive(Debug, Clone, Copy)]
pub struct TopologyBuilder {
    default_weight: u32,
}

impl Default for TopologyBuilder {
    fn default() -> Self {
        TopologyBuilder {
            default_weight: DEFAULT_LINK_WEIGHT,
        }
    }
}

impl TopologyBuilder {
    pub fn with_default_weight(default_weight: u32) -> Self {
        TopologyBuilder { default_weight }
    }

    pub fn default_weight(&self) -> u32 {
        self.default_weight
    }

    /// Links inferred from shared subnets: one per router pair per subnet,
    /// using each router's lowest interface name on the segment. Down
    /// interfaces and host prefixes do not form links.
    pub fn infer_links(&self, interfaces: &[InterfaceRecord]) -> Vec<LinkRecord> {
        let mut segments: BTreeMap<Ipv4Net, BTreeMap<RouterIdentity, &str>> = BTreeMap::new();
        for iface in interfaces.iter().filter(|i| i.is_up() && i.mask < 32) {
            let attached = segments.entry(iface.subnet()).or_default();
            attached
                .entry(iface.router)
                .and_modify(|name| {
                    if iface.name.as_str() < *name {
                        *name = iface.name.as_str();
                    }
                })
                .or_insert(iface.name.as_str());
        }

        let mut links = Vec::new();
        for (subnet, attached) in &segments {
            let members: Vec<(&RouterIdentity, &&str)> = attached.iter().collect();
            if members.len() > 2 {
                tracing::debug!("Shared segment {} has {} routers", subnet, members.len());
            }
            for (i, (a, a_iface)) in members.iter().enumerate() {
                for (b, b_iface) in &members[i + 1..] {
                    links.push(LinkRecord::new(**a, **a_iface, **b, **b_iface, self.default_weight));
                }
            }
        }
        links
    }

    pub fn build(&self, interfaces: &[InterfaceRecord], explicit: &[LinkRecord]) -> TopologyGraph {
        let mut links = self.infer_links(interfaces);
        let inferred = links.len();

        for link in explicit.iter().cloned().map(LinkRecord::canonical) {
            if link.is_self_loop() {
                tracing::warn!("Dropping self-loop link on {} ({} <-> {})", link.a, link.a_iface, link.b_iface);
                continue;
            }
            match links.iter_mut().find(|l| l.same_attachment(&link)) {
                Some(existing) => existing.weight = link.weight,
                None => links.push(link),
            }
        }

        let graph = TopologyGraph::new(interfaces.iter().map(|i| i.router), links);
        tracing::info!(
            "Built topology: {} routers, {} links ({} inferred, {} explicit)",
            graph.nodes().len(),
            graph.edges().len(),
            inferred,
            explicit.len()
        );
        graph
    }
}

/// Build the topology with the default link weight.
pub fn build_topology(interfaces: &[InterfaceRecord], explicit_links: &[LinkRecord]) -> TopologyGraph {
    TopologyBuilder::default().build(interfaces, explicit_links)
}
