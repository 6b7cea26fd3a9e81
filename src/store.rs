// Normalized store: routers, routes, interfaces, links and computed paths
//
// All tables sit behind one lock so that replacing a device's records is
// atomic with respect to readers. Readers work on cloned snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::device::DeviceRecords;
use crate::error::{AppError, AppResult};
use crate::identity::RouterIdentity;
use crate::interfaces::{DirectConnection, InterfaceRecord};
use crate::routes::{Protocol, RouteEntry};
use crate::topology::{LinkRecord, Path, TopologyBuilder, TopologyGraph};
use crate::vendor::VendorTag;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterRecord {
    pub identity: RouterIdentity,
    pub hostname: String,
    pub vendor: VendorTag,
    pub management_ip: Ipv4Addr,
    pub loopback: Option<Ipv4Addr>,
    pub aliases: BTreeSet<Ipv4Addr>,
    pub updated_at: DateTime<Utc>,
}

/// Last path computation for one endpoint pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRecord {
    pub source: RouterIdentity,
    pub destination: RouterIdentity,
    pub computed_at: DateTime<Utc>,
    pub primary: Option<Path>,
    #[serde(default)]
    pub alternates: Vec<Path>,
    #[serde(default)]
    pub all: Vec<Path>,
}

impl PathRecord {
    pub fn new(source: RouterIdentity, destination: RouterIdentity) -> Self {
        PathRecord {
            source,
            destination,
            computed_at: Utc::now(),
            primary: None,
            alternates: Vec::new(),
            all: Vec::new(),
        }
    }
}

/// Flat copy of every table. Also the on-disk JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub routers: Vec<RouterRecord>,
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceRecord>,
    #[serde(default)]
    pub links: Vec<LinkRecord>,
    #[serde(default)]
    pub paths: Vec<PathRecord>,
}

impl Snapshot {
    pub fn router(&self, identity: RouterIdentity) -> Option<&RouterRecord> {
        self.routers.iter().find(|r| r.identity == identity)
    }

    pub fn routes_of(&self, identity: RouterIdentity) -> Vec<RouteEntry> {
        self.routes
            .iter()
            .filter(|r| r.router == identity)
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
struct Tables {
    routers: BTreeMap<RouterIdentity, RouterRecord>,
    routes: BTreeMap<RouterIdentity, Vec<RouteEntry>>,
    interfaces: BTreeMap<RouterIdentity, Vec<InterfaceRecord>>,
    /// Explicit links, endpoints already resolved
    links: Vec<LinkRecord>,
    aliases: BTreeMap<Ipv4Addr, RouterIdentity>,
    paths: BTreeMap<(RouterIdentity, RouterIdentity), PathRecord>,
}

impl Tables {
    /// Identity keys always resolve to their own router. An address shared
    /// by several routers resolves to the lowest identity.
    fn rebuild_aliases(&mut self) {
        self.aliases.clear();
        for (identity, router) in &self.routers {
            for alias in &router.aliases {
                self.aliases.entry(*alias).or_insert(*identity);
            }
        }
        for identity in self.routers.keys() {
            self.aliases.insert(identity.addr(), *identity);
        }
    }

    fn resolve(&self, addr: Ipv4Addr) -> Option<RouterIdentity> {
        self.aliases.get(&addr).copied()
    }

    /// Point explicit link endpoints at the identity that now owns them.
    fn remap_links(&mut self) {
        let aliases = &self.aliases;
        let remap = |id: RouterIdentity| aliases.get(&id.addr()).copied().unwrap_or(id);
        let links: Vec<LinkRecord> = self
            .links
            .drain(..)
            .map(|link| LinkRecord {
                a: remap(link.a),
                b: remap(link.b),
                ..link
            })
            .map(LinkRecord::canonical)
            .filter(|link| !link.is_self_loop())
            .collect();
        self.links = links;
    }

    fn all_interfaces(&self) -> Vec<InterfaceRecord> {
        self.interfaces.values().flatten().cloned().collect()
    }

    fn graph(&self, builder: &TopologyBuilder) -> TopologyGraph {
        let mut graph = builder.build(&self.all_interfaces(), &self.links);
        for identity in self.routers.keys() {
            graph.add_node(*identity);
        }
        graph
    }
}

#[derive(Debug, Clone)]
pub struct Store {
    tables: Arc<RwLock<Tables>>,
    builder: TopologyBuilder,
}

impl Default for Store {
    fn default() -> Self {
        Store::new(TopologyBuilder::default())
    }
}

impl Store {
    pub fn new(builder: TopologyBuilder) -> Self {
        Store {
            tables: Arc::new(RwLock::new(Tables::default())),
            builder,
        }
    }

    /// Replace everything known about one device. A router previously stored
    /// under this device's management or loopback address (typically before
    /// the loopback was known) is merged into it. Routers that merely share
    /// an interface address are left alone. Returns the identities that were
    /// merged away.
    pub async fn replace_device(&self, records: DeviceRecords) -> Vec<RouterIdentity> {
        let aliases = records.aliases();
        let identity = records.identity;
        let own_keys: BTreeSet<Ipv4Addr> = [records.management_ip, identity.addr()]
            .into_iter()
            .chain(records.loopback)
            .collect();

        let mut tables = self.tables.write().await;

        let merged: Vec<RouterIdentity> = tables
            .routers
            .keys()
            .filter(|old| **old != identity && own_keys.contains(&old.addr()))
            .copied()
            .collect();
        for old in &merged {
            tables.routers.remove(old);
            tables.routes.remove(old);
            tables.interfaces.remove(old);
            tracing::info!("Merged router {} into {}", old, identity);
        }

        tables.routers.insert(
            identity,
            RouterRecord {
                identity,
                hostname: records.hostname,
                vendor: records.vendor,
                management_ip: records.management_ip,
                loopback: records.loopback,
                aliases,
                updated_at: Utc::now(),
            },
        );
        tables.routes.insert(identity, records.routes);
        tables.interfaces.insert(identity, records.interfaces);

        tables.rebuild_aliases();
        tables.remap_links();
        tables.paths.clear();

        tracing::debug!(
            "Store now holds {} routers, {} aliases",
            tables.routers.len(),
            tables.aliases.len()
        );
        merged
    }

    /// Replace the explicit links. Router columns resolve through the
    /// address aliases, unknown addresses become their own identity.
    pub async fn set_direct_links(&self, connections: &[DirectConnection]) {
        let mut tables = self.tables.write().await;
        let resolve = |router: Ipv4Addr, ip: Ipv4Addr| {
            tables
                .resolve(router)
                .or_else(|| tables.resolve(ip))
                .unwrap_or_else(|| RouterIdentity::new(router))
        };

        let links: Vec<LinkRecord> = connections
            .iter()
            .map(|conn| {
                LinkRecord::new(
                    resolve(conn.a, conn.a_ip),
                    conn.a_iface.as_str(),
                    resolve(conn.b, conn.b_ip),
                    conn.b_iface.as_str(),
                    conn.weight.unwrap_or(self.builder.default_weight()),
                )
            })
            .filter(|link| {
                if link.is_self_loop() {
                    tracing::warn!("Ignoring direct connection from {} to itself", link.a);
                }
                !link.is_self_loop()
            })
            .collect();

        tracing::info!("Loaded {} direct connections", links.len());
        tables.links = links;
        tables.paths.clear();
    }

    /// Identity of the router owning `addr` (loopback, management or
    /// interface address).
    pub async fn resolve(&self, addr: Ipv4Addr) -> Option<RouterIdentity> {
        self.tables.read().await.resolve(addr)
    }

    /// Router for an arbitrary address: an exact alias, else the router with
    /// the longest connected prefix containing it.
    pub async fn locate(&self, addr: Ipv4Addr) -> AppResult<RouterIdentity> {
        let tables = self.tables.read().await;
        if let Some(identity) = tables.resolve(addr) {
            return Ok(identity);
        }
        tables
            .routes
            .values()
            .flatten()
            .filter(|r| r.protocol == Protocol::Connected && r.prefix.contains(&addr))
            .max_by_key(|r| (r.prefix.prefix_len(), std::cmp::Reverse(r.router)))
            .map(|r| r.router)
            .ok_or_else(|| AppError::NotFound(addr.to_string()))
    }

    pub async fn snapshot(&self) -> Snapshot {
        let tables = self.tables.read().await;
        Snapshot {
            routers: tables.routers.values().cloned().collect(),
            routes: tables.routes.values().flatten().cloned().collect(),
            interfaces: tables.all_interfaces(),
            links: tables.graph(&self.builder).edges().to_vec(),
            paths: tables.paths.values().cloned().collect(),
        }
    }

    /// Topology over every stored router, isolated ones included.
    pub async fn build_topology(&self) -> TopologyGraph {
        self.tables.read().await.graph(&self.builder)
    }

    pub async fn record_paths(&self, record: PathRecord) {
        let mut tables = self.tables.write().await;
        tables
            .paths
            .insert((record.source, record.destination), record);
    }

    pub async fn cached_paths(&self, source: RouterIdentity, destination: RouterIdentity) -> Option<PathRecord> {
        self.tables
            .read()
            .await
            .paths
            .get(&(source, destination))
            .cloned()
    }

    /// Write the store as one JSON document.
    pub async fn save(&self, path: &FsPath) -> AppResult<()> {
        let snapshot = self.snapshot().await;
        let json = serde_json::to_string_pretty(&snapshot)?;
        tokio::fs::write(path, json).await?;
        tracing::info!(
            "Saved {} routers, {} routes to {}",
            snapshot.routers.len(),
            snapshot.routes.len(),
            path.display()
        );
        Ok(())
    }

    /// Read a document written by `save`. Stored links come back as
    /// explicit links.
    pub fn load(path: &FsPath, builder: TopologyBuilder) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let snapshot: Snapshot = serde_json::from_str(&content)?;

        let mut tables = Tables::default();
        for router in snapshot.routers {
            tables.routes.entry(router.identity).or_default();
            tables.interfaces.entry(router.identity).or_default();
            tables.routers.insert(router.identity, router);
        }
        for route in snapshot.routes {
            tables.routes.entry(route.router).or_default().push(route);
        }
        for iface in snapshot.interfaces {
            tables.interfaces.entry(iface.router).or_default().push(iface);
        }
        tables.links = snapshot.links;
        for record in snapshot.paths {
            tables.paths.insert((record.source, record.destination), record);
        }
        tables.rebuild_aliases();

        tracing::info!(
            "Loaded {} routers from {}",
            tables.routers.len(),
            path.display()
        );
        Ok(Store {
            tables: Arc::new(RwLock::new(tables)),
            builder,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::DEFAULT_VRF;
    use crate::topology::{find_primary_path, PathResult};

    fn rid(n: u8) -> RouterIdentity {
        RouterIdentity::new(Ipv4Addr::new(10, 255, 0, n))
    }

    fn connected(router: RouterIdentity, prefix: &str, iface: &str) -> RouteEntry {
        let mut route = RouteEntry::new(router, prefix.parse().unwrap(), Protocol::Connected, prefix);
        route.interface = Some(iface.to_string());
        route
    }

    /// Router n with loopback 10.255.0.n, management 192.168.100.n and the
    /// given (name, ip/len) interfaces.
    fn device(n: u8, ifaces: &[(&str, &str)]) -> DeviceRecords {
        let identity = rid(n);
        let interfaces: Vec<InterfaceRecord> = ifaces
            .iter()
            .map(|(name, cidr)| {
                let net: ipnet::Ipv4Net = cidr.parse().unwrap();
                InterfaceRecord::new(identity, name, net.addr(), net.prefix_len())
            })
            .collect();
        let routes = ifaces
            .iter()
            .map(|(name, cidr)| {
                let net: ipnet::Ipv4Net = cidr.parse().unwrap();
                connected(identity, &net.trunc().to_string(), name)
            })
            .collect();
        DeviceRecords {
            identity,
            hostname: format!("R{}", n),
            vendor: VendorTag::Cisco,
            management_ip: Ipv4Addr::new(192, 168, 100, n),
            loopback: Some(identity.addr()),
            routes,
            interfaces,
            warnings: Vec::new(),
        }
    }

    async fn triangle_store() -> Store {
        let store = Store::default();
        store
            .replace_device(device(1, &[("Gi0/0", "10.0.12.1/24"), ("Gi0/1", "10.0.13.1/24")]))
            .await;
        store
            .replace_device(device(2, &[("Ethernet1", "10.0.12.2/24"), ("Ethernet2", "10.0.23.2/24")]))
            .await;
        store
            .replace_device(device(3, &[("ge-0/0/0.0", "10.0.13.3/24"), ("ge-0/0/1.0", "10.0.23.3/24")]))
            .await;
        store
    }

    #[tokio::test]
    async fn test_replace_device_is_a_full_replacement() {
        let store = triangle_store().await;
        assert_eq!(store.snapshot().await.routes_of(rid(1)).len(), 2);

        store
            .replace_device(device(1, &[("Gi0/0", "10.0.12.1/24")]))
            .await;
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.routes_of(rid(1)).len(), 1);
        assert_eq!(snapshot.routers.len(), 3);
        assert!(snapshot.routes.iter().all(|r| r.vrf == DEFAULT_VRF));
        // 10.0.13.0/24 is gone with the interface
        assert_eq!(snapshot.links.len(), 2);
    }

    #[tokio::test]
    async fn test_resolve_and_locate() {
        let store = triangle_store().await;
        assert_eq!(store.resolve(Ipv4Addr::new(10, 0, 23, 3)).await, Some(rid(3)));
        assert_eq!(store.resolve(Ipv4Addr::new(192, 168, 100, 2)).await, Some(rid(2)));
        assert_eq!(store.resolve(Ipv4Addr::new(10, 0, 23, 9)).await, None);

        // an unused host on a connected subnet belongs to the lower router
        assert_eq!(store.locate(Ipv4Addr::new(10, 0, 23, 9)).await.unwrap(), rid(2));
        assert!(matches!(
            store.locate(Ipv4Addr::new(172, 16, 0, 1)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_management_identity_merged_into_loopback() {
        let store = Store::default();
        let mut early = device(1, &[("Gi0/0", "10.0.12.1/24")]);
        early.identity = RouterIdentity::new(early.management_ip);
        early.loopback = None;
        for iface in &mut early.interfaces {
            iface.router = early.identity;
        }
        store.replace_device(early).await;

        let merged = store.replace_device(device(1, &[("Gi0/0", "10.0.12.1/24")])).await;
        assert_eq!(merged, vec![RouterIdentity::new(Ipv4Addr::new(192, 168, 100, 1))]);
        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.routers.len(), 1);
        assert_eq!(snapshot.routers[0].identity, rid(1));
    }

    #[tokio::test]
    async fn test_shared_interface_address_keeps_both_routers() {
        let store = Store::default();
        let merged = store
            .replace_device(device(1, &[("Gi0/0", "10.0.12.1/24"), ("Gi0/3", "172.20.1.1/24")]))
            .await;
        assert!(merged.is_empty());
        let merged = store
            .replace_device(device(2, &[("Ethernet1", "10.0.12.2/24"), ("Ethernet9", "172.20.1.1/24")]))
            .await;
        assert!(merged.is_empty());

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.routers.len(), 2);
        assert_eq!(snapshot.routes_of(rid(1)).len(), 2);
        assert_eq!(snapshot.routes_of(rid(2)).len(), 2);
        // the shared address resolves deterministically, keys still to themselves
        assert_eq!(store.resolve(Ipv4Addr::new(172, 20, 1, 1)).await, Some(rid(1)));
        assert_eq!(store.resolve(rid(2).addr()).await, Some(rid(2)));
    }

    #[tokio::test]
    async fn test_direct_links_resolve_through_aliases() {
        let store = triangle_store().await;
        let connections = vec![DirectConnection {
            a: Ipv4Addr::new(192, 168, 100, 1),
            a_ip: Ipv4Addr::new(10, 0, 14, 1),
            a_iface: "Gi0/2".to_string(),
            b_iface: "to-r1".to_string(),
            b_ip: Ipv4Addr::new(10, 0, 14, 4),
            b: rid(4).addr(),
            weight: Some(7),
        }];
        store.set_direct_links(&connections).await;

        let graph = store.build_topology().await;
        assert_eq!(graph.nodes().len(), 4);
        let link = graph
            .edges()
            .iter()
            .find(|l| l.b == rid(4))
            .unwrap();
        assert_eq!(link.a, rid(1));
        assert_eq!(link.weight, 7);
    }

    #[tokio::test]
    async fn test_isolated_router_is_a_node() {
        let store = triangle_store().await;
        store.replace_device(device(9, &[("Gi0/0", "10.0.99.9/24")])).await;
        let graph = store.build_topology().await;
        assert!(graph.contains(rid(9)));
        assert_eq!(
            find_primary_path(&graph, rid(1), rid(9)).unwrap(),
            PathResult::NoPath
        );
    }

    #[tokio::test]
    async fn test_paths_cached_until_topology_changes() {
        let store = triangle_store().await;
        let graph = store.build_topology().await;
        let mut record = PathRecord::new(rid(1), rid(3));
        record.primary = find_primary_path(&graph, rid(1), rid(3)).unwrap().path().cloned();
        store.record_paths(record.clone()).await;
        assert_eq!(store.cached_paths(rid(1), rid(3)).await, Some(record));

        store.replace_device(device(2, &[("Ethernet1", "10.0.12.2/24")])).await;
        assert_eq!(store.cached_paths(rid(1), rid(3)).await, None);
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = triangle_store().await;
        let graph = store.build_topology().await;
        let mut record = PathRecord::new(rid(1), rid(2));
        record.primary = find_primary_path(&graph, rid(1), rid(2)).unwrap().path().cloned();
        store.record_paths(record).await;

        let path = std::env::temp_dir().join(format!("ribpath-store-{}.json", std::process::id()));
        store.save(&path).await.unwrap();
        let loaded = Store::load(&path, TopologyBuilder::default()).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.snapshot().await, store.snapshot().await);
        assert_eq!(loaded.build_topology().await, graph);
        assert_eq!(loaded.resolve(Ipv4Addr::new(10, 0, 13, 3)).await, Some(rid(3)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Store::load(FsPath::new("/nonexistent/ribpath.json"), TopologyBuilder::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Io(_)));
    }
}
