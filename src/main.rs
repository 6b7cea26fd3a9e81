use anyhow::Context;
use serde::Serialize;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

use ribpath::config::{Config, PathMode};
use ribpath::device::ingest;
use ribpath::identity::RouterIdentity;
use ribpath::interfaces::parse_direct_connections;
use ribpath::store::{PathRecord, Snapshot, Store};
use ribpath::topology::{
    find_all_paths, find_alternate_paths, find_primary_path, Path, PathHop, TopologyBuilder,
};

#[derive(Serialize)]
struct PathReport<'a> {
    #[serde(flatten)]
    path: &'a Path,
    detail: Vec<PathHop>,
}

#[derive(Serialize)]
struct Report<'a> {
    source: RouterIdentity,
    destination: RouterIdentity,
    mode: PathMode,
    primary: Option<PathReport<'a>>,
    alternates: Vec<PathReport<'a>>,
    all: Vec<PathReport<'a>>,
}

fn report<'a>(path: &'a Path, snapshot: &Snapshot) -> PathReport<'a> {
    PathReport {
        path,
        detail: path.describe(&snapshot.routes, &snapshot.interfaces),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load()?;

    // Initialize logging, RUST_LOG wins over the configured level
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(config.log_level).into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("ribpath starting with {} devices", config.devices.len());

    let builder = TopologyBuilder::with_default_weight(config.default_weight);
    let store = match &config.load {
        Some(path) => Store::load(path, builder)
            .with_context(|| format!("loading store from {}", path.display()))?,
        None => Store::new(builder),
    };

    // Parse every device on the blocking pool
    let mut tasks = JoinSet::new();
    for device in config.devices.clone() {
        tasks.spawn_blocking(move || {
            let result = device.read_capture().and_then(|capture| ingest(&capture));
            (device.name, result)
        });
    }

    let mut failed = 0;
    while let Some(joined) = tasks.join_next().await {
        let (name, result) = joined.context("device parser task panicked")?;
        match result {
            Ok(records) => {
                for warning in &records.warnings {
                    tracing::debug!("{} line {}: {} ({})", name, warning.line, warning.reason, warning.text.trim());
                }
                store.replace_device(records).await;
            }
            Err(e) => {
                failed += 1;
                tracing::error!("Skipping {}: {}", name, e);
                tracing::warn!("{}", e.user_message());
            }
        }
    }
    if failed > 0 {
        tracing::warn!("{} of {} devices could not be ingested", failed, config.devices.len());
    }

    if let Some(path) = &config.links {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading direct connections from {}", path.display()))?;
        let parsed = parse_direct_connections(&text)?;
        for warning in &parsed.warnings {
            tracing::warn!("{}:{}: {}", path.display(), warning.line, warning.reason);
        }
        store.set_direct_links(&parsed.records).await;
    }

    let graph = store.build_topology().await;
    let source = store.locate(config.source).await?;
    let destination = store.locate(config.destination).await?;
    tracing::info!("Computing {:?} paths {} -> {}", config.mode, source, destination);

    let mut record = PathRecord::new(source, destination);
    match config.mode {
        PathMode::Primary => {
            record.primary = find_primary_path(&graph, source, destination)?.path().cloned();
        }
        PathMode::All => {
            record.all = find_all_paths(&graph, source, destination, config.max_hops)?;
        }
        PathMode::Alternate => {
            record.primary = find_primary_path(&graph, source, destination)?.path().cloned();
            record.alternates = find_alternate_paths(&graph, source, destination, config.max_hops)?;
        }
    }
    if record.primary.is_none() && record.all.is_empty() {
        tracing::warn!("No path between {} and {}", source, destination);
    }

    let snapshot = store.snapshot().await;
    let output = Report {
        source,
        destination,
        mode: config.mode,
        primary: record.primary.as_ref().map(|p| report(p, &snapshot)),
        alternates: record.alternates.iter().map(|p| report(p, &snapshot)).collect(),
        all: record.all.iter().map(|p| report(p, &snapshot)).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    store.record_paths(record).await;
    if let Some(path) = &config.store {
        store.save(path).await?;
    }

    Ok(())
}
