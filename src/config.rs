// Configuration management for ribpath
// Supports CLI arguments, an inventory file (TOML), and environment variables

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use tracing::Level;

use crate::addr::parse_ipv4;
use crate::device::DeviceCapture;
use crate::error::{AppError, AppResult};
use crate::topology::path::DEFAULT_MAX_HOPS;
use crate::topology::DEFAULT_LINK_WEIGHT;
use crate::vendor::VendorTag;

/// ribpath - normalize multi-vendor routing tables and find paths between routers
#[derive(Parser, Debug, Clone)]
#[command(name = "ribpath")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the inventory file
    #[arg(short, long, env = "RIBPATH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Source router (any of its addresses)
    #[arg(long)]
    pub from: String,

    /// Destination router (any of its addresses)
    #[arg(long)]
    pub to: String,

    /// Which paths to compute
    #[arg(short, long, value_enum, default_value = "primary")]
    pub mode: PathMode,

    /// Maximum links per path when enumerating paths
    #[arg(long, env = "RIBPATH_MAX_HOPS")]
    pub max_hops: Option<usize>,

    /// Direct-connection table, overrides the inventory's
    #[arg(long)]
    pub links: Option<PathBuf>,

    /// Load a previously saved store before ingesting devices
    #[arg(long)]
    pub load: Option<PathBuf>,

    /// Save the store as JSON after computing paths
    #[arg(long, env = "RIBPATH_STORE")]
    pub store: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(short, long, env = "RIBPATH_LOG_LEVEL")]
    pub log_level: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathMode {
    Primary,
    All,
    Alternate,
}

/// Inventory file structure (TOML format)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigFile {
    /// Topology settings
    #[serde(default)]
    pub topology: TopologyConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Direct-connection table
    #[serde(default)]
    pub links: Option<PathBuf>,

    /// Captured devices
    #[serde(default, rename = "device")]
    pub devices: Vec<DeviceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Weight of links inferred from shared subnets
    #[serde(default = "default_link_weight")]
    pub default_weight: u32,

    /// Maximum links per enumerated path
    #[serde(default = "default_max_hops")]
    pub max_hops: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// One `[[device]]` entry. File paths are relative to the inventory file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    pub name: String,
    pub mgmt_ip: String,

    /// Vendor tag, detected from the banner when absent
    #[serde(default)]
    pub vendor: Option<String>,

    #[serde(default)]
    pub banner: Option<String>,

    #[serde(default)]
    pub banner_file: Option<PathBuf>,

    /// Captured `show ip route` / `show route` / `display ip routing-table`
    pub rib: PathBuf,

    /// Captured interface listing
    #[serde(default)]
    pub interfaces: Option<PathBuf>,
}

// Default value functions
fn default_link_weight() -> u32 {
    DEFAULT_LINK_WEIGHT
}
fn default_max_hops() -> usize {
    DEFAULT_MAX_HOPS
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TopologyConfig {
    fn default() -> Self {
        TopologyConfig {
            default_weight: default_link_weight(),
            max_hops: default_max_hops(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
        }
    }
}

/// A device entry with validated fields and resolved paths.
#[derive(Debug, Clone)]
pub struct DeviceSource {
    pub name: String,
    pub management_ip: Ipv4Addr,
    pub vendor: Option<VendorTag>,
    pub banner: Option<String>,
    pub banner_file: Option<PathBuf>,
    pub rib: PathBuf,
    pub interfaces: Option<PathBuf>,
}

impl DeviceSource {
    fn from_config(device: &DeviceConfig, base: &Path) -> AppResult<Self> {
        let vendor = device
            .vendor
            .as_deref()
            .map(str::parse::<VendorTag>)
            .transpose()?;
        Ok(DeviceSource {
            name: device.name.clone(),
            management_ip: parse_ipv4(device.mgmt_ip.trim())?,
            vendor,
            banner: device.banner.clone(),
            banner_file: device.banner_file.as_ref().map(|p| base.join(p)),
            rib: base.join(&device.rib),
            interfaces: device.interfaces.as_ref().map(|p| base.join(p)),
        })
    }

    /// Read the captured text files.
    pub fn read_capture(&self) -> AppResult<DeviceCapture> {
        let banner = match (&self.banner, &self.banner_file) {
            (Some(banner), _) => Some(banner.clone()),
            (None, Some(path)) => Some(std::fs::read_to_string(path)?),
            (None, None) => None,
        };
        let interfaces = match &self.interfaces {
            Some(path) => Some(std::fs::read_to_string(path)?),
            None => None,
        };
        Ok(DeviceCapture {
            name: self.name.clone(),
            management_ip: self.management_ip,
            vendor: self.vendor,
            banner,
            rib: std::fs::read_to_string(&self.rib)?,
            interfaces,
        })
    }
}

/// Merged configuration from all sources
#[derive(Debug, Clone)]
pub struct Config {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub mode: PathMode,
    pub max_hops: usize,
    pub default_weight: u32,
    pub log_level: Level,
    pub devices: Vec<DeviceSource>,
    pub links: Option<PathBuf>,
    pub load: Option<PathBuf>,
    pub store: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources (CLI args, config file, defaults)
    /// Priority: CLI args > Config file > Environment variables > Defaults
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self::from_cli(CliArgs::parse())?)
    }

    pub fn from_cli(cli_args: CliArgs) -> AppResult<Self> {
        // Load config file if specified
        let (config_file, base) = if let Some(config_path) = &cli_args.config {
            tracing::info!("Loading inventory from: {}", config_path.display());
            let config_content = std::fs::read_to_string(config_path)?;
            (toml::from_str::<ConfigFile>(&config_content)?, base_dir(config_path))
        } else {
            // Try loading from default locations
            let default_paths = vec![PathBuf::from("ribpath.toml"), PathBuf::from("inventory.toml")];

            let mut loaded_config = None;
            for path in default_paths {
                if path.exists() {
                    tracing::info!("Loading inventory from: {}", path.display());
                    let config_content = std::fs::read_to_string(&path)?;
                    loaded_config = Some((toml::from_str::<ConfigFile>(&config_content)?, base_dir(&path)));
                    break;
                }
            }

            loaded_config.unwrap_or_default()
        };

        if config_file.devices.is_empty() && cli_args.load.is_none() {
            return Err(AppError::Config(
                "no [[device]] entries in the inventory and no --load store given".to_string(),
            ));
        }
        if config_file.topology.default_weight == 0 {
            return Err(AppError::Config("topology.default_weight must be at least 1".to_string()));
        }

        let devices = config_file
            .devices
            .iter()
            .map(|device| DeviceSource::from_config(device, &base))
            .collect::<AppResult<Vec<_>>>()?;

        // Merge configuration (CLI args override config file)
        let log_level = parse_log_level(
            cli_args
                .log_level
                .as_deref()
                .unwrap_or(&config_file.logging.level),
        )?;
        let links = cli_args
            .links
            .or_else(|| config_file.links.as_ref().map(|p| base.join(p)));

        Ok(Config {
            source: parse_ipv4(cli_args.from.trim())?,
            destination: parse_ipv4(cli_args.to.trim())?,
            mode: cli_args.mode,
            max_hops: cli_args.max_hops.unwrap_or(config_file.topology.max_hops),
            default_weight: config_file.topology.default_weight,
            log_level,
            devices,
            links,
            load: cli_args.load,
            store: cli_args.store,
        })
    }
}

fn base_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

pub fn parse_log_level(level_str: &str) -> AppResult<Level> {
    match level_str.to_lowercase().as_str() {
        "error" => Ok(Level::ERROR),
        "warn" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(AppError::Config(format!("Invalid log level: {}", level_str))),
    }
}
