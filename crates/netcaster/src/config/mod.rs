use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

pub mod defaults;
pub mod duration_serde;

use defaults::*;
use duration_serde::duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub web: WebConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public base URL, used when rewriting segment URLs in served manifests
    pub base_url: String,
    #[serde(default = "default_request_timeout", with = "duration")]
    pub request_timeout: Duration,
}

/// Programme timeline generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// How far past the reference time the timeline is extended
    #[serde(default = "default_horizon", with = "duration")]
    pub horizon: Duration,
    /// Regeneration becomes due once the last programme ends within this window
    #[serde(default = "default_regenerate_threshold", with = "duration")]
    pub regenerate_threshold: Duration,
    /// Slot length for content without a known duration (live channels)
    #[serde(default = "default_programme_duration", with = "duration")]
    pub default_programme_duration: Duration,
    /// How often networks are checked for due regeneration
    #[serde(default = "default_schedule_check_interval", with = "duration")]
    pub check_interval: Duration,
    /// Programmes that ended longer ago than this are pruned during generation
    #[serde(default = "default_programme_retention", with = "duration")]
    pub retention: Duration,
}

/// Liveness probe used to decide whether a network's transcoder is running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeKind {
    /// Ask the control plane's status endpoint
    #[default]
    ControlPlane,
    /// Check the persisted pid against the local process table
    Process,
}

/// Broadcast supervisor and control-plane settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    /// Base URL of the transcoding control plane
    #[serde(default = "default_control_plane_url")]
    pub control_plane_url: String,
    #[serde(default = "default_control_plane_timeout", with = "duration")]
    pub request_timeout: Duration,
    #[serde(default = "default_control_plane_connect_timeout", with = "duration")]
    pub connect_timeout: Duration,
    #[serde(default = "default_tick_interval", with = "duration")]
    pub tick_interval: Duration,
    #[serde(default = "default_heal_interval", with = "duration")]
    pub heal_interval: Duration,
    /// Upper bound on how long a per-network start lease may be held
    #[serde(default = "default_lease_ttl", with = "duration")]
    pub lease_ttl: Duration,
    #[serde(default)]
    pub probe: ProbeKind,
    #[serde(default = "default_boot_recovery")]
    pub boot_recovery: bool,
}

// Web defaults
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)
}

// Schedule defaults
fn default_horizon() -> Duration {
    Duration::from_secs(DEFAULT_SCHEDULE_HORIZON_SECS)
}

fn default_regenerate_threshold() -> Duration {
    Duration::from_secs(DEFAULT_REGENERATE_THRESHOLD_SECS)
}

fn default_programme_duration() -> Duration {
    Duration::from_secs(DEFAULT_PROGRAMME_DURATION_SECS)
}

fn default_schedule_check_interval() -> Duration {
    Duration::from_secs(DEFAULT_SCHEDULE_CHECK_INTERVAL_SECS)
}

fn default_programme_retention() -> Duration {
    Duration::from_secs(DEFAULT_PROGRAMME_RETENTION_SECS)
}

// Broadcast defaults
fn default_control_plane_url() -> String {
    DEFAULT_CONTROL_PLANE_URL.to_string()
}

fn default_control_plane_timeout() -> Duration {
    Duration::from_secs(DEFAULT_CONTROL_PLANE_TIMEOUT_SECS)
}

fn default_control_plane_connect_timeout() -> Duration {
    Duration::from_secs(DEFAULT_CONTROL_PLANE_CONNECT_TIMEOUT_SECS)
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS)
}

fn default_heal_interval() -> Duration {
    Duration::from_secs(DEFAULT_HEAL_INTERVAL_SECS)
}

fn default_lease_ttl() -> Duration {
    Duration::from_secs(DEFAULT_LEASE_TTL_SECS)
}

fn default_boot_recovery() -> bool {
    DEFAULT_BOOT_RECOVERY
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            regenerate_threshold: default_regenerate_threshold(),
            default_programme_duration: default_programme_duration(),
            check_interval: default_schedule_check_interval(),
            retention: default_programme_retention(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            control_plane_url: default_control_plane_url(),
            request_timeout: default_control_plane_timeout(),
            connect_timeout: default_control_plane_connect_timeout(),
            tick_interval: default_tick_interval(),
            heal_interval: default_heal_interval(),
            lease_ttl: default_lease_ttl(),
            probe: ProbeKind::default(),
            boot_recovery: default_boot_recovery(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: Some(DEFAULT_MAX_CONNECTIONS),
            },
            web: WebConfig {
                host: default_host(),
                port: default_port(),
                base_url: DEFAULT_BASE_URL.to_string(),
                request_timeout: default_request_timeout(),
            },
            schedule: ScheduleConfig::default(),
            broadcast: BroadcastConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_file =
            std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".to_string());
        Self::load_from_file(&config_file)
    }

    pub fn load_from_file(config_file: &str) -> Result<Self> {
        if std::path::Path::new(&config_file).exists() {
            let contents = std::fs::read_to_string(config_file)?;
            Ok(toml::from_str(&contents)?)
        } else {
            let default_config = Self::default();
            let contents = toml::to_string_pretty(&default_config)?;
            std::fs::write(config_file, contents)?;
            info!("Created default config file: {}", config_file);
            Ok(default_config)
        }
    }
}
