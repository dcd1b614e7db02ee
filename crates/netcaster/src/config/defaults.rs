/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./netcaster.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

// Schedule defaults
pub const DEFAULT_SCHEDULE_HORIZON_SECS: u64 = 48 * 3600;
pub const DEFAULT_REGENERATE_THRESHOLD_SECS: u64 = 24 * 3600;
pub const DEFAULT_PROGRAMME_DURATION_SECS: u64 = 3600;
pub const DEFAULT_SCHEDULE_CHECK_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_PROGRAMME_RETENTION_SECS: u64 = 24 * 3600;

// Broadcast defaults
pub const DEFAULT_CONTROL_PLANE_URL: &str = "http://127.0.0.1:8085";
pub const DEFAULT_CONTROL_PLANE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_CONTROL_PLANE_CONNECT_TIMEOUT_SECS: u64 = 2;
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_HEAL_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_LEASE_TTL_SECS: u64 = 120;
pub const DEFAULT_BOOT_RECOVERY: bool = true;

// Gateway defaults
pub const PLAYLIST_RETRY_AFTER_SECS: u64 = 5;

// EPG export window around now
pub const EPG_PAST_WINDOW_SECS: i64 = 6 * 3600;
pub const EPG_FUTURE_WINDOW_SECS: i64 = 72 * 3600;
