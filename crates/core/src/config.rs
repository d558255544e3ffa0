use std::env;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_lookup(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

fn parse_override<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable config override");
            None
        }
    }
}

fn parse_bool_override(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => {
            warn!(key, value = %raw, "ignoring unparseable config override");
            None
        }
    }
}

/// Scheduler configuration, typically parsed from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Logical ticks per wall-clock second for the in-process tick driver.
    #[serde(default = "default_ticks_per_second")]
    pub ticks_per_second: u32,
    /// Fallback pool threads. 0 = available parallelism.
    #[serde(default)]
    pub fallback_workers: usize,
    /// In-process region backend threads. 0 = available parallelism.
    #[serde(default)]
    pub region_workers: usize,
    /// Fixed backoff between resource load attempts, in ticks.
    #[serde(default = "default_retry_backoff")]
    pub retry_backoff_ticks: u64,
    /// Attempts used when a caller does not pick a bound.
    #[serde(default = "default_max_retries")]
    pub default_max_retries: u32,
    /// Ignore the region-threaded backend even when the host provides one.
    #[serde(default)]
    pub force_fallback: bool,
    /// Whether `Scheduler::start` spawns its own tick thread.
    #[serde(default = "default_drive_ticks")]
    pub drive_ticks: bool,
}

fn default_ticks_per_second() -> u32 { 20 }
fn default_retry_backoff() -> u64 { 20 }
fn default_max_retries() -> u32 { 3 }
fn default_drive_ticks() -> bool { true }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: default_ticks_per_second(),
            fallback_workers: 0,
            region_workers: 0,
            retry_backoff_ticks: default_retry_backoff(),
            default_max_retries: default_max_retries(),
            force_fallback: false,
            drive_ticks: default_drive_ticks(),
        }
    }
}

impl SchedulerConfig {
    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Build config from defaults plus environment variables (call `load_dotenv()` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Convention: `TICKROUTE_<FIELD>` overrides `<field>`, e.g.
    /// `TICKROUTE_TICKS_PER_SECOND` or `TICKROUTE_FORCE_FALLBACK`.
    /// Unparseable values are logged and ignored.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(env_lookup);
    }

    /// Apply `TICKROUTE_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = parse_override(&lookup, "TICKROUTE_TICKS_PER_SECOND") {
            self.ticks_per_second = v;
        }
        if let Some(v) = parse_override(&lookup, "TICKROUTE_FALLBACK_WORKERS") {
            self.fallback_workers = v;
        }
        if let Some(v) = parse_override(&lookup, "TICKROUTE_REGION_WORKERS") {
            self.region_workers = v;
        }
        if let Some(v) = parse_override(&lookup, "TICKROUTE_RETRY_BACKOFF_TICKS") {
            self.retry_backoff_ticks = v;
        }
        if let Some(v) = parse_override(&lookup, "TICKROUTE_DEFAULT_MAX_RETRIES") {
            self.default_max_retries = v;
        }
        if let Some(v) = parse_bool_override(&lookup, "TICKROUTE_FORCE_FALLBACK") {
            self.force_fallback = v;
        }
        if let Some(v) = parse_bool_override(&lookup, "TICKROUTE_DRIVE_TICKS") {
            self.drive_ticks = v;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_second == 0 {
            return Err(ConfigError::Invalid("ticks_per_second must be positive".into()));
        }
        if self.retry_backoff_ticks == 0 {
            return Err(ConfigError::Invalid("retry_backoff_ticks must be positive".into()));
        }
        if self.default_max_retries == 0 {
            return Err(ConfigError::Invalid("default_max_retries must be positive".into()));
        }
        Ok(())
    }

    /// Wall-clock length of one tick for the in-process driver.
    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs(1) / self.ticks_per_second.max(1)
    }

    /// Resolve fallback pool size (0 means use available parallelism).
    pub fn resolved_fallback_workers(&self) -> usize {
        resolve_threads(self.fallback_workers)
    }

    /// Resolve region pool size (0 means use available parallelism).
    pub fn resolved_region_workers(&self) -> usize {
        resolve_threads(self.region_workers)
    }
}

fn resolve_threads(configured: usize) -> usize {
    if configured == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    } else {
        configured
    }
}
