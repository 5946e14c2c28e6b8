//! Reconciler configuration
//!
//! Settings are read from a TOML file and can be overridden per field from
//! the environment.
//!
//! # Path Resolution Priority
//!
//! 1. Path passed explicitly by the caller
//! 2. `VOLUME_RECONCILER_CONFIG` environment variable (`~` and `$VAR` expanded)
//! 3. `<config dir>/volume-reconciler/config.toml`
//!
//! A missing file is not an error; defaults are used instead.
//!
//! # Environment Overrides
//!
//! - `VOLUME_RECONCILER_SHORT_REQUEUE_SECS`
//! - `VOLUME_RECONCILER_NORMAL_REQUEUE_SECS`
//! - `VOLUME_RECONCILER_JOBS`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::retry::RetryConfig;

/// Environment variable pointing at the config file
pub const ENV_CONFIG_FILE: &str = "VOLUME_RECONCILER_CONFIG";

/// Override for `short_requeue_secs`
pub const ENV_SHORT_REQUEUE_SECS: &str = "VOLUME_RECONCILER_SHORT_REQUEUE_SECS";

/// Override for `normal_requeue_secs`
pub const ENV_NORMAL_REQUEUE_SECS: &str = "VOLUME_RECONCILER_NORMAL_REQUEUE_SECS";

/// Override for `jobs`
pub const ENV_JOBS: &str = "VOLUME_RECONCILER_JOBS";

const APP_DIR: &str = "volume-reconciler";
const CONFIG_FILE: &str = "config.toml";

/// Finalizer registered on every instance
pub const DEFAULT_FINALIZER: &str = "openstack.org/cindervolume";

/// Key in the service secret that must hold the service password
pub const DEFAULT_SERVICE_PASSWORD_KEY: &str = "CinderPassword";

/// Tunables for the reconciler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilerConfig {
    /// Delay before re-checking a missing input or a lagging workload
    pub short_requeue_secs: u64,
    /// Delay before re-checking a missing network attachment definition
    pub normal_requeue_secs: u64,
    /// Finalizer name
    pub finalizer: String,
    /// Driver class suffix treated as the fallback driver
    pub fallback_driver_suffix: String,
    /// Default key checked in the service secret
    pub service_password_key: String,
    /// Worker threads for batch reconciliation
    pub jobs: usize,
    /// Retry policy for status writes
    pub status_retry: RetrySettings,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            short_requeue_secs: 5,
            normal_requeue_secs: 10,
            finalizer: DEFAULT_FINALIZER.to_string(),
            fallback_driver_suffix: backendconf::DEFAULT_FALLBACK_DRIVER_SUFFIX.to_string(),
            service_password_key: DEFAULT_SERVICE_PASSWORD_KEY.to_string(),
            jobs: 4,
            status_retry: RetrySettings::default(),
        }
    }
}

/// `[status_retry]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts including the first write
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
    /// Upper bound for a single backoff delay
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 50,
            backoff_factor: 2.0,
            max_delay_ms: 2000,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.base_delay_ms),
            backoff_factor: settings.backoff_factor,
            max_delay: Duration::from_millis(settings.max_delay_ms),
        }
    }
}

impl ReconcilerConfig {
    /// Load config from `path`, the environment, or the default location,
    /// then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => resolve_config_path(),
        };

        let mut config = match path {
            Some(p) if p.exists() => Self::load_from(&p)?,
            Some(p) => {
                log::debug!("No config at {}, using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a config file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply overrides looked up through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_SHORT_REQUEUE_SECS) {
            self.short_requeue_secs = parse_override(ENV_SHORT_REQUEUE_SECS, &v)?;
        }
        if let Some(v) = lookup(ENV_NORMAL_REQUEUE_SECS) {
            self.normal_requeue_secs = parse_override(ENV_NORMAL_REQUEUE_SECS, &v)?;
        }
        if let Some(v) = lookup(ENV_JOBS) {
            self.jobs = parse_override(ENV_JOBS, &v)?;
        }
        Ok(())
    }

    pub fn short_requeue(&self) -> Duration {
        Duration::from_secs(self.short_requeue_secs)
    }

    pub fn normal_requeue(&self) -> Duration {
        Duration::from_secs(self.normal_requeue_secs)
    }

    /// Retry policy for status writes
    pub fn status_retry(&self) -> RetryConfig {
        RetryConfig::from(&self.status_retry)
    }
}

fn parse_override<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("Invalid value for {key}: {value:?}"))
}

/// Locate the config file without checking that it exists.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(ENV_CONFIG_FILE) {
        let expanded = expand_path(&path);
        log::debug!("Using config from {}: {}", ENV_CONFIG_FILE, expanded.display());
        return Some(expanded);
    }

    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
