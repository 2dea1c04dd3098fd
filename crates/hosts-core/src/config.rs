//! Configuration types for the hosts record system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostsConfig {
    /// Record store settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Change scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Hosts file exporter settings
    #[serde(default)]
    pub export: ExportConfig,
}

impl HostsConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.store.validate()?;
        self.scheduler.validate()?;
        self.export.validate()?;
        Ok(())
    }
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path of the snapshot file
    #[serde(default = "default_store_path")]
    pub path: PathBuf,

    /// Upper bound on ID generation attempts for one new record
    ///
    /// A collision between random v4 UUIDs is practically impossible; the
    /// bound only turns a pathological ID source into an error instead of a
    /// hang.
    #[serde(default = "default_max_id_attempts")]
    pub max_id_attempts: usize,
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.path.as_os_str().is_empty() {
            return Err(crate::Error::config("store path cannot be empty"));
        }
        if self.max_id_attempts == 0 {
            return Err(crate::Error::config("max_id_attempts must be > 0"));
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            max_id_attempts: default_max_id_attempts(),
        }
    }
}

/// Change scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval of the non-forced safety-net regeneration (in seconds)
    #[serde(default = "default_resync_interval_secs")]
    pub resync_interval_secs: u64,

    /// Capacity of the scheduler event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SchedulerConfig {
    /// Resync interval as a [`Duration`]
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    /// Validate the scheduler configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.resync_interval_secs == 0 {
            return Err(crate::Error::config("resync_interval_secs must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event_channel_capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            resync_interval_secs: default_resync_interval_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// Hosts file exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Path of the generated hosts file
    #[serde(default = "default_hosts_file")]
    pub hosts_file: PathBuf,
}

impl ExportConfig {
    /// Validate the export configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.hosts_file.as_os_str().is_empty() {
            return Err(crate::Error::config("hosts file path cannot be empty"));
        }
        Ok(())
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            hosts_file: default_hosts_file(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("hosts-api.db")
}

fn default_max_id_attempts() -> usize {
    1 << 16
}

fn default_resync_interval_secs() -> u64 {
    300
}

fn default_event_channel_capacity() -> usize {
    100
}

fn default_hosts_file() -> PathBuf {
    PathBuf::from("hosts")
}
