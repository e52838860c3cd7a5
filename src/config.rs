//! Server configuration.
//!
//! Covers the branching of the spatial tree and the defaults used for
//! listeners created without explicit parameters.
use crate::error::{GeoWatchError, Result};
use std::time::Duration;

/// Index server configuration
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "Config::default_min_branch")]
    pub min_branch: usize,

    #[serde(default = "Config::default_max_branch")]
    pub max_branch: usize,

    /// Capacity of each listener's update channel
    #[serde(default = "Config::default_channel_capacity")]
    pub channel_capacity: usize,

    /// Tick interval of each listener's notifier, in milliseconds
    #[serde(default = "Config::default_notify_interval_ms")]
    pub notify_interval_ms: u64,
}

impl Config {
    const fn default_min_branch() -> usize {
        25
    }

    const fn default_max_branch() -> usize {
        50
    }

    const fn default_channel_capacity() -> usize {
        100
    }

    const fn default_notify_interval_ms() -> u64 {
        100
    }

    /// Sets the requested tree branching. Node capacity of the index is fixed
    /// at compile time, so these values are validated but advisory.
    pub fn with_branching(mut self, min_branch: usize, max_branch: usize) -> Self {
        self.min_branch = min_branch;
        self.max_branch = max_branch;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be greater than zero");
        self.channel_capacity = capacity;
        self
    }

    /// Sets the notifier tick interval. Sub-millisecond intervals round up
    /// to one millisecond.
    pub fn with_notify_interval(mut self, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "Notify interval must be greater than zero");
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self.notify_interval_ms = millis.max(1);
        self
    }

    pub fn notify_interval(&self) -> Duration {
        Duration::from_millis(self.notify_interval_ms)
    }

    /// Checks branching against the R*-tree node rules
    /// (`max >= 4`, `1 <= min <= (max + 1) / 2`) and the listener defaults.
    pub fn validate(&self) -> Result<()> {
        if self.max_branch < 4 {
            return Err(GeoWatchError::InvalidConfig(format!(
                "max_branch must be at least 4, got: {}",
                self.max_branch
            )));
        }

        if self.min_branch == 0 || self.min_branch > self.max_branch.div_ceil(2) {
            return Err(GeoWatchError::InvalidConfig(format!(
                "min_branch must be in [1, {}], got: {}",
                self.max_branch.div_ceil(2),
                self.min_branch
            )));
        }

        if self.channel_capacity == 0 {
            return Err(GeoWatchError::InvalidConfig(
                "channel_capacity must be greater than zero".into(),
            ));
        }

        if self.notify_interval_ms == 0 {
            return Err(GeoWatchError::InvalidConfig(
                "notify_interval_ms must be greater than zero".into(),
            ));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str)
            .map_err(|e| GeoWatchError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_branch: Self::default_min_branch(),
            max_branch: Self::default_max_branch(),
            channel_capacity: Self::default_channel_capacity(),
            notify_interval_ms: Self::default_notify_interval_ms(),
        }
    }
}
