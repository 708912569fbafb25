// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Configuration for MiniMIDI.
//!
//! Settings for the monitor: which source to open, queue size, polling
//! cadence and the hotplug reconnect policy. Files are YAML or TOML, picked
//! by extension; every field has a default.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::MidiError;
use crate::midi::{ReconnectPolicy, SessionOptions, DEFAULT_CAPACITY};

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitorConfig {
    /// Name of the platform client
    pub client_name: String,
    /// Label the input port is registered under
    pub port_label: String,
    /// Source index to open
    pub port: Option<usize>,
    /// Partial source name to match (case-insensitive); wins over `port`
    pub port_name: Option<String>,
    /// Queue capacity in messages
    pub buffer_capacity: usize,
    /// How often the queue is drained
    pub poll_interval_ms: u64,
    /// Log level: error, warn, info, debug or trace
    pub log_level: String,
    /// Reconnect behaviour after an unplug
    pub hotplug: HotplugConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            client_name: "MiniMIDI Input Client".to_string(),
            port_label: "MiniMIDI Input".to_string(),
            port: None,
            port_name: None,
            buffer_capacity: DEFAULT_CAPACITY,
            poll_interval_ms: 10,
            log_level: "info".to_string(),
            hotplug: HotplugConfig::default(),
        }
    }
}

/// Hotplug reconnect settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HotplugConfig {
    /// Time between reconnect attempts
    pub interval_ms: u64,
    /// Give up after this long
    pub timeout_ms: u64,
    /// Pause between closing and reopening the port
    pub settle_ms: u64,
}

impl Default for HotplugConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            timeout_ms: 120_000,
            settle_ms: 50,
        }
    }
}

impl MonitorConfig {
    /// Load a configuration file; `.toml` files are TOML, anything else YAML.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config = if is_toml(path) {
            Self::from_toml(&contents)?
        } else {
            Self::from_yaml(&contents)?
        };
        config
            .validate()
            .with_context(|| format!("Invalid config file: {:?}", path))?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).context("Failed to parse YAML configuration")
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse TOML configuration")
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize configuration to YAML")
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string(self).context("Failed to serialize configuration to TOML")
    }

    /// Save to a file, in the format matching its extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = if is_toml(path) {
            self.to_toml()?
        } else {
            self.to_yaml()?
        };
        fs::write(path, text).with_context(|| format!("Failed to write config file: {:?}", path))
    }

    /// Reject settings the session cannot run with.
    pub fn validate(&self) -> std::result::Result<(), MidiError> {
        if self.buffer_capacity == 0 {
            return Err(MidiError::InvalidConfig(
                "buffer_capacity must be at least 1".into(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(MidiError::InvalidConfig(
                "poll_interval_ms must be at least 1".into(),
            ));
        }
        if self.hotplug.interval_ms == 0 {
            return Err(MidiError::InvalidConfig(
                "hotplug.interval_ms must be at least 1".into(),
            ));
        }
        if self.hotplug.timeout_ms < self.hotplug.interval_ms {
            return Err(MidiError::InvalidConfig(
                "hotplug.timeout_ms must not be shorter than hotplug.interval_ms".into(),
            ));
        }
        if parse_level(&self.log_level).is_none() {
            return Err(MidiError::InvalidConfig(format!(
                "unknown log_level '{}'",
                self.log_level
            )));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            buffer_capacity: self.buffer_capacity,
            reconnect_settle: Duration::from_millis(self.hotplug.settle_ms),
        }
    }

    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        ReconnectPolicy {
            interval: Duration::from_millis(self.hotplug.interval_ms),
            timeout: Duration::from_millis(self.hotplug.timeout_ms),
        }
    }

    /// Configured log level, falling back to INFO.
    pub fn level(&self) -> tracing::Level {
        parse_level(&self.log_level).unwrap_or(tracing::Level::INFO)
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"))
}

fn parse_level(level: &str) -> Option<tracing::Level> {
    level.parse().ok()
}
