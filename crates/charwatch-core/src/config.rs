//! Dashboard configuration.
//!
//! Loaded from `~/.charwatch/config.yaml`. Every field has a default, so a
//! missing file (or a file naming only a few keys) is fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{CharwatchError, Result};
use crate::logging::charwatch_home;

/// Default status server endpoint.
pub const DEFAULT_SERVER_URL: &str = "ws://localhost:8080/ws";

/// Top-level configuration for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// WebSocket endpoint of the status server
    pub server_url: String,

    /// Number of display slots (cards); also the selection capacity
    pub max_slots: usize,

    /// Fixed maximum of the blood bar for special-resource classes
    pub blood_max: i64,

    /// Opponent names longer than this are truncated with an ellipsis
    pub max_opponent_name_length: usize,

    /// Delay before reconnecting after an unclean close
    pub reconnect_delay_ms: u64,

    /// Show the lag indicator on cards
    pub show_lag: bool,

    /// Show the "no sanctuary" warning on cards
    pub show_no_sanctuary_warning: bool,

    /// Show the "cannot see opponent" warning on cards
    pub show_blindness_warning: bool,

    /// Classes that use the blood bar instead of mana (exact match)
    pub special_resource_classes: Vec<String>,

    /// Sanctuary-type affects, in display priority order
    pub sanctuary_affects: Vec<String>,

    /// Default info-bar keys, used until the user stores their own list
    pub info_bar_items: Vec<String>,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            max_slots: 8,
            blood_max: 60,
            max_opponent_name_length: 16,
            reconnect_delay_ms: 5000,
            show_lag: true,
            show_no_sanctuary_warning: true,
            show_blindness_warning: true,
            special_resource_classes: vec![
                "Vampire".to_string(),
                "Dread Vampire".to_string(),
                "Dread vampire".to_string(),
            ],
            sanctuary_affects: [
                "sanctuary",
                "greater sanctuary",
                "infernal sanctity",
                "holy sanctity",
                "nadur dion",
                "prophetic aura",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            info_bar_items: ["STYLE", "EQUIP_HITS", "FLYING", "VIS", "ALIGNMENT", "FAVOR"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl DashboardConfig {
    /// Path of the default configuration file (`~/.charwatch/config.yaml`).
    pub fn default_path() -> Result<PathBuf> {
        Ok(charwatch_home()?.join("config.yaml"))
    }

    /// Load the configuration from the default path.
    ///
    /// A missing file yields the defaults.
    pub fn load_default() -> Result<Self> {
        let path = Self::default_path()?;
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load the configuration from an explicit path. The file must exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CharwatchError::config_not_found_with_source(path, e)
            } else {
                CharwatchError::io("reading config", path, e)
            }
        })?;
        let config = Self::from_yaml(&content, path)?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// Parse configuration YAML. An empty document yields the defaults.
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| CharwatchError::ConfigInvalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_slots == 0 {
            return Err(CharwatchError::config_validation(
                "max_slots must be at least 1",
            ));
        }
        if self.server_url.trim().is_empty() {
            return Err(CharwatchError::config_validation("server_url is empty"));
        }
        Ok(())
    }

    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Set the server URL.
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into();
        self
    }

    /// Point the server URL at `ws://{host}:{port}/ws`.
    pub fn with_host_port(mut self, host: &str, port: u16) -> Self {
        self.server_url = format!("ws://{host}:{port}/ws");
        self
    }

    /// Set the number of display slots.
    pub fn with_max_slots(mut self, slots: usize) -> Self {
        self.max_slots = slots;
        self
    }

    /// Set the reconnect delay.
    pub fn with_reconnect_delay_ms(mut self, ms: u64) -> Self {
        self.reconnect_delay_ms = ms;
        self
    }
}
