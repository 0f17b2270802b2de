//! Runtime configuration
//!
//! Read once at startup from JSON. Every field has a default, so a partial
//! file (or none at all) gives the stock cluster.

use anyhow::{Context, Result};
use mdash_adapters::{EngineTuning, SpeedMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "MDASH_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    /// Tick period in milliseconds
    pub tick_ms: u64,
    pub mode: SpeedMode,
    pub engine: EngineTuning,
    /// Full on/off blink period of the turn indicators
    pub blink_period_ms: u64,
    pub sockets: SocketPaths,
    /// Odometer record location
    pub data_file: PathBuf,
    /// HTTP API bind address; the API has no authentication
    pub listen: SocketAddr,
    /// Directory file sinks are confined to
    pub sink_dir: PathBuf,
    /// Speed above which the overspeed alert is shown
    pub overspeed_kph: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketPaths {
    pub track: PathBuf,
    pub speed: PathBuf,
    pub command: PathBuf,
}

impl Default for SocketPaths {
    fn default() -> Self {
        Self {
            track: PathBuf::from("/tmp/lvgl_music.sock"),
            speed: PathBuf::from("/tmp/lvgl_speed.sock"),
            command: PathBuf::from("/tmp/lvgl_cmd.sock"),
        }
    }
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            tick_ms: 16,
            mode: SpeedMode::Demo,
            engine: EngineTuning::default(),
            blink_period_ms: 480,
            sockets: SocketPaths::default(),
            data_file: default_data_file(),
            listen: SocketAddr::from(([127, 0, 0, 1], 9100)),
            sink_dir: default_sink_dir(),
            overspeed_kph: 160,
        }
    }
}

impl DashConfig {
    /// Tick period, never shorter than 1 ms
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn blink_period(&self) -> Duration {
        Duration::from_millis(self.blink_period_ms)
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load from `MDASH_CONFIG`, then the user config dir, then defaults
    ///
    /// An unreadable or malformed file is logged and replaced by defaults;
    /// the cluster always starts.
    pub fn load() -> Self {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let path = explicit
            .clone()
            .or_else(|| dirs::config_dir().map(|dir| dir.join("mdash").join("config.json")));

        let Some(path) = path else {
            info!("No config directory, using defaults");
            return Self::default();
        };

        if explicit.is_none() && !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::from_file(&path) {
            Ok(config) => {
                info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                warn!("Ignoring config: {:#}", e);
                Self::default()
            }
        }
    }
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("mdash"))
        .unwrap_or_else(|| std::env::temp_dir().join("mdash"))
}

fn default_data_file() -> PathBuf {
    data_dir().join("vehicle_data.txt")
}

pub fn default_sink_dir() -> PathBuf {
    data_dir().join("sinks")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DashConfig::default();
        assert_eq!(config.tick(), Duration::from_millis(16));
        assert_eq!(config.blink_period(), Duration::from_millis(480));
        assert_eq!(config.mode, SpeedMode::Demo);
        assert_eq!(config.overspeed_kph, 160);
        assert_eq!(config.listen.port(), 9100);
        assert!(config.listen.ip().is_loopback());
        assert!(config.data_file.ends_with("vehicle_data.txt"));
        assert!(config.sink_dir.ends_with("sinks"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: DashConfig = serde_json::from_str(
            r#"{ "tick_ms": 40, "mode": "live", "engine": { "accel_step": 1.0 } }"#,
        )
        .unwrap();
        assert_eq!(config.tick_ms, 40);
        assert_eq!(config.mode, SpeedMode::Live);
        assert_eq!(config.engine.accel_step, 1.0);
        assert_eq!(config.engine.brake_step, 1.11);
        assert_eq!(config.sockets, SocketPaths::default());
    }

    #[test]
    fn test_zero_tick_is_clamped() {
        let config = DashConfig {
            tick_ms: 0,
            ..DashConfig::default()
        };
        assert_eq!(config.tick(), Duration::from_millis(1));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("mdash-config-{}.json", std::process::id()));
        fs::write(&path, "{ not json").unwrap();
        assert!(DashConfig::from_file(&path).is_err());
        fs::remove_file(&path).unwrap();
    }
}
