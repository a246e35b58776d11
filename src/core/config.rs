//! Configuration management

use crate::hid::{DeviceIdentity, LedCommand};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// HID device configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HidConfig {
    /// USB Vendor ID
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,
    /// USB Product ID
    #[serde(default = "default_product_id")]
    pub product_id: u16,
    /// Input report buffer size in bytes, including the report id
    #[serde(default = "default_input_report_len")]
    pub input_report_len: usize,
    /// Output report size in bytes, including the report id
    #[serde(default = "default_output_report_len")]
    pub output_report_len: usize,
    /// Timeout of a single blocking read in milliseconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout_ms: u64,
    /// Device list polling interval in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// How long shutdown waits for the read task, in milliseconds
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_ms: u64,
}

fn default_vendor_id() -> u16 {
    0x0483
}
fn default_product_id() -> u16 {
    0x5750
}
fn default_input_report_len() -> usize {
    64
}
fn default_output_report_len() -> usize {
    2
}
fn default_read_timeout() -> u64 {
    50
}
fn default_poll_interval() -> u64 {
    500
}
fn default_shutdown_timeout() -> u64 {
    5000
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            input_report_len: default_input_report_len(),
            output_report_len: default_output_report_len(),
            read_timeout_ms: default_read_timeout(),
            poll_interval_ms: default_poll_interval(),
            shutdown_timeout_ms: default_shutdown_timeout(),
        }
    }
}

impl HidConfig {
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.vendor_id, self.product_id)
    }

    /// Single read timeout, at least 1 ms.
    ///
    /// A zero timeout would turn every read into a non-blocking poll and the
    /// read loop into a busy loop.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.max(1))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

/// Front-end configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UiConfig {
    /// LED command sent right after every successful connect
    #[serde(default)]
    pub initial_led: Option<LedCommand>,
}

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HID device configuration
    #[serde(default)]
    pub hid: HidConfig,
    /// Front-end configuration
    #[serde(default)]
    pub ui: UiConfig,
}

impl Config {
    /// Load configuration from the platform config directory
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Return default config if file doesn't exist
            Ok(Config::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::parse(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "amio", "AmioPad")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Get the default configuration embedded in the binary
    pub fn default_config_str() -> &'static str {
        include_str!("../../config/default.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.hid.vendor_id, 0x0483);
        assert_eq!(config.hid.product_id, 0x5750);
        assert_eq!(config.hid.output_report_len, 2);
        assert_eq!(config.hid.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(config.ui.initial_led, None);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.hid.vendor_id, config.hid.vendor_id);
        assert_eq!(parsed.hid.poll_interval_ms, config.hid.poll_interval_ms);
    }

    #[test]
    fn test_zero_read_timeout_is_clamped() {
        let config = Config::parse("[hid]\nread_timeout_ms = 0\n").unwrap();
        assert_eq!(config.hid.read_timeout(), Duration::from_millis(1));

        let config = Config::parse("[hid]\nread_timeout_ms = 20\n").unwrap();
        assert_eq!(config.hid.read_timeout(), Duration::from_millis(20));
    }

    #[test]
    fn test_embedded_default_matches_defaults() {
        let parsed = Config::parse(Config::default_config_str()).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.hid.identity(), defaults.hid.identity());
        assert_eq!(parsed.hid.input_report_len, defaults.hid.input_report_len);
        assert_eq!(parsed.hid.shutdown_timeout_ms, defaults.hid.shutdown_timeout_ms);
    }
}
