//! Configuration management for Grabdrop.
//!
//! This module handles loading, saving, and validating Grabdrop configuration.
//!
//! ## Configuration File Locations
//!
//! | Platform | Path |
//! |----------|------|
//! | Linux | `~/.config/grabdrop/config.toml` |
//! | macOS | `~/Library/Application Support/com.grabdrop.Grabdrop/config.toml` |
//! | Windows | `%APPDATA%\grabdrop\Grabdrop\config\config.toml` |
//!
//! ## Example
//!
//! ```rust,ignore
//! use grabdrop_core::config::Config;
//!
//! let config = Config::load()?;
//! println!("Device name: {}", config.general.device_name);
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gesture::FrameSize;

/// Main configuration struct for Grabdrop.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Network settings
    pub network: NetworkConfig,
    /// Gesture settings
    pub gesture: GestureConfig,
    /// Clipboard settings
    pub clipboard: ClipboardConfig,
    /// Receiving settings
    pub receive: ReceiveConfig,
}

/// General configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Display name on network
    pub device_name: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            device_name: hostname::get().map_or_else(
                |_| "Grabdrop Device".to_string(),
                |h| h.to_string_lossy().to_string(),
            ),
        }
    }
}

/// Network configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Receiver port (TCP)
    pub port: u16,
    /// Reachability check timeout
    #[serde(with = "humantime_serde")]
    pub ping_timeout: Duration,
    /// Transfer timeout
    #[serde(with = "humantime_serde")]
    pub send_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            port: crate::DEFAULT_PORT,
            ping_timeout: Duration::from_secs(crate::DEFAULT_PING_TIMEOUT_SECS),
            send_timeout: Duration::from_secs(crate::DEFAULT_SEND_TIMEOUT_SECS),
        }
    }
}

/// Gesture configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// How long a fist must be held before it becomes a grab
    #[serde(with = "humantime_serde")]
    pub hold_threshold: Duration,
    /// Frame width used when a reading does not carry one
    pub frame_width: u32,
    /// Frame height used when a reading does not carry one
    pub frame_height: u32,
    /// Distance from the right edge that aims at a peer
    pub edge_margin: u32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            hold_threshold: Duration::from_millis(crate::DEFAULT_HOLD_THRESHOLD_MS),
            frame_width: crate::DEFAULT_FRAME_WIDTH,
            frame_height: crate::DEFAULT_FRAME_HEIGHT,
            edge_margin: crate::DEFAULT_EDGE_MARGIN,
        }
    }
}

impl GestureConfig {
    /// Frame size used when a reading does not carry its own.
    #[must_use]
    pub const fn frame_size(&self) -> FrameSize {
        FrameSize::new(self.frame_width, self.frame_height)
    }
}

/// Clipboard configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipboardConfig {
    /// Where captured text and images are staged before sending
    pub staging_dir: Option<PathBuf>,
    /// Staged files older than this are removed at startup
    #[serde(with = "humantime_serde")]
    pub max_staged_age: Duration,
}

impl Default for ClipboardConfig {
    fn default() -> Self {
        Self {
            staging_dir: None,
            max_staged_age: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl ClipboardConfig {
    /// Resolve the staging directory, falling back to the system temp dir.
    #[must_use]
    pub fn staging_dir(&self) -> PathBuf {
        self.staging_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("grabdrop"))
    }
}

/// Receiving configuration options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiveConfig {
    /// Directory where received files are stored
    pub upload_dir: PathBuf,
    /// Maximum accepted upload size in bytes
    pub max_upload_size: usize,
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("received_files"),
            max_upload_size: crate::DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// If the configuration file doesn't exist, returns the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit path.
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::ConfigError(format!("Failed to create config directory: {e}"))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| Error::ConfigError(format!("Failed to write config: {e}")))
    }

    /// Check values that would make the pipeline misbehave.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the first offending key.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, reason: &str| {
            Err(Error::InvalidConfig {
                key: key.to_string(),
                reason: reason.to_string(),
            })
        };

        if self.gesture.frame_width == 0 || self.gesture.frame_height == 0 {
            return invalid("gesture.frame_width", "frame dimensions must be non-zero");
        }
        if self.gesture.edge_margin > self.gesture.frame_width {
            return invalid("gesture.edge_margin", "must not exceed the frame width");
        }
        if self.gesture.hold_threshold.is_zero() {
            return invalid("gesture.hold_threshold", "must be greater than zero");
        }
        if self.network.send_timeout.is_zero() || self.network.ping_timeout.is_zero() {
            return invalid("network.send_timeout", "timeouts must be greater than zero");
        }
        if self.receive.max_upload_size == 0 {
            return invalid("receive.max_upload_size", "must be greater than zero");
        }
        Ok(())
    }

    /// Get the default configuration directory path.
    #[must_use]
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "grabdrop", "Grabdrop")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the full path to the configuration file.
    #[must_use]
    pub fn config_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config.toml")
    }
}

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{s}'")))
    }

    pub(super) fn parse(s: &str) -> Option<Duration> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            return ms.parse().ok().map(Duration::from_millis);
        }
        let (unit_start, _) = s.char_indices().last()?;
        let (num, unit) = s.split_at(unit_start);
        let value: u64 = num.parse().ok()?;
        match unit {
            "s" => Some(Duration::from_secs(value)),
            "m" => Some(Duration::from_secs(value * 60)),
            "h" => Some(Duration::from_secs(value * 3600)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.network.port, crate::DEFAULT_PORT);
        assert_eq!(config.gesture.hold_threshold, Duration::from_millis(500));
        assert_eq!(config.gesture.edge_margin, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut original = Config::default();
        original.general.device_name = "Test Device".to_string();
        original.network.port = 12345;
        original.gesture.hold_threshold = Duration::from_millis(750);

        original.save_to(&config_path).expect("save");
        let loaded = Config::load_from(&config_path).expect("load");

        assert_eq!(loaded.general.device_name, "Test Device");
        assert_eq!(loaded.network.port, 12345);
        assert_eq!(loaded.gesture.hold_threshold, Duration::from_millis(750));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.network.port, crate::DEFAULT_PORT);
    }

    #[test]
    fn test_config_deserialization_partial() {
        let partial_toml = r#"
[general]
device_name = "My Custom Device"

[gesture]
edge_margin = 120
hold_threshold = "1s"
"#;

        let config: Config = toml::from_str(partial_toml).expect("parse partial config");

        assert_eq!(config.general.device_name, "My Custom Device");
        assert_eq!(config.gesture.edge_margin, 120);
        assert_eq!(config.gesture.hold_threshold, Duration::from_secs(1));
        assert_eq!(config.gesture.frame_width, crate::DEFAULT_FRAME_WIDTH);
        assert_eq!(config.network.send_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_invalid_edge_margin_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[gesture]\nframe_width = 100\nedge_margin = 300\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { ref key, .. } if key == "gesture.edge_margin"));
    }

    #[test]
    fn test_humantime_duration_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");

        assert!(toml_str.contains("hold_threshold = \"500ms\""));
        assert!(toml_str.contains("send_timeout = \"30s\""));
    }

    #[test]
    fn test_humantime_parse_units() {
        assert_eq!(humantime_serde::parse("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(humantime_serde::parse("5s"), Some(Duration::from_secs(5)));
        assert_eq!(humantime_serde::parse("2m"), Some(Duration::from_secs(120)));
        assert_eq!(humantime_serde::parse("24h"), Some(Duration::from_secs(86_400)));
        assert_eq!(humantime_serde::parse("soon"), None);
        assert_eq!(humantime_serde::parse(""), None);
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.ends_with("config.toml"));
    }
}
