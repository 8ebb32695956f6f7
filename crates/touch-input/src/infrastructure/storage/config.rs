//! TOML-based configuration for the touch-input tool.
//!
//! Reads and writes [`TouchConfig`] to the platform config file
//! (`$XDG_CONFIG_HOME/touch-input/config.toml`, falling back to
//! `~/.config/touch-input/config.toml`) or to an explicit path.
//!
//! Example:
//!
//! ```toml
//! [device]
//! name = "event3"
//! mode = "touch"
//! layout = "wide"
//!
//! [logging]
//! level = "debug"
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = ...)]`, so an empty file, a file with
//! only `[device]`, or no file at all all load successfully.  A missing
//! `layout` means "the running kernel's native layout".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use touch_core::RecordLayout;

use crate::application::session::DispatchMode;
use crate::infrastructure::driver::DeviceClass;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TouchConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which device to open and how to decode it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// Node name (`event3`) or device name.
    #[serde(default = "default_device_name")]
    pub name: String,
    /// Dispatch mode: `"touch"` for slot events, `"pointer"` for pointer only.
    #[serde(default = "default_mode")]
    pub mode: DispatchMode,
    /// Record layout; absent means native.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<RecordLayout>,
    /// Forces the device class.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<DeviceClass>,
    /// Forces the slot count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slots: Option<usize>,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_device_name() -> String {
    "event0".to_string()
}
fn default_mode() -> DispatchMode {
    DispatchMode::Touch
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            mode: default_mode(),
            layout: None,
            class: None,
            slots: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DeviceConfig {
    /// The record layout to decode with.
    pub fn record_layout(&self) -> RecordLayout {
        self.layout.unwrap_or_else(RecordLayout::native)
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the default config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when neither
/// `XDG_CONFIG_HOME` nor `HOME` is set.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or(ConfigError::NoPlatformConfigDir)?;
    Ok(base.join("touch-input").join("config.toml"))
}

/// Loads the config at `path`, returning defaults if the file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<TouchConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(TouchConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &TouchConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        // Arrange / Act
        let cfg = TouchConfig::default();

        // Assert
        assert_eq!(cfg.device.name, "event0");
        assert_eq!(cfg.device.mode, DispatchMode::Touch);
        assert_eq!(cfg.device.layout, None);
        assert_eq!(cfg.device.record_layout(), RecordLayout::native());
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: TouchConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, TouchConfig::default());
    }

    #[test]
    fn test_partial_device_section_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[device]
name = "FT5406 memory based driver"
layout = "compact"
slots = 10
"#;

        // Act
        let cfg: TouchConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.device.name, "FT5406 memory based driver");
        assert_eq!(cfg.device.record_layout(), RecordLayout::Compact);
        assert_eq!(cfg.device.slots, Some(10));
        // Unspecified fields keep their defaults
        assert_eq!(cfg.device.mode, DispatchMode::Touch);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_pointer_mode_and_class_parse() {
        let cfg: TouchConfig = toml::from_str(
            "[device]\nmode = \"pointer\"\nclass = \"multitouch\"\n",
        )
        .expect("deserialize");

        assert_eq!(cfg.device.mode, DispatchMode::Pointer);
        assert_eq!(cfg.device.class, Some(DeviceClass::Multitouch));
    }

    #[test]
    fn test_unknown_mode_is_parse_error() {
        let result: Result<TouchConfig, toml::de::Error> =
            toml::from_str("[device]\nmode = \"gesture\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_unset_optionals_are_omitted_when_serialized() {
        let toml_str = toml::to_string_pretty(&TouchConfig::default()).expect("serialize");

        assert!(!toml_str.contains("layout"));
        assert!(!toml_str.contains("slots"));
        assert!(!toml_str.contains("class"));
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let dir = tempfile::tempdir().expect("tempdir");

        let cfg = load_config(&dir.path().join("missing.toml")).expect("load");

        assert_eq!(cfg, TouchConfig::default());
    }

    #[test]
    fn test_load_config_invalid_toml_is_parse_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[[[ not valid toml").expect("write");

        let result = load_config(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_and_load_round_trip_creates_directories() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("touch-input").join("config.toml");
        let mut cfg = TouchConfig::default();
        cfg.device.name = "event5".to_string();
        cfg.device.layout = Some(RecordLayout::Wide);
        cfg.logging.level = "debug".to_string();

        // Act
        save_config(&path, &cfg).expect("save");
        let loaded = load_config(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);
    }
}
