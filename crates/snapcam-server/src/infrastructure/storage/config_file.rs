//! TOML configuration file for the server.
//!
//! Every field is optional.  A field present in the file overrides the
//! built-in default; a flag or environment variable on the command line
//! overrides the file.
//!
//! ```toml
//! [server]
//! bind_address = "0.0.0.0"
//! port = 12345
//!
//! [camera]
//! device = "/dev/video0"   # or an index such as "1", or "synthetic"
//! width = 1280
//! height = 720
//! ```
//!
//! Unknown keys are rejected so that a typo such as `prot = 80` fails loudly
//! instead of being silently ignored.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::config::{DeviceSelector, DeviceSelectorError, ServerConfig, MAX_DIMENSION};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `camera.device` is not a valid selector.
    #[error(transparent)]
    InvalidDevice(#[from] DeviceSelectorError),

    /// `camera.width` or `camera.height` is zero or above 65535.
    #[error("camera dimensions must be between 1 and 65535, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level file layout.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub server: ServerSection,
    pub camera: CameraSection,
}

/// `[server]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSection {
    pub bind_address: Option<IpAddr>,
    pub port: Option<u16>,
}

/// `[camera]` table.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct CameraSection {
    pub device: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl FileConfig {
    /// Overlays the fields present in the file onto `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDevice`] for an unparseable
    /// `camera.device` and [`ConfigError::InvalidDimensions`] for a width or
    /// height outside `1..=MAX_DIMENSION`.  `config` is left untouched on
    /// error.
    pub fn apply_to(&self, config: &mut ServerConfig) -> Result<(), ConfigError> {
        let device = match &self.camera.device {
            Some(raw) => Some(raw.parse::<DeviceSelector>()?),
            None => None,
        };
        let width = self.camera.width.unwrap_or(config.width);
        let height = self.camera.height.unwrap_or(config.height);
        let valid = 1..=MAX_DIMENSION;
        if !valid.contains(&width) || !valid.contains(&height) {
            return Err(ConfigError::InvalidDimensions { width, height });
        }

        let ip = self.server.bind_address.unwrap_or(config.bind_addr.ip());
        let port = self.server.port.unwrap_or(config.bind_addr.port());
        config.bind_addr = SocketAddr::new(ip, port);
        if let Some(device) = device {
            config.device = device;
        }
        config.width = width;
        config.height = height;
        Ok(())
    }
}

/// Parses config TOML text.
pub fn parse_config(text: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Reads and parses the config file at `path`.
///
/// Unlike a settings store, an explicitly named config file must exist: a
/// missing file is an [`ConfigError::Io`] error.
pub fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_file_changes_nothing() {
        // Arrange
        let file = parse_config("").unwrap();
        let mut cfg = ServerConfig::default();

        // Act
        file.apply_to(&mut cfg).unwrap();

        // Assert
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn test_full_file_overrides_every_field() {
        let text = r#"
            [server]
            bind_address = "127.0.0.1"
            port = 8080

            [camera]
            device = "synthetic"
            width = 320
            height = 240
        "#;
        let mut cfg = ServerConfig::default();

        parse_config(text).unwrap().apply_to(&mut cfg).unwrap();

        assert_eq!(cfg.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.device, DeviceSelector::Synthetic);
        assert_eq!((cfg.width, cfg.height), (320, 240));
    }

    #[test]
    fn test_port_only_keeps_default_bind_address() {
        let mut cfg = ServerConfig::default();

        parse_config("[server]\nport = 9000\n")
            .unwrap()
            .apply_to(&mut cfg)
            .unwrap();

        assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:9000");
    }

    #[test]
    fn test_device_index_in_file() {
        let mut cfg = ServerConfig::default();

        parse_config("[camera]\ndevice = \"2\"\n")
            .unwrap()
            .apply_to(&mut cfg)
            .unwrap();

        assert_eq!(cfg.device, DeviceSelector::Index(2));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = parse_config("[server]\nprot = 80\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let result = parse_config("this is not = = toml");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_zero_width_is_rejected_and_config_untouched() {
        // Arrange
        let file = parse_config("[camera]\nwidth = 0\ndevice = \"synthetic\"\n").unwrap();
        let mut cfg = ServerConfig::default();

        // Act
        let result = file.apply_to(&mut cfg);

        // Assert
        assert!(matches!(
            result,
            Err(ConfigError::InvalidDimensions { width: 0, height: 480 })
        ));
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn test_oversized_height_is_rejected_and_config_untouched() {
        // Arrange
        let file = parse_config("[camera]\nwidth = 320\nheight = 70000\n").unwrap();
        let mut cfg = ServerConfig::default();

        // Act
        let result = file.apply_to(&mut cfg);

        // Assert
        assert!(matches!(
            result,
            Err(ConfigError::InvalidDimensions { width: 320, height: 70_000 })
        ));
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn test_largest_jpeg_dimensions_are_accepted() {
        let mut cfg = ServerConfig::default();

        parse_config("[camera]\nwidth = 65535\nheight = 65535\n")
            .unwrap()
            .apply_to(&mut cfg)
            .unwrap();

        assert_eq!((cfg.width, cfg.height), (MAX_DIMENSION, MAX_DIMENSION));
    }

    #[test]
    fn test_empty_device_is_rejected() {
        let file = parse_config("[camera]\ndevice = \"\"\n").unwrap();
        let mut cfg = ServerConfig::default();

        assert!(matches!(
            file.apply_to(&mut cfg),
            Err(ConfigError::InvalidDevice(_))
        ));
    }

    #[test]
    fn test_load_config_file_from_disk() {
        // Arrange
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[server]\nport = 4242").unwrap();

        // Act
        let loaded = load_config_file(file.path()).unwrap();

        // Assert
        assert_eq!(loaded.server.port, Some(4242));
    }

    #[test]
    fn test_missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let result = load_config_file(&path);

        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
