//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for runtime settings.  It is
//! built once at startup from built-in defaults, an optional TOML file and the
//! command line, then handed to the startup use case by value.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Default TCP port the server listens on.
pub const DEFAULT_PORT: u16 = 12345;

/// Default preferred capture width in pixels.
pub const DEFAULT_WIDTH: u32 = 640;

/// Default preferred capture height in pixels.
pub const DEFAULT_HEIGHT: u32 = 480;

/// Largest width or height a JPEG frame can carry.
pub const MAX_DIMENSION: u32 = 65_535;

/// Which capture device the server should open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// A V4L2 device by index: `0` means `/dev/video0`.
    Index(u32),
    /// A V4L2 device node by path.
    Path(PathBuf),
    /// The built-in test-pattern camera.
    Synthetic,
}

/// Error returned when a device selector string cannot be parsed.
#[derive(Debug, Error, PartialEq)]
#[error("invalid capture device '{0}': expected an index, a device path, or 'synthetic'")]
pub struct DeviceSelectorError(pub String);

impl FromStr for DeviceSelector {
    type Err = DeviceSelectorError;

    /// Parses `synthetic`, a decimal index such as `0`, or a path such as
    /// `/dev/video2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DeviceSelectorError(s.to_string()));
        }
        if s.eq_ignore_ascii_case("synthetic") || s.eq_ignore_ascii_case("test-pattern") {
            return Ok(DeviceSelector::Synthetic);
        }
        if s.chars().all(|c| c.is_ascii_digit()) {
            return s
                .parse()
                .map(DeviceSelector::Index)
                .map_err(|_| DeviceSelectorError(s.to_string()));
        }
        Ok(DeviceSelector::Path(PathBuf::from(s)))
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Index(index) => write!(f, "/dev/video{index}"),
            DeviceSelector::Path(path) => write!(f, "{}", path.display()),
            DeviceSelector::Synthetic => f.write_str("synthetic"),
        }
    }
}

/// All runtime configuration for the server.
///
/// # Example
///
/// ```rust
/// use snapcam_server::domain::ServerConfig;
///
/// let cfg = ServerConfig::default();
/// assert_eq!(cfg.bind_addr.port(), 12345);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// Address and port the listener binds to.  `0.0.0.0` accepts
    /// connections on every IPv4 interface.
    pub bind_addr: SocketAddr,

    /// The capture device opened at startup.
    pub device: DeviceSelector,

    /// Preferred frame width.  Hardware devices may negotiate another size.
    pub width: u32,

    /// Preferred frame height.
    pub height: u32,
}

impl Default for ServerConfig {
    /// | Field     | Default         |
    /// |-----------|-----------------|
    /// | bind_addr | `0.0.0.0:12345` |
    /// | device    | index `0`       |
    /// | width     | 640             |
    /// | height    | 480             |
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            device: DeviceSelector::Index(0),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
