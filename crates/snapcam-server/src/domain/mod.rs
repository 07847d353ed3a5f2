//! Domain layer for snapcam-server.
//!
//! Pure configuration types with no dependency on sockets, devices or files.
//! The binary and the storage layer are responsible for populating them.

pub mod config;

pub use config::{DeviceSelector, ServerConfig, MAX_DIMENSION};
