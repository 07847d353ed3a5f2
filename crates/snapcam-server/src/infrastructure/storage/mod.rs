//! Storage infrastructure: the optional TOML configuration file.
//!
//! The server keeps no state on disk.  The only file it reads is the config
//! file named by `--config`, layered between built-in defaults and the
//! command line.

pub mod config_file;

pub use config_file::{load_config_file, parse_config, ConfigError, FileConfig};
