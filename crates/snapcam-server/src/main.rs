//! snapcam server: entry point.
//!
//! Opens one camera, listens on a TCP port and answers every `TAKE_PHOTO`
//! request with a length-prefixed JPEG.
//!
//! # Usage
//!
//! ```text
//! snapcam-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>     TOML config file
//!   --port   <PORT>     TCP port to listen on [default: 12345]
//!   --bind   <IP>       Address to bind [default: 0.0.0.0]
//!   --device <DEVICE>   Camera index, device path, or `synthetic` [default: 0]
//!   --width  <PIXELS>   Preferred frame width [default: 640]
//!   --height <PIXELS>   Preferred frame height [default: 480]
//! ```
//!
//! # Configuration precedence
//!
//! Command line (or its environment variable) > config file > built-in
//! default.
//!
//! | Variable          | Flag       |
//! |-------------------|------------|
//! | `SNAPCAM_CONFIG`  | `--config` |
//! | `SNAPCAM_PORT`    | `--port`   |
//! | `SNAPCAM_BIND`    | `--bind`   |
//! | `SNAPCAM_DEVICE`  | `--device` |
//! | `SNAPCAM_WIDTH`   | `--width`  |
//! | `SNAPCAM_HEIGHT`  | `--height` |
//!
//! # Exit status
//!
//! Non-zero if the camera cannot be opened or the port cannot be bound.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use snapcam_server::application::Server;
use snapcam_server::domain::{DeviceSelector, ServerConfig, MAX_DIMENSION};
use snapcam_server::infrastructure::storage::load_config_file;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Network camera: answers `TAKE_PHOTO` with a single JPEG frame.
///
/// Every option is optional.  Unset options fall back to the config file, then
/// to the built-in defaults.
#[derive(Debug, Parser)]
#[command(
    name = "snapcam-server",
    about = "TCP server that captures one camera frame per TAKE_PHOTO request",
    version
)]
struct Cli {
    /// TOML config file with `[server]` and `[camera]` tables.
    #[arg(long, env = "SNAPCAM_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port to listen on.
    #[arg(long, env = "SNAPCAM_PORT")]
    port: Option<u16>,

    /// IP address to bind.  `0.0.0.0` accepts clients on every interface.
    #[arg(long, env = "SNAPCAM_BIND")]
    bind: Option<IpAddr>,

    /// Camera to open: an index (`0` = `/dev/video0`), a device path, or
    /// `synthetic` for the built-in test pattern.
    #[arg(long, env = "SNAPCAM_DEVICE")]
    device: Option<DeviceSelector>,

    /// Preferred frame width in pixels, 1 to 65535.
    #[arg(long, env = "SNAPCAM_WIDTH", value_parser = clap::value_parser!(u32).range(1..=MAX_DIMENSION as i64))]
    width: Option<u32>,

    /// Preferred frame height in pixels, 1 to 65535.
    #[arg(long, env = "SNAPCAM_HEIGHT", value_parser = clap::value_parser!(u32).range(1..=MAX_DIMENSION as i64))]
    height: Option<u32>,
}

impl Cli {
    /// Layers defaults, the config file and the command line into a
    /// [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or is invalid.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = ServerConfig::default();

        if let Some(path) = &self.config {
            let file = load_config_file(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?;
            file.apply_to(&mut config)
                .with_context(|| format!("invalid settings in {}", path.display()))?;
        }

        let ip = self.bind.unwrap_or(config.bind_addr.ip());
        let port = self.port.unwrap_or(config.bind_addr.port());
        config.bind_addr = SocketAddr::new(ip, port);
        if let Some(device) = self.device {
            config.device = device;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `RUST_LOG` selects the level; `info` when unset or invalid.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_server_config()?;
    info!(
        "starting snapcam-server (device {}, {}x{})",
        config.device, config.width, config.height
    );

    // The device is opened before the port is bound; an error here exits
    // non-zero without ever accepting a client.
    let server = Server::from_config(&config)
        .await
        .context("server startup failed")?;

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running_clone.store(false, Ordering::Relaxed);
        }
    });

    server.run(running).await;
    info!("snapcam-server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut full = vec!["snapcam-server"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_no_arguments_gives_defaults() {
        let config = parse(&[]).into_server_config().unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn test_port_and_bind_flags() {
        let config = parse(&["--port", "8080", "--bind", "127.0.0.1"])
            .into_server_config()
            .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_device_flag_accepts_synthetic() {
        let config = parse(&["--device", "synthetic"]).into_server_config().unwrap();
        assert_eq!(config.device, DeviceSelector::Synthetic);
    }

    #[test]
    fn test_zero_width_is_rejected_by_parser() {
        let result = Cli::try_parse_from(["snapcam-server", "--width", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_dimensions_above_jpeg_limit_are_rejected_by_parser() {
        assert!(Cli::try_parse_from(["snapcam-server", "--width", "70000"]).is_err());
        assert!(Cli::try_parse_from(["snapcam-server", "--height", "65536"]).is_err());
    }

    #[test]
    fn test_largest_jpeg_dimension_is_accepted() {
        let config = parse(&["--width", "65535", "--height", "65535"])
            .into_server_config()
            .unwrap();
        assert_eq!((config.width, config.height), (MAX_DIMENSION, MAX_DIMENSION));
    }

    #[test]
    fn test_cli_overrides_config_file() {
        // Arrange
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nport = 9000\nbind_address = \"127.0.0.1\"\n[camera]\nwidth = 320"
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        // Act
        let config = parse(&["--config", &path, "--port", "9100"])
            .into_server_config()
            .unwrap();

        // Assert: port from the CLI, address and width from the file
        assert_eq!(config.bind_addr, "127.0.0.1:9100".parse::<SocketAddr>().unwrap());
        assert_eq!(config.width, 320);
        assert_eq!(config.height, 480);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let result = parse(&["--config", "/nonexistent/snapcam.toml"]).into_server_config();
        assert!(result.is_err());
    }
}
