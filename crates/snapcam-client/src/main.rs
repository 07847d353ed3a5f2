//! snapcam client: entry point.
//!
//! Connects to a snapcam server, requests one or more photos over a single
//! connection and writes them to disk as `photo-0001.jpg`, `photo-0002.jpg`,
//! and so on.
//!
//! ```text
//! snapcam-client --server 192.168.1.20:12345 --count 3 --output-dir shots
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use snapcam_client::PhotoClient;

/// Fetches photos from a snapcam server.
#[derive(Debug, Parser)]
#[command(
    name = "snapcam-client",
    about = "Requests photos from a snapcam server and saves them as JPEG files",
    version
)]
struct Cli {
    /// Server address as `host:port`.
    #[arg(long, default_value = "127.0.0.1:12345", env = "SNAPCAM_SERVER")]
    server: String,

    /// Number of photos to take over one connection.
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    count: u32,

    /// Directory the JPEG files are written to.  Created if missing.
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Seconds to wait for each response before giving up.
    #[arg(long, default_value_t = 5)]
    timeout: u64,
}

fn photo_path(dir: &std::path::Path, index: u32) -> PathBuf {
    dir.join(format!("photo-{index:04}.jpg"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    tokio::fs::create_dir_all(&cli.output_dir)
        .await
        .with_context(|| format!("cannot create {}", cli.output_dir.display()))?;

    let mut client = PhotoClient::connect(&cli.server)
        .await?
        .with_response_timeout(Duration::from_secs(cli.timeout));
    info!("connected to {}", client.peer_addr());

    for index in 1..=cli.count {
        let photo = client
            .take_photo()
            .await
            .with_context(|| format!("photo {index} of {} failed", cli.count))?;
        let path = photo_path(&cli.output_dir, index);
        tokio::fs::write(&path, &photo)
            .await
            .with_context(|| format!("cannot write {}", path.display()))?;
        info!("saved {} ({} bytes)", path.display(), photo.len());
    }
    Ok(())
}
