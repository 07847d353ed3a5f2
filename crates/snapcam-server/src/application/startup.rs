//! Server startup and shutdown sequence.
//!
//! Order matters:
//!
//! 1. Open the capture device.  If this fails the server stops here and
//!    never binds its port, so a client can never reach a server that has no
//!    camera.
//! 2. Log the host's LAN address (best effort).
//! 3. Bind the listener.
//! 4. Serve until the shutdown flag is cleared.
//! 5. Close the device.

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use snapcam_core::{CaptureError, CaptureGate, CaptureSource, FrameEncoder};
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::domain::ServerConfig;
use crate::infrastructure::camera::build_capture_source;
use crate::infrastructure::encoder::JpegFrameEncoder;
use crate::infrastructure::network::local_addr::{local_ipv4_address, ADDRESS_UNAVAILABLE};
use crate::infrastructure::network::serve;

/// Fatal errors that stop the server before it starts serving.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("cannot start without a camera: {0}")]
    DeviceOpen(#[source] CaptureError),

    #[error("bind failed on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A server whose device is open and whose listener is bound.
pub struct Server {
    listener: TcpListener,
    gate: Arc<CaptureGate>,
    local_addr: SocketAddr,
}

impl Server {
    /// Builds the capture source named in `config` with the JPEG encoder and
    /// starts the server.
    pub async fn from_config(config: &ServerConfig) -> Result<Self, StartupError> {
        let source = build_capture_source(&config.device, config.width, config.height);
        Self::start(config, source, Box::new(JpegFrameEncoder::new())).await
    }

    /// Opens the device, then binds the listener.
    ///
    /// # Errors
    ///
    /// - [`StartupError::DeviceOpen`] if the device cannot be opened.  No
    ///   socket is bound in that case.
    /// - [`StartupError::Bind`] if the address is unavailable.  The device is
    ///   closed again before returning.
    pub async fn start(
        config: &ServerConfig,
        source: Box<dyn CaptureSource>,
        encoder: Box<dyn FrameEncoder>,
    ) -> Result<Self, StartupError> {
        let gate = CaptureGate::open(source, encoder).map_err(StartupError::DeviceOpen)?;

        match local_ipv4_address() {
            Ok(ip) => info!("server IP address: {ip}"),
            Err(e) => warn!("server IP address: {ADDRESS_UNAVAILABLE} ({e})"),
        }

        let listener = match TcpListener::bind(config.bind_addr).await {
            Ok(listener) => listener,
            Err(source) => {
                gate.close();
                return Err(StartupError::Bind {
                    addr: config.bind_addr,
                    source,
                });
            }
        };
        let local_addr = listener.local_addr().map_err(|source| StartupError::Bind {
            addr: config.bind_addr,
            source,
        })?;
        info!("listening on {local_addr}");

        Ok(Self {
            listener,
            gate: Arc::new(gate),
            local_addr,
        })
    }

    /// The address actually bound (useful when the configured port is 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn gate(&self) -> Arc<CaptureGate> {
        Arc::clone(&self.gate)
    }

    /// Serves clients until `running` is cleared, then closes the device.
    pub async fn run(self, running: Arc<AtomicBool>) {
        serve(self.listener, Arc::clone(&self.gate), running).await;
        self.gate.close();
        info!(
            "server stopped after serving {} photo(s)",
            self.gate.frames_served()
        );
    }
}
