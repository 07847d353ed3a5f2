//! TCP connection to a snapcam server.
//!
//! TCP is a stream protocol: a response may arrive split over many reads.
//! The reader therefore reads the fixed-size length prefix with
//! `read_exact`, then reads exactly that many payload bytes.

use std::net::SocketAddr;
use std::time::Duration;

use snapcam_core::protocol::{decode_length_prefix, Command, LENGTH_PREFIX_SIZE};
use snapcam_core::ProtocolError;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// How long [`PhotoClient::take_photo`] waits for a complete response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest payload the client accepts (64 MiB).  Guards against allocating
/// whatever a corrupted length prefix claims.
pub const DEFAULT_MAX_PAYLOAD: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server sent nothing in time.  It does not answer failed captures.
    #[error("no response within {0:?} (the server may have failed to capture)")]
    NoResponse(Duration),

    #[error("malformed response: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("response of {len} bytes exceeds the {max}-byte limit")]
    PayloadTooLarge { len: usize, max: usize },

    /// The server closed the connection mid-response or before answering.
    #[error("server closed the connection")]
    Closed,
}

/// An open connection that can request any number of photos in sequence.
pub struct PhotoClient {
    stream: TcpStream,
    peer: SocketAddr,
    response_timeout: Duration,
    max_payload: usize,
}

impl PhotoClient {
    /// Connects to `addr` (`host:port`).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Connect`] if the server is unreachable.
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let connect_err = |source| ClientError::Connect {
            addr: addr.to_string(),
            source,
        };
        let stream = TcpStream::connect(addr).await.map_err(connect_err)?;
        let peer = stream.peer_addr().map_err(connect_err)?;
        debug!("connected to {peer}");
        Ok(Self {
            stream,
            peer,
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            max_payload: DEFAULT_MAX_PAYLOAD,
        })
    }

    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }

    pub fn with_max_payload(mut self, max_payload: usize) -> Self {
        self.max_payload = max_payload;
        self
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Requests one photo and returns its JPEG bytes.
    ///
    /// After [`ClientError::NoResponse`] a late answer may still arrive and
    /// would be read as the reply to the next request, so callers should
    /// reconnect before retrying.
    pub async fn take_photo(&mut self) -> Result<Vec<u8>, ClientError> {
        self.stream.write_all(Command::TakePhoto.as_bytes()).await?;
        self.stream.flush().await?;

        match timeout(self.response_timeout, self.read_response()).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::NoResponse(self.response_timeout)),
        }
    }

    async fn read_response(&mut self) -> Result<Vec<u8>, ClientError> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        read_exact_or_closed(&mut self.stream, &mut prefix).await?;

        let len = decode_length_prefix(&prefix)?;
        if len > self.max_payload {
            return Err(ClientError::PayloadTooLarge {
                len,
                max: self.max_payload,
            });
        }

        let mut payload = vec![0u8; len];
        read_exact_or_closed(&mut self.stream, &mut payload).await?;
        debug!("received {len}-byte photo from {}", self.peer);
        Ok(payload)
    }
}

async fn read_exact_or_closed(stream: &mut TcpStream, buf: &mut [u8]) -> Result<(), ClientError> {
    match stream.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(ClientError::Closed),
        Err(e) => Err(ClientError::Io(e)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
