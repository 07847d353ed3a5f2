//! Per-client connection handler.
//!
//! A connection cycles through three states until it closes:
//!
//! ```text
//!            ┌──────────────────────────────────────────┐
//!            ▼                                          │
//!       ┌─────────┐  N>0 bytes  ┌─────────────┐ match ┌─────────┐
//!  ───▶ │ Reading │ ──────────▶ │ Dispatching │ ─────▶│ Writing │
//!       └─────────┘             └─────────────┘       └─────────┘
//!        │ 0 bytes / error        │ no match              │ write error
//!        ▼                        └──▶ Reading            ▼
//!     Closed                                            Closed
//! ```
//!
//! Each read is treated as one complete request: the received bytes must be
//! exactly `TAKE_PHOTO`.  There is no delimiter, so a token split across two
//! reads, or two tokens coalesced into one read, never matches.
//!
//! A failed capture produces no response at all.  The client sees silence and
//! may send the command again on the same connection.

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use snapcam_core::protocol::{encode_length_prefix, Command, READ_BUFFER_SIZE};
use snapcam_core::{CaptureError, CaptureGate};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Errors that end a single connection.  They never affect other clients.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("read failed: {0}")]
    Read(#[source] std::io::Error),
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),
}

/// Identifier attached to every log line of one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub photos_sent: u64,
    pub requests_ignored: u64,
    pub captures_failed: u64,
}

/// One client session over any byte stream.
///
/// Generic over the stream so tests can drive it with an in-memory duplex
/// pipe instead of a socket.
pub struct Connection<S> {
    stream: S,
    gate: Arc<CaptureGate>,
    session: SessionId,
    stats: SessionStats,
    read_buf: [u8; READ_BUFFER_SIZE],
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, gate: Arc<CaptureGate>) -> Self {
        Self {
            stream,
            gate,
            session: SessionId::new(),
            stats: SessionStats::default(),
            read_buf: [0u8; READ_BUFFER_SIZE],
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Serves requests until the peer closes the connection or an I/O error
    /// occurs.
    ///
    /// Returns `Ok(())` on a graceful close (the peer's read side returned
    /// zero bytes).
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::Read`] if receiving fails (including a reset).
    /// - [`ConnectionError::Write`] if sending a photo fails.
    pub async fn run(&mut self) -> Result<(), ConnectionError> {
        loop {
            // One read is one request; there is no framing on the way in.
            let n = self
                .stream
                .read(&mut self.read_buf)
                .await
                .map_err(ConnectionError::Read)?;
            if n == 0 {
                // Orderly shutdown from the peer.
                return Ok(());
            }

            match Command::parse(&self.read_buf[..n]) {
                Some(Command::TakePhoto) => {
                    info!("session {}: TAKE_PHOTO received", self.session);
                    self.take_photo().await?;
                }
                None => {
                    self.stats.requests_ignored += 1;
                    debug!(
                        "session {}: ignoring {n} byte(s) that are not a command",
                        self.session
                    );
                }
            }
        }
    }

    async fn take_photo(&mut self) -> Result<(), ConnectionError> {
        match self.capture().await {
            Ok(jpeg) => self.write_photo(&jpeg).await,
            Err(e) => {
                self.stats.captures_failed += 1;
                warn!("session {}: capture failed, no response sent: {e}", self.session);
                Ok(())
            }
        }
    }

    /// Runs the blocking capture on Tokio's blocking pool so that waiting on
    /// the gate never stalls a runtime worker.
    async fn capture(&self) -> Result<Vec<u8>, CaptureError> {
        // The gate is shared with every other session; the clone moves into
        // the blocking closure, which may park on the mutex for a whole grab.
        let gate = Arc::clone(&self.gate);
        match tokio::task::spawn_blocking(move || gate.acquire_frame()).await {
            Ok(result) => result,
            // The closure panicked or the runtime is shutting down.
            Err(e) => Err(CaptureError::Grab(format!("capture task failed: {e}"))),
        }
    }

    async fn write_photo(&mut self, jpeg: &[u8]) -> Result<(), ConnectionError> {
        let prefix = match encode_length_prefix(jpeg.len()) {
            Ok(prefix) => prefix,
            Err(e) => {
                self.stats.captures_failed += 1;
                warn!("session {}: cannot frame photo, no response sent: {e}", self.session);
                return Ok(());
            }
        };

        // Prefix first, then the payload.  Both go to this session's stream
        // only, so nothing from another client can land between them.
        self.stream
            .write_all(&prefix)
            .await
            .map_err(ConnectionError::Write)?;
        self.stream
            .write_all(jpeg)
            .await
            .map_err(ConnectionError::Write)?;
        self.stream.flush().await.map_err(ConnectionError::Write)?;

        self.stats.photos_sent += 1;
        info!("session {}: sent photo ({} bytes)", self.session, jpeg.len());
        Ok(())
    }
}

/// Task entry point for one accepted client.
///
/// Wraps [`Connection::run`] and logs the outcome, so the inner function can
/// use `?` while this one owns the reporting.
pub async fn handle_connection(stream: TcpStream, peer_addr: SocketAddr, gate: Arc<CaptureGate>) {
    let mut connection = Connection::new(stream, gate);
    let session = connection.session();
    info!("session {session}: client connected from {peer_addr}");

    let result = connection.run().await;
    let stats = connection.stats();
    match result {
        Ok(()) => info!(
            "session {session}: client {peer_addr} disconnected \
             (photos sent: {}, ignored: {}, capture failures: {})",
            stats.photos_sent, stats.requests_ignored, stats.captures_failed
        ),
        Err(e) => warn!(
            "session {session}: connection to {peer_addr} closed with error: {e} \
             (photos sent: {}, ignored: {}, capture failures: {})",
            stats.photos_sent, stats.requests_ignored, stats.captures_failed
        ),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use snapcam_core::protocol::{decode_length_prefix, LENGTH_PREFIX_SIZE, TAKE_PHOTO};
    use snapcam_core::{CaptureSource, EncodeError, Frame, FrameEncoder};
    use tokio::io::{duplex, DuplexStream};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    use super::*;

    /// Returns a 2x1 frame whose first byte is the grab number.
    struct CountingSource {
        grabs: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
    }

    impl CaptureSource for CountingSource {
        fn open(&mut self) -> Result<(), CaptureError> {
            Ok(())
        }
        fn is_open(&self) -> bool {
            true
        }
        fn grab_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(CaptureError::Grab("lens cap on".to_string()));
            }
            let n = self.grabs.fetch_add(1, Ordering::SeqCst) as u8;
            Ok(Some(Frame::new(2, 1, vec![n, 0, 0, 0, 0, 0])))
        }
        fn close(&mut self) {}
        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    /// Passes the raw pixels through as the "encoded" payload.
    struct RawEncoder;

    impl FrameEncoder for RawEncoder {
        fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError> {
            Ok(frame.pixels().to_vec())
        }
        fn format_name(&self) -> &'static str {
            "raw"
        }
    }

    struct Harness {
        client: DuplexStream,
        server: Connection<DuplexStream>,
        grabs: Arc<AtomicUsize>,
        fail: Arc<AtomicBool>,
    }

    fn harness() -> Harness {
        let grabs = Arc::new(AtomicUsize::new(0));
        let fail = Arc::new(AtomicBool::new(false));
        let source = CountingSource {
            grabs: Arc::clone(&grabs),
            fail: Arc::clone(&fail),
        };
        let gate = CaptureGate::open(Box::new(source), Box::new(RawEncoder)).unwrap();
        let (client, server_side) = duplex(64 * 1024);
        Harness {
            client,
            server: Connection::new(server_side, Arc::new(gate)),
            grabs,
            fail,
        }
    }

    /// Connected loopback pair: `(client, accepted)`.
    async fn tcp_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (accepted, _) = listener.accept().await.unwrap();
        (client, accepted)
    }

    fn counting_gate() -> Arc<CaptureGate> {
        let source = CountingSource {
            grabs: Arc::new(AtomicUsize::new(0)),
            fail: Arc::new(AtomicBool::new(false)),
        };
        Arc::new(CaptureGate::open(Box::new(source), Box::new(RawEncoder)).unwrap())
    }

    async fn read_photo(client: &mut DuplexStream) -> Vec<u8> {
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        client.read_exact(&mut prefix).await.unwrap();
        let len = decode_length_prefix(&prefix).unwrap();
        let mut payload = vec![0u8; len];
        client.read_exact(&mut payload).await.unwrap();
        payload
    }

    #[tokio::test]
    async fn test_take_photo_sends_length_prefixed_payload() {
        // Arrange
        let Harness {
            mut client,
            mut server,
            ..
        } = harness();
        let task = tokio::spawn(async move {
            let result = server.run().await;
            (result, server.stats())
        });

        // Act
        client.write_all(TAKE_PHOTO).await.unwrap();
        let payload = read_photo(&mut client).await;
        drop(client);
        let (result, stats) = task.await.unwrap();

        // Assert
        assert_eq!(payload.len(), 6);
        assert_eq!(payload[0], 0, "first grab");
        assert!(result.is_ok(), "graceful close must be Ok");
        assert_eq!(stats.photos_sent, 1);
    }

    #[tokio::test]
    async fn test_two_requests_are_answered_in_order() {
        let Harness {
            mut client,
            mut server,
            grabs,
            ..
        } = harness();
        let task = tokio::spawn(async move { server.run().await });

        client.write_all(TAKE_PHOTO).await.unwrap();
        let first = read_photo(&mut client).await;
        client.write_all(TAKE_PHOTO).await.unwrap();
        let second = read_photo(&mut client).await;
        drop(client);

        assert!(task.await.unwrap().is_ok());
        assert_eq!(first[0], 0);
        assert_eq!(second[0], 1);
        assert_eq!(grabs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_bytes_get_no_response_and_connection_stays_open() {
        // Arrange
        let Harness {
            mut client,
            mut server,
            grabs,
            ..
        } = harness();
        let task = tokio::spawn(async move {
            let result = server.run().await;
            (result, server.stats())
        });

        // Act: a trailing newline breaks the exact match
        client.write_all(b"TAKE_PHOTO\n").await.unwrap();
        let mut buf = [0u8; 1];
        let silence = timeout(Duration::from_millis(100), client.read(&mut buf)).await;

        // Assert: nothing came back, and a valid request still works
        assert!(silence.is_err(), "server must not answer unknown bytes");
        assert_eq!(grabs.load(Ordering::SeqCst), 0);

        client.write_all(TAKE_PHOTO).await.unwrap();
        let payload = read_photo(&mut client).await;
        assert_eq!(payload.len(), 6);

        drop(client);
        let (result, stats) = task.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(stats.requests_ignored, 1);
        assert_eq!(stats.photos_sent, 1);
    }

    #[tokio::test]
    async fn test_failed_capture_sends_nothing_and_keeps_connection() {
        // Arrange
        let Harness {
            mut client,
            mut server,
            fail,
            ..
        } = harness();
        fail.store(true, Ordering::SeqCst);
        let task = tokio::spawn(async move {
            let result = server.run().await;
            (result, server.stats())
        });

        // Act
        client.write_all(TAKE_PHOTO).await.unwrap();
        let mut buf = [0u8; 1];
        let silence = timeout(Duration::from_millis(100), client.read(&mut buf)).await;

        // Assert
        assert!(silence.is_err(), "a failed capture must produce no bytes");

        fail.store(false, Ordering::SeqCst);
        client.write_all(TAKE_PHOTO).await.unwrap();
        assert_eq!(read_photo(&mut client).await.len(), 6);

        drop(client);
        let (result, stats) = task.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(stats.captures_failed, 1);
        assert_eq!(stats.photos_sent, 1);
    }

    #[tokio::test]
    async fn test_immediate_close_is_graceful() {
        let Harness {
            client, mut server, ..
        } = harness();
        drop(client);

        let result = server.run().await;

        assert!(result.is_ok());
        assert_eq!(server.stats(), SessionStats::default());
    }

    #[tokio::test]
    async fn test_write_to_closed_peer_is_a_write_error() {
        // Arrange
        let (mut client, server_side) = duplex(64);
        let mut server = Connection::new(server_side, counting_gate());
        let task = tokio::spawn(async move { server.run().await });

        // Act: send the request then hang up before the server runs; the
        // request stays buffered but the reply has nowhere to go
        client.write_all(TAKE_PHOTO).await.unwrap();
        drop(client);
        let result = task.await.unwrap();

        // Assert
        assert!(matches!(result, Err(ConnectionError::Write(_))));
    }

    #[tokio::test]
    async fn test_peer_reset_over_tcp_is_a_read_error() {
        // Arrange: zero linger turns the close into an RST
        let (client, accepted) = tcp_pair().await;
        let mut server = Connection::new(accepted, counting_gate());
        client.set_zero_linger().unwrap();

        // Act
        drop(client);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let result = timeout(Duration::from_secs(2), server.run()).await.unwrap();

        // Assert
        match result {
            Err(ConnectionError::Read(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::ConnectionReset);
            }
            other => panic!("expected a read error from the reset, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_peer_close_over_tcp_is_graceful() {
        // Arrange
        let (client, accepted) = tcp_pair().await;
        let mut server = Connection::new(accepted, counting_gate());

        // Act: a plain drop sends FIN
        drop(client);
        let result = timeout(Duration::from_secs(2), server.run()).await.unwrap();

        // Assert
        assert!(result.is_ok(), "graceful close must be Ok, got {result:?}");
        assert_eq!(server.stats(), SessionStats::default());
    }

    #[tokio::test]
    async fn test_photo_then_close_over_tcp() {
        // Arrange
        let (mut client, accepted) = tcp_pair().await;
        let mut server = Connection::new(accepted, counting_gate());
        let task = tokio::spawn(async move {
            let result = server.run().await;
            (result, server.stats())
        });

        // Act
        client.write_all(TAKE_PHOTO).await.unwrap();
        let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
        client.read_exact(&mut prefix).await.unwrap();
        let mut payload = vec![0u8; decode_length_prefix(&prefix).unwrap()];
        client.read_exact(&mut payload).await.unwrap();
        drop(client);
        let (result, stats) = task.await.unwrap();

        // Assert
        assert_eq!(payload.len(), 6);
        assert!(result.is_ok());
        assert_eq!(stats.photos_sent, 1);
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
    }
}
