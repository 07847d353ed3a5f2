//! Accept loop: one Tokio task per client.
//!
//! The loop never waits on a session.  It accepts a connection, spawns its
//! handler into a [`JoinSet`] and goes straight back to `accept()`, so one
//! slow client (or one waiting on the capture gate) never delays the others.
//!
//! Shutdown is cooperative: `accept()` runs under a short timeout so the loop
//! can notice when the shared `running` flag is cleared.  Sessions still open
//! at that point are aborted and drained before [`serve`] returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use snapcam_core::CaptureGate;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info};

use super::connection::handle_connection;

/// How long one `accept()` may wait before the shutdown flag is re-checked.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Accepts clients on `listener` until `running` is set to `false`.
///
/// Accept errors (for example, running out of file descriptors) are logged
/// and the loop continues.
pub async fn serve(listener: TcpListener, gate: Arc<CaptureGate>, running: Arc<AtomicBool>) {
    let mut sessions = JoinSet::new();

    loop {
        // Checked once per iteration, so shutdown lags by at most one
        // accept interval.
        if !running.load(Ordering::Relaxed) {
            info!("shutdown flag set; stopping accept loop");
            break;
        }

        // Reap finished sessions so the set does not grow without bound.
        // Handlers log their own I/O errors; only a panic surfaces here.
        while let Some(finished) = sessions.try_join_next() {
            if let Err(e) = finished {
                if e.is_panic() {
                    error!("session task panicked: {e}");
                }
            }
        }

        // A bare accept() would block until the next client and never see
        // the flag; the timeout bounds each wait.
        match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
            Ok(Ok((stream, peer_addr))) => {
                // spawn() returns immediately; the session runs on its own
                // task while the loop goes back to accepting.
                let gate = Arc::clone(&gate);
                sessions.spawn(handle_connection(stream, peer_addr, gate));
            }
            Ok(Err(e)) => {
                // Transient (EMFILE, ECONNABORTED); keep listening.
                error!("accept error: {e}");
            }
            Err(_) => {
                // No client in the last interval; re-check the flag.
            }
        }
    }

    if !sessions.is_empty() {
        info!("closing {} open session(s)", sessions.len());
    }
    // Abort every remaining session and wait for each task to finish, which
    // drops its socket.  The listener itself is dropped on return.
    sessions.shutdown().await;
}
