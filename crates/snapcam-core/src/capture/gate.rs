//! CaptureGate: exclusive, serialised access to the single camera.
//!
//! Every connection handler shares one `Arc<CaptureGate>`.  A call to
//! [`CaptureGate::acquire_frame`] holds the gate's mutex for the whole
//! grab+encode sequence, so two handlers can never interleave device
//! operations or observe each other's frames.
//!
//! The mutex is a blocking `std::sync::Mutex`: callers on an async runtime
//! are expected to enter the gate from a blocking thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::{CaptureError, CaptureSource, FrameEncoder};

/// The device and encoder, only reachable through the gate's lock.
struct GateState {
    source: Box<dyn CaptureSource>,
    encoder: Box<dyn FrameEncoder>,
}

/// Serialises all capture+encode operations on one device.
pub struct CaptureGate {
    state: Mutex<GateState>,
    frames_served: AtomicU64,
}

impl CaptureGate {
    /// Wraps an already-prepared source and encoder without opening the
    /// device.
    pub fn new(source: Box<dyn CaptureSource>, encoder: Box<dyn FrameEncoder>) -> Self {
        Self {
            state: Mutex::new(GateState { source, encoder }),
            frames_served: AtomicU64::new(0),
        }
    }

    /// Opens the device and returns a gate guarding it.
    ///
    /// # Errors
    ///
    /// Returns the source's [`CaptureError::OpenFailed`] if the device cannot
    /// be opened.  The server treats this as fatal and never binds its port.
    pub fn open(
        mut source: Box<dyn CaptureSource>,
        encoder: Box<dyn FrameEncoder>,
    ) -> Result<Self, CaptureError> {
        source.open()?;
        info!(
            "capture device {} opened ({} encoder)",
            source.describe(),
            encoder.format_name()
        );
        Ok(Self::new(source, encoder))
    }

    /// Captures and encodes exactly one frame.
    ///
    /// Blocks until the gate is free, then grabs and encodes while holding
    /// it.  No frame is cached between calls.
    ///
    /// # Errors
    ///
    /// - [`CaptureError::DeviceUnavailable`] if the device is not open.
    /// - [`CaptureError::EmptyFrame`] if the device produced nothing usable.
    /// - [`CaptureError::Grab`] / [`CaptureError::Encode`] on driver or codec
    ///   failure.
    ///
    /// All of these are per-request failures.
    pub fn acquire_frame(&self) -> Result<Vec<u8>, CaptureError> {
        let mut state = self.lock();

        if !state.source.is_open() {
            return Err(CaptureError::DeviceUnavailable);
        }

        let frame = state
            .source
            .grab_frame()?
            .filter(|frame| !frame.is_empty())
            .ok_or(CaptureError::EmptyFrame)?;

        let encoded = state.encoder.encode(&frame)?;
        drop(state);

        let served = self.frames_served.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(
            "captured {}x{} frame, {} encoded bytes (frame #{served})",
            frame.width(),
            frame.height(),
            encoded.len()
        );
        Ok(encoded)
    }

    /// Returns `true` while the guarded device is open.
    pub fn is_open(&self) -> bool {
        self.lock().source.is_open()
    }

    /// Releases the device.  Calling this more than once is harmless.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.source.is_open() {
            state.source.close();
            info!("capture device {} released", state.source.describe());
        }
    }

    /// Number of frames successfully captured and encoded so far.
    pub fn frames_served(&self) -> u64 {
        self.frames_served.load(Ordering::Relaxed)
    }

    /// Locks the state, recovering from a capture that panicked while
    /// holding the lock.  The device itself decides whether it still works.
    fn lock(&self) -> MutexGuard<'_, GateState> {
        self.state.lock().unwrap_or_else(|poisoned: PoisonError<_>| {
            warn!("capture gate lock was poisoned by a panicked capture; recovering");
            poisoned.into_inner()
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
