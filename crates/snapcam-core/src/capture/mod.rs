//! Capture abstractions: the raw [`Frame`], the device and encoder traits, and
//! the [`CaptureGate`] that serialises access to them.
//!
//! # Testability
//!
//! The [`CaptureSource`] trait lets tests and the server inject synthetic
//! cameras without touching real hardware.  Unit tests in this crate use the
//! `mockall`-generated `MockCaptureSource`.

pub mod gate;

pub use gate::CaptureGate;

use thiserror::Error;

/// Error type for capture operations.
///
/// Every variant except [`CaptureError::OpenFailed`] is a per-request failure:
/// the caller logs it and keeps the connection open.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The device could not be opened at startup.
    #[error("failed to open capture device {device}: {reason}")]
    OpenFailed { device: String, reason: String },

    /// A capture was requested while the device is closed.
    #[error("capture device is not open")]
    DeviceUnavailable,

    /// The device returned no frame, or a frame with no usable pixels.
    #[error("capture device returned an empty frame")]
    EmptyFrame,

    /// The device driver reported an error while grabbing.
    #[error("frame grab failed: {0}")]
    Grab(String),

    /// The grabbed frame could not be encoded.
    #[error("frame encoding failed: {0}")]
    Encode(#[from] EncodeError),
}

/// Error type for frame encoders.
#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
    /// The pixel buffer does not match the frame dimensions.
    #[error("pixel buffer of {actual} bytes does not match a {width}x{height} RGB frame")]
    Dimensions { width: u32, height: u32, actual: usize },

    /// The encoder finished without producing any bytes.
    #[error("encoder produced no output")]
    NoOutput,

    /// The underlying codec library failed.
    #[error("codec error: {0}")]
    Codec(String),
}

/// One raw image sample: packed 8-bit RGB, row-major, no padding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Frame {
    /// Bytes per pixel of the packed RGB layout.
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Creates a frame from packed RGB pixels.
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Number of bytes a `width x height` RGB frame must hold, or `None` on
    /// overflow.
    pub fn expected_len(width: u32, height: u32) -> Option<usize> {
        (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(Self::BYTES_PER_PIXEL)
    }

    /// `true` when the frame carries no pixels or its buffer does not match
    /// its dimensions.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
            || Self::expected_len(self.width, self.height) != Some(self.pixels.len())
    }
}

/// Trait abstracting the camera driver.
///
/// Implementations are only ever called from inside the [`CaptureGate`]'s
/// critical section, so they need not be internally synchronised.
#[cfg_attr(test, mockall::automock)]
pub trait CaptureSource: Send {
    /// Opens the device.  Called once at startup.
    fn open(&mut self) -> Result<(), CaptureError>;
    /// Returns `true` between a successful `open` and `close`.
    fn is_open(&self) -> bool;
    /// Grabs one frame.  `Ok(None)` means the device produced nothing.
    fn grab_frame(&mut self) -> Result<Option<Frame>, CaptureError>;
    /// Releases the device.
    fn close(&mut self);
    /// Human-readable device name for log lines.
    fn describe(&self) -> String;
}

/// Trait abstracting the image codec that turns a [`Frame`] into the bytes
/// sent on the wire.
pub trait FrameEncoder: Send {
    /// Encodes one frame.
    fn encode(&self, frame: &Frame) -> Result<Vec<u8>, EncodeError>;
    /// Short format name for log lines (e.g. `"jpeg"`).
    fn format_name(&self) -> &'static str;
}
