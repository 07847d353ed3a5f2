//! Capture sources for the server.
//!
//! - **`synthetic`** – a built-in moving test pattern, always available.
//! - **`v4l2`** – real USB/V4L2 cameras (feature: `camera-v4l`).
//!
//! [`build_capture_source`] maps a [`DeviceSelector`] to a source.  Nothing is
//! opened here: the [`snapcam_core::CaptureGate`] opens the device at startup
//! so that an open failure aborts the server before it binds its port.

pub mod synthetic;
#[cfg(feature = "camera-v4l")]
pub mod v4l2;

pub use synthetic::SyntheticCamera;
#[cfg(feature = "camera-v4l")]
pub use v4l2::V4lCamera;

use snapcam_core::{CaptureError, CaptureSource, Frame};

use crate::domain::DeviceSelector;

/// Builds the (unopened) capture source for `device`.
pub fn build_capture_source(
    device: &DeviceSelector,
    width: u32,
    height: u32,
) -> Box<dyn CaptureSource> {
    match device {
        DeviceSelector::Synthetic => Box::new(SyntheticCamera::new(width, height)),
        #[cfg(feature = "camera-v4l")]
        DeviceSelector::Index(_) | DeviceSelector::Path(_) => {
            Box::new(V4lCamera::new(device.to_string(), width, height))
        }
        #[cfg(not(feature = "camera-v4l"))]
        DeviceSelector::Index(_) | DeviceSelector::Path(_) => {
            Box::new(UnsupportedCamera::new(device.to_string()))
        }
    }
}

/// Stand-in for a hardware device when the server was built without any
/// hardware backend.  It refuses to open, which aborts startup.
pub struct UnsupportedCamera {
    device: String,
}

impl UnsupportedCamera {
    pub fn new(device: String) -> Self {
        Self { device }
    }
}

impl CaptureSource for UnsupportedCamera {
    fn open(&mut self) -> Result<(), CaptureError> {
        Err(CaptureError::OpenFailed {
            device: self.device.clone(),
            reason: "built without the `camera-v4l` feature; use --device synthetic or rebuild \
                     with --features camera-v4l"
                .to_string(),
        })
    }

    fn is_open(&self) -> bool {
        false
    }

    fn grab_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        Err(CaptureError::DeviceUnavailable)
    }

    fn close(&mut self) {}

    fn describe(&self) -> String {
        self.device.clone()
    }
}
