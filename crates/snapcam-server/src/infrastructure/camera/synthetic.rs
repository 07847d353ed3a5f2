//! Synthetic test-pattern camera.
//!
//! Produces an RGB gradient with a vertical bar that moves a few pixels on
//! every grab, so consecutive photos differ and a viewer can tell them apart.
//! Used for demos, CI and the integration tests; needs no hardware.

use snapcam_core::{CaptureError, CaptureSource, Frame};
use tracing::debug;

use crate::domain::MAX_DIMENSION;

/// Horizontal distance the bar travels per grab, in pixels.
const BAR_STEP: u64 = 8;

pub struct SyntheticCamera {
    width: u32,
    height: u32,
    open: bool,
    frame_count: u64,
}

impl SyntheticCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            open: false,
            frame_count: 0,
        }
    }

    /// Number of frames grabbed since the camera was created.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    fn render(&self) -> Vec<u8> {
        let w = self.width as u64;
        let h = self.height as u64;
        let bar_width = (w / 8).max(1);
        let bar_start = (self.frame_count * BAR_STEP) % w;

        let mut pixels = Vec::with_capacity((w * h * 3) as usize);
        for y in 0..h {
            for x in 0..w {
                let in_bar = (x + w - bar_start) % w < bar_width;
                let r = (x * 255 / w.max(1)) as u8;
                let g = (y * 255 / h.max(1)) as u8;
                let b = if in_bar { 255 } else { 64 };
                pixels.extend_from_slice(&[r, g, b]);
            }
        }
        pixels
    }
}

impl CaptureSource for SyntheticCamera {
    fn open(&mut self) -> Result<(), CaptureError> {
        let valid = 1..=MAX_DIMENSION;
        if !valid.contains(&self.width) || !valid.contains(&self.height) {
            // The encoder refuses anything larger, so fail here instead of on
            // every request.
            return Err(CaptureError::OpenFailed {
                device: self.describe(),
                reason: format!("frame dimensions must be between 1 and {MAX_DIMENSION}"),
            });
        }
        self.open = true;
        debug!("synthetic camera opened at {}x{}", self.width, self.height);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn grab_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        if !self.open {
            return Err(CaptureError::DeviceUnavailable);
        }
        let pixels = self.render();
        self.frame_count += 1;
        Ok(Some(Frame::new(self.width, self.height, pixels)))
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn describe(&self) -> String {
        format!("synthetic {}x{}", self.width, self.height)
    }
}
