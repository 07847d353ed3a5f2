//! V4L2 capture source for USB cameras on Linux.
//!
//! Negotiates YUYV (the format nearly every UVC webcam offers) or packed
//! RGB3, memory-maps a small ring of driver buffers and converts each
//! dequeued buffer into a packed RGB [`Frame`].

use ouroboros::self_referencing;
use snapcam_core::{CaptureError, CaptureSource, Frame};
use tracing::{info, warn};
use v4l::buffer::Type;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

/// Number of memory-mapped buffers requested from the driver.
const BUFFER_COUNT: u32 = 4;

/// Pixel layouts this backend can convert to RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelFormat {
    Yuyv,
    Rgb24,
}

impl PixelFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        match &fourcc.repr {
            b"YUYV" => Some(PixelFormat::Yuyv),
            b"RGB3" => Some(PixelFormat::Rgb24),
            _ => None,
        }
    }
}

#[self_referencing]
struct StreamState {
    device: Device,
    #[borrows(mut device)]
    #[covariant]
    stream: MmapStream<'this, Device>,
}

pub struct V4lCamera {
    path: String,
    width: u32,
    height: u32,
    format: PixelFormat,
    state: Option<StreamState>,
}

impl V4lCamera {
    /// Creates an unopened camera for `path` with a preferred frame size.
    pub fn new(path: String, width: u32, height: u32) -> Self {
        Self {
            path,
            width,
            height,
            format: PixelFormat::Yuyv,
            state: None,
        }
    }

    fn open_failed(&self, reason: impl ToString) -> CaptureError {
        CaptureError::OpenFailed {
            device: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl CaptureSource for V4lCamera {
    fn open(&mut self) -> Result<(), CaptureError> {
        let device = Device::with_path(&self.path).map_err(|e| self.open_failed(e))?;
        let mut requested = device.format().map_err(|e| self.open_failed(e))?;
        requested.width = self.width;
        requested.height = self.height;
        requested.fourcc = FourCC::new(b"YUYV");

        let negotiated = match device.set_format(&requested) {
            Ok(format) => format,
            Err(e) => {
                warn!("could not set format on {}: {e}", self.path);
                device.format().map_err(|e| self.open_failed(e))?
            }
        };

        self.format = PixelFormat::from_fourcc(negotiated.fourcc).ok_or_else(|| {
            self.open_failed(format!("unsupported pixel format {}", negotiated.fourcc))
        })?;
        self.width = negotiated.width;
        self.height = negotiated.height;

        let state = StreamStateTryBuilder {
            device,
            stream_builder: |device| MmapStream::with_buffers(device, Type::VideoCapture, BUFFER_COUNT),
        }
        .try_build()
        .map_err(|e| self.open_failed(e))?;
        self.state = Some(state);

        info!(
            "opened {} at {}x{} ({:?})",
            self.path, self.width, self.height, self.format
        );
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.is_some()
    }

    fn grab_frame(&mut self) -> Result<Option<Frame>, CaptureError> {
        let state = self.state.as_mut().ok_or(CaptureError::DeviceUnavailable)?;
        let (width, height, format) = (self.width, self.height, self.format);

        state.with_stream_mut(|stream| {
            let (buf, meta) = stream
                .next()
                .map_err(|e| CaptureError::Grab(e.to_string()))?;
            let used = (meta.bytesused as usize).min(buf.len());
            if used == 0 {
                return Ok(None);
            }
            let pixels = match format {
                PixelFormat::Yuyv => yuyv_to_rgb(&buf[..used], width, height),
                PixelFormat::Rgb24 => Some(buf[..used].to_vec()),
            };
            Ok(pixels.map(|p| Frame::new(width, height, p)))
        })
    }

    fn close(&mut self) {
        // Dropping the stream unmaps the buffers and stops streaming before
        // the device handle is closed.
        self.state = None;
    }

    fn describe(&self) -> String {
        self.path.clone()
    }
}

/// Converts packed YUYV 4:2:2 to packed RGB.  Returns `None` when the buffer
/// is shorter than a `width x height` image.
fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Option<Vec<u8>> {
    let pixel_count = (width as usize).checked_mul(height as usize)?;
    let expected = pixel_count.checked_mul(2)?;
    if pixel_count == 0 || yuyv.len() < expected {
        return None;
    }

    let mut rgb = Vec::with_capacity(pixel_count * 3);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for y in [chunk[0], chunk[2]] {
            let y = y as f32;
            rgb.push(clamp_to_u8(y + 1.402 * v));
            rgb.push(clamp_to_u8(y - 0.344_136 * u - 0.714_136 * v));
            rgb.push(clamp_to_u8(y + 1.772 * u));
        }
    }
    Some(rgb)
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
