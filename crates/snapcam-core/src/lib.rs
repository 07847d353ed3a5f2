//! # snapcam-core
//!
//! Shared library for snapcam containing the wire protocol and the capture
//! gate that serialises access to the single camera.
//!
//! This crate is used by both the server and the client.  It has no
//! dependencies on sockets, async runtimes, or camera drivers: the server
//! plugs concrete devices and encoders in through the [`CaptureSource`] and
//! [`FrameEncoder`] traits.
//!
//! # Architecture overview
//!
//! snapcam is a tiny network camera: a client opens a TCP connection, sends
//! the ASCII token `TAKE_PHOTO`, and receives one JPEG image in return.
//!
//! - **`protocol`** – How bytes travel over the network.  A request is the
//!   exact command token; a response is a 4-byte native-endian `i32` length
//!   followed by that many payload bytes.
//!
//! - **`capture`** – The [`CaptureGate`], which owns the camera and encoder
//!   behind one mutex so that any number of concurrent connections see a
//!   strictly serial sequence of grab+encode operations.

pub mod capture;
pub mod protocol;

pub use capture::{CaptureError, CaptureGate, CaptureSource, EncodeError, Frame, FrameEncoder};
pub use protocol::{
    decode_length_prefix, decode_response_frame, encode_length_prefix, encode_response_frame,
    Command, ProtocolError,
};
