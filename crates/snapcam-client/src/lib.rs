//! snapcam-client library crate.
//!
//! A small client for the snapcam server.  It sends `TAKE_PHOTO` and reads
//! back one `[len:i32][jpeg]` response.
//!
//! The server stays silent when a capture fails, so every request carries a
//! response timeout; an expired timeout surfaces as
//! [`ClientError::NoResponse`] rather than hanging forever.

pub mod connection;

pub use connection::{ClientError, PhotoClient, DEFAULT_MAX_PAYLOAD, DEFAULT_RESPONSE_TIMEOUT};
