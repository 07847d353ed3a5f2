//! snapcam-server library crate.
//!
//! A network camera: the server owns one capture device, listens on a TCP
//! port, and answers every `TAKE_PHOTO` request with one length-prefixed JPEG.
//!
//! # Architecture
//!
//! ```text
//! TCP clients  (TAKE_PHOTO → [len:i32][jpeg])
//!         ↕
//! [snapcam-server]
//!   ├── domain/           ServerConfig, DeviceSelector
//!   ├── application/      Startup sequence: open device → bind → serve
//!   └── infrastructure/
//!         ├── camera/     Synthetic and V4L2 capture sources
//!         ├── encoder     JPEG frame encoder
//!         ├── network/    Accept loop, per-connection handler, local address
//!         └── storage/    TOML configuration file
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O.
//! - `application` depends on `domain`, `infrastructure` and `snapcam-core`.
//! - `infrastructure` does the I/O and must not import `application`.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: the startup use case.
pub mod application;

/// Infrastructure layer: devices, codec, sockets and files.
pub mod infrastructure;
