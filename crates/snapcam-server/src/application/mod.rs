//! Application layer for snapcam-server.
//!
//! Orchestrates the server's lifetime: it knows *what* happens at startup and
//! shutdown and in which order, and delegates *how* to the infrastructure
//! layer.
//!
//! # What does NOT belong here?
//!
//! - Reading sockets or parsing requests (that is infrastructure/network)
//! - Talking to camera drivers (that is infrastructure/camera)

pub mod startup;

pub use startup::{Server, StartupError};
