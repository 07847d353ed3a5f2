//! Infrastructure layer for the server.
//!
//! Contains the OS-facing adapters: capture devices, the JPEG codec, the TCP
//! listener and per-connection handlers, and the configuration file reader.
//!
//! **Dependency rule**: this layer may depend on `domain` and `snapcam_core`,
//! but MUST NOT import `application`.

pub mod camera;
pub mod encoder;
pub mod network;
pub mod storage;
