//! TCP networking for the photo server.
//!
//! - [`listener`] – accept loop, one Tokio task per client.
//! - [`connection`] – per-client read → dispatch → write state machine.
//! - [`local_addr`] – best-effort discovery of the host's LAN address for the
//!   startup banner.

pub mod connection;
pub mod listener;
pub mod local_addr;

pub use connection::{handle_connection, Connection, ConnectionError, SessionId, SessionStats};
pub use listener::serve;
pub use local_addr::{local_ipv4_address, AddressError};
