//! Best-effort discovery of the host's outbound IPv4 address.
//!
//! Connecting a UDP socket sends no packets; it only asks the OS routing
//! table which local interface would carry traffic to the target address.
//! The result is printed in the startup banner so operators know where to
//! point clients.  Failure is never fatal.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

use thiserror::Error;

/// Route lookup target from TEST-NET-1 (RFC 5737).  It is never contacted.
const ROUTE_TARGET: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), 9);

/// Printed in place of the address when discovery fails.
pub const ADDRESS_UNAVAILABLE: &str = "unavailable";

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("could not create UDP socket: {0}")]
    Socket(#[source] std::io::Error),
    #[error("no route to target address: {0}")]
    NoRoute(#[source] std::io::Error),
    #[error("local address {0} is not IPv4")]
    NotIpv4(IpAddr),
}

/// Returns the IPv4 address of the interface holding the default route.
pub fn local_ipv4_address() -> Result<Ipv4Addr, AddressError> {
    local_ipv4_address_towards(ROUTE_TARGET)
}

/// Returns the local IPv4 address the OS would use to reach `target`.
pub fn local_ipv4_address_towards(target: SocketAddr) -> Result<Ipv4Addr, AddressError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).map_err(AddressError::Socket)?;
    socket.connect(target).map_err(AddressError::NoRoute)?;
    match socket.local_addr().map_err(AddressError::NoRoute)?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => Ok(ip),
        other => Err(AddressError::NotIpv4(other)),
    }
}
