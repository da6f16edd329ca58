//! Transport layer for I/O abstraction
//!
//! The device end of the protocol is two one-way UDP channels: status
//! arrives as a subnet broadcast, commands go out as fire-and-forget
//! datagrams. Nothing at this layer confirms delivery; reliability is the
//! session layer's job.

use crate::error::Result;
use crate::protocol::CommandFrame;
use std::net::IpAddr;

mod mock;
mod udp;

pub use mock::MockTransport;
pub use udp::UdpTransport;

/// Port the device family reserves for identification packets. Unused.
pub const IDENT_PORT: u16 = 30303;
/// Port the device broadcasts status packets on
pub const STATUS_PORT: u16 = 30304;
/// Port the device listens for command frames on
pub const COMMAND_PORT: u16 = 30305;

/// Receive buffer size, generously above the largest observed payload
/// (1148 4-byte groups)
pub const STATUS_BUFFER_SIZE: usize = 8192;

/// Transport trait for device communication
pub trait Transport {
    /// Block for one status broadcast and return its payload
    ///
    /// The payload is returned only when the sender's address equals
    /// `expected_source`; a packet from anything else is an
    /// [`AddressMismatch`](crate::Error::AddressMismatch).
    fn receive_status(&mut self, expected_source: IpAddr) -> Result<Vec<u8>>;

    /// Send one command frame to `target`, fire and forget
    fn send_command(&mut self, frame: &CommandFrame, target: IpAddr) -> Result<()>;
}
