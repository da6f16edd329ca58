//! UDP transport implementation

use super::{Transport, COMMAND_PORT, STATUS_BUFFER_SIZE, STATUS_PORT};
use crate::error::{Error, Result};
use crate::protocol::CommandFrame;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};

/// UDP transport against a live device
///
/// Sockets are opened per call and released on every exit path by drop:
/// the status port can only be bound by one listener at a time, so holding
/// it between refreshes would block any other tool on the host.
#[derive(Debug, Default)]
pub struct UdpTransport;

impl UdpTransport {
    /// Create a UDP transport
    pub fn new() -> Self {
        UdpTransport
    }
}

impl Transport for UdpTransport {
    fn receive_status(&mut self, expected_source: IpAddr) -> Result<Vec<u8>> {
        // Wildcard bind so broadcasts are received whatever the local
        // interface address is.
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, STATUS_PORT))?;
        socket.set_broadcast(true)?;

        let mut buf = [0u8; STATUS_BUFFER_SIZE];
        let (len, sender) = socket.recv_from(&mut buf)?;

        if sender.ip() != expected_source {
            log::warn!(
                "status broadcast from {} while expecting {}; wrong device or misconfigured target",
                sender.ip(),
                expected_source
            );
            return Err(Error::AddressMismatch {
                expected: expected_source,
                actual: sender.ip(),
            });
        }

        log::debug!("status packet: {} bytes from {}", len, sender);
        Ok(buf[..len].to_vec())
    }

    fn send_command(&mut self, frame: &CommandFrame, target: IpAddr) -> Result<()> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.send_to(frame.as_bytes(), (target, COMMAND_PORT))?;
        log::debug!("sent command {} to {}:{}", frame.code(), target, COMMAND_PORT);
        Ok(())
    }
}
