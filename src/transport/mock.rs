//! Mock transport for testing

use super::Transport;
use crate::error::Result;
use crate::protocol::CommandFrame;
use std::collections::VecDeque;
use std::io;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

/// Mock transport for unit testing
///
/// Status payloads are served from a scripted queue; when the queue runs
/// dry the last payload is served again, which models a device whose state
/// stopped changing. Every sent frame is recorded with its target so tests
/// can count exactly how many commands a retry loop produced.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    statuses: VecDeque<Vec<u8>>,
    last: Option<Vec<u8>>,
    sent: Vec<(CommandFrame, IpAddr)>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a status payload to be served by the next receive
    pub fn push_status(&self, payload: Vec<u8>) {
        let mut inner = self.inner.lock().unwrap();
        inner.statuses.push_back(payload);
    }

    /// All frames sent so far, with their targets
    pub fn sent(&self) -> Vec<(CommandFrame, IpAddr)> {
        let inner = self.inner.lock().unwrap();
        inner.sent.clone()
    }

    /// Number of frames sent so far
    pub fn sent_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.sent.len()
    }
}

impl Transport for MockTransport {
    fn receive_status(&mut self, _expected_source: IpAddr) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(payload) = inner.statuses.pop_front() {
            inner.last = Some(payload.clone());
            Ok(payload)
        } else if let Some(payload) = &inner.last {
            Ok(payload.clone())
        } else {
            Err(io::Error::new(io::ErrorKind::WouldBlock, "no status payload queued").into())
        }
    }

    fn send_command(&mut self, frame: &CommandFrame, target: IpAddr) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.sent.push((*frame, target));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode;

    #[test]
    fn serves_queued_then_sticky_last() {
        let mock = MockTransport::new();
        let addr: IpAddr = "10.0.0.5".parse().unwrap();
        mock.push_status(vec![1, 2, 3, 4]);
        mock.push_status(vec![5, 6, 7, 8]);

        let mut transport = mock.clone();
        assert_eq!(transport.receive_status(addr).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(transport.receive_status(addr).unwrap(), vec![5, 6, 7, 8]);
        // Queue dry: last payload repeats
        assert_eq!(transport.receive_status(addr).unwrap(), vec![5, 6, 7, 8]);
    }

    #[test]
    fn empty_script_is_an_error() {
        let mut transport = MockTransport::new();
        let addr: IpAddr = "10.0.0.5".parse().unwrap();
        assert!(transport.receive_status(addr).is_err());
    }

    #[test]
    fn records_sent_frames() {
        let mock = MockTransport::new();
        let addr: IpAddr = "10.0.0.5".parse().unwrap();
        let frame = encode(19, 0, 0);
        mock.clone().send_command(&frame, addr).unwrap();
        assert_eq!(mock.sent_count(), 1);
        assert_eq!(mock.sent()[0], (frame, addr));
    }
}
