//! Mock transport for testing
//!
//! Records every transfer the driver requests and lets tests script the
//! peripheral's behavior: rejecting asynchronous transmits, failing
//! blocking ones, and feeding bytes to the blocking receive path.
//! Armed receptions are counted so tests can drive the driver's
//! completion handler by hand, one byte per armed transfer.

use super::{TransferStart, Transport};
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock transport for unit testing
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

struct MockTransportInner {
    transmitted: Vec<Vec<u8>>,
    blocking_transmitted: Vec<Vec<u8>>,
    reject_transmits: usize,
    fail_blocking: bool,
    armed_receptions: usize,
    rx_script: VecDeque<u8>,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        MockTransport {
            inner: Arc::new(Mutex::new(MockTransportInner {
                transmitted: Vec::new(),
                blocking_transmitted: Vec::new(),
                reject_transmits: 0,
                fail_blocking: false,
                armed_receptions: 0,
                rx_script: VecDeque::new(),
            })),
        }
    }

    /// Make the next `n` calls to `begin_transmit` report `Busy`
    pub fn reject_next_transmits(&self, n: usize) {
        self.inner.lock().unwrap().reject_transmits = n;
    }

    /// Make `transmit_blocking` fail until cleared
    pub fn fail_blocking_transmits(&self, fail: bool) {
        self.inner.lock().unwrap().fail_blocking = fail;
    }

    /// Queue bytes for `receive_blocking` to return in order
    pub fn script_bytes(&self, data: &[u8]) {
        self.inner.lock().unwrap().rx_script.extend(data);
    }

    /// Spans accepted by `begin_transmit`, in call order
    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().transmitted.clone()
    }

    /// Spans sent through `transmit_blocking`, in call order
    pub fn blocking_transmitted(&self) -> Vec<Vec<u8>> {
        self.inner.lock().unwrap().blocking_transmitted.clone()
    }

    /// Number of single-byte receptions armed so far
    pub fn armed_receptions(&self) -> usize {
        self.inner.lock().unwrap().armed_receptions
    }

    /// Clear recorded transmissions
    pub fn clear_transmitted(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.transmitted.clear();
        inner.blocking_transmitted.clear();
    }
}

impl Transport for MockTransport {
    fn begin_transmit(&mut self, data: &[u8]) -> Result<TransferStart> {
        let mut inner = self.inner.lock().unwrap();
        if inner.reject_transmits > 0 {
            inner.reject_transmits -= 1;
            return Ok(TransferStart::Busy);
        }
        inner.transmitted.push(data.to_vec());
        Ok(TransferStart::Accepted)
    }

    fn begin_receive(&mut self) -> Result<TransferStart> {
        self.inner.lock().unwrap().armed_receptions += 1;
        Ok(TransferStart::Accepted)
    }

    fn transmit_blocking(&mut self, data: &[u8], _timeout: Duration) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_blocking {
            return Err(Error::Rejected);
        }
        inner.blocking_transmitted.push(data.to_vec());
        Ok(())
    }

    fn receive_blocking(&mut self, _timeout: Duration) -> Result<u8> {
        self.inner
            .lock()
            .unwrap()
            .rx_script
            .pop_front()
            .ok_or(Error::Timeout)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}
