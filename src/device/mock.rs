//! In-memory transport for testing without hardware.
//!
//! Records every report put on the wire and replays scripted input frames.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hiddeck::device::mock::{MockTransport, WireOp};
//! use hiddeck::device::DeviceSession;
//!
//! let mock = Arc::new(MockTransport::new());
//! let session = DeviceSession::with_transport(info, mock.clone());
//! session.set_brightness(150).unwrap();
//!
//! assert!(matches!(&mock.operations()[0], WireOp::SendFeature(r) if r[5] == 100));
//! ```

use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::trace;

use super::Transport;

/// Recorded wire operation for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireOp {
    Write(Vec<u8>),
    SendFeature(Vec<u8>),
    /// Feature report fetched, by report id
    GetFeature(u8),
}

/// Mock transport that records output and replays queued input.
#[derive(Debug, Default)]
pub struct MockTransport {
    input: Mutex<VecDeque<Vec<u8>>>,
    log: Mutex<Vec<WireOp>>,
    write_error: Mutex<Option<io::ErrorKind>>,
    fail_writes_after: Mutex<Option<usize>>,
    feature_response: Mutex<Vec<u8>>,
    disconnected: AtomicBool,
    panic_on_read: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    // === Input Simulation ===

    /// Queue one input report for the next read.
    pub fn queue_frame(&self, frame: impl Into<Vec<u8>>) {
        self.input.lock().unwrap_or_else(PoisonError::into_inner).push_back(frame.into());
    }

    /// Make reads fail once the input queue drains, as an unplugged device would.
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    /// Bytes returned by the next feature report fetch.
    pub fn set_feature_response(&self, response: impl Into<Vec<u8>>) {
        *self.feature_response.lock().unwrap_or_else(PoisonError::into_inner) = response.into();
    }

    // === Error Injection ===

    /// Fail the next write with `kind`.
    pub fn inject_write_error(&self, kind: io::ErrorKind) {
        *self.write_error.lock().unwrap_or_else(PoisonError::into_inner) = Some(kind);
    }

    /// Panic inside the next read once the input queue drains, simulating a
    /// crashing reader.
    pub fn panic_on_read(&self) {
        self.panic_on_read.store(true, Ordering::SeqCst);
    }

    /// Fail every write once `count` writes have succeeded.
    pub fn fail_writes_after(&self, count: usize) {
        *self.fail_writes_after.lock().unwrap_or_else(PoisonError::into_inner) = Some(count);
    }

    // === Assertions ===

    pub fn operations(&self) -> Vec<WireOp> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Only the output reports, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                WireOp::Write(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    pub fn clear_operations(&self) {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// # Panics
    ///
    /// Panics if anything was put on the wire.
    pub fn assert_no_operations(&self) {
        let ops = self.operations();
        assert!(ops.is_empty(), "Expected no operations, but found: {ops:#?}");
    }

    // === Internal Helpers ===

    fn record(&self, op: WireOp) {
        trace!(?op, "Recording wire operation");
        self.log.lock().unwrap_or_else(PoisonError::into_inner).push(op);
    }

    fn check_write(&self) -> io::Result<()> {
        if let Some(kind) = self.write_error.lock().unwrap_or_else(PoisonError::into_inner).take() {
            return Err(io::Error::new(kind, "injected write failure"));
        }
        if let Some(limit) = *self.fail_writes_after.lock().unwrap_or_else(PoisonError::into_inner) {
            if self.writes().len() >= limit {
                return Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "mock failure after write limit",
                ));
            }
        }
        Ok(())
    }
}

impl Transport for MockTransport {
    fn read(&self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        if let Some(frame) = self.input.lock().unwrap_or_else(PoisonError::into_inner).pop_front() {
            let n = frame.len().min(buf.len());
            buf[..n].copy_from_slice(&frame[..n]);
            return Ok(n);
        }
        if self.panic_on_read.swap(false, Ordering::SeqCst) {
            panic!("injected read panic");
        }
        if self.disconnected.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock device unplugged"));
        }
        std::thread::sleep(timeout.min(Duration::from_millis(2)));
        Ok(0)
    }

    fn write(&self, report: &[u8]) -> io::Result<usize> {
        self.check_write()?;
        self.record(WireOp::Write(report.to_vec()));
        Ok(report.len())
    }

    fn send_feature_report(&self, report: &[u8]) -> io::Result<()> {
        self.check_write()?;
        self.record(WireOp::SendFeature(report.to_vec()));
        Ok(())
    }

    fn get_feature_report(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.record(WireOp::GetFeature(buf.first().copied().unwrap_or(0)));
        let response = self.feature_response.lock().unwrap_or_else(PoisonError::into_inner);
        let n = response.len().min(buf.len());
        buf[..n].copy_from_slice(&response[..n]);
        Ok(n)
    }
}
