//! Open device sessions.

use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::time::Duration;

use tracing::{debug, info, trace};

use super::hidraw::HidrawNode;
use super::info::DeviceInfo;
use super::variant::VariantDescriptor;
use super::Transport;
use crate::error::{DeckError, Result};

/// Lifecycle of a session's key scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No scan loop has been started.
    Idle,
    Scanning,
    /// The loop ended after a read failure or close; its stream is closed.
    Stopped,
}

pub(crate) struct SessionShared {
    pub(crate) info: DeviceInfo,
    transport: RwLock<Option<Arc<dyn Transport>>>,
    write_lock: Mutex<()>,
    scan_state: Mutex<ScanState>,
}

impl SessionShared {
    fn transport(&self) -> Result<Arc<dyn Transport>> {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| DeckError::NotOpen {
                path: self.info.node_path.clone(),
            })
    }

    pub(crate) fn is_open(&self) -> bool {
        self.transport
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Read one report. Reads are never serialized against writers.
    pub(crate) fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.transport()?
            .read(buf, timeout)
            .map_err(|e| DeckError::io("read", &self.info.node_path, e))
    }

    pub(crate) fn scan_state(&self) -> ScanState {
        *self.scan_state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set_scan_state(&self, state: ScanState) {
        *self.scan_state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Move to `Scanning` unless a loop is already running.
    pub(crate) fn begin_scanning(&self) -> Result<()> {
        let mut state = self.scan_state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == ScanState::Scanning {
            return Err(DeckError::AlreadyScanning);
        }
        *state = ScanState::Scanning;
        Ok(())
    }
}

/// Exclusive owner of an open raw device handle.
///
/// Reads belong to the key scanner; writers must go through [`Writer`],
/// which serializes whole multi-report transfers. Dropping the session
/// closes it.
pub struct DeviceSession {
    pub(crate) shared: Arc<SessionShared>,
}

impl DeviceSession {
    /// Open the hidraw node of a discovered device.
    pub fn open(info: &DeviceInfo) -> Result<Self> {
        let node = HidrawNode::open(&info.node_path).map_err(|e| DeckError::io("open", &info.node_path, e))?;

        info!(
            node = %info.node_path.display(),
            model = info.variant.name,
            "Opened device"
        );
        Ok(Self::with_transport(info.clone(), Arc::new(node)))
    }

    /// Build a session over any transport (used with the mock in tests).
    pub fn with_transport(info: DeviceInfo, transport: Arc<dyn Transport>) -> Self {
        Self {
            shared: Arc::new(SessionShared {
                info,
                transport: RwLock::new(Some(transport)),
                write_lock: Mutex::new(()),
                scan_state: Mutex::new(ScanState::Idle),
            }),
        }
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.shared.info
    }

    pub fn variant(&self) -> &VariantDescriptor {
        &self.shared.info.variant
    }

    pub fn node_path(&self) -> &Path {
        &self.shared.info.node_path
    }

    pub fn is_open(&self) -> bool {
        self.shared.is_open()
    }

    pub fn scan_state(&self) -> ScanState {
        self.shared.scan_state()
    }

    /// Release the handle. Closing twice is a no-op.
    ///
    /// A running key scanner sees its next read fail and closes its stream.
    pub fn close(&self) {
        let previous = self
            .shared
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            debug!(node = %self.node_path().display(), "Closed device");
        }
    }

    /// Read one raw report, waiting at most `timeout`.
    pub fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        self.shared.read(buf, timeout)
    }

    /// Write a single report under the write lock.
    pub fn write(&self, report: &[u8]) -> Result<()> {
        self.lock_writer()?.write(report)
    }

    /// Take the write lock for a multi-report transfer.
    ///
    /// Blocks while another writer holds it.
    pub fn lock_writer(&self) -> Result<Writer<'_>> {
        // Fail fast on a closed session before queueing behind other writers.
        self.shared.transport()?;
        let guard = self
            .shared
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let transport = self.shared.transport()?;
        Ok(Writer {
            _guard: guard,
            transport,
            shared: &self.shared,
        })
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("node", &self.shared.info.node_path)
            .field("open", &self.is_open())
            .field("scan_state", &self.scan_state())
            .finish()
    }
}

/// Holder of a session's write lock.
///
/// No other writer can put reports on the wire until this is dropped.
pub struct Writer<'a> {
    _guard: MutexGuard<'a, ()>,
    transport: Arc<dyn Transport>,
    shared: &'a SessionShared,
}

impl Writer<'_> {
    fn ensure_open(&self) -> Result<()> {
        if self.shared.is_open() {
            Ok(())
        } else {
            Err(DeckError::NotOpen {
                path: self.shared.info.node_path.clone(),
            })
        }
    }

    /// Write one complete output report.
    pub fn write(&self, report: &[u8]) -> Result<()> {
        self.ensure_open()?;
        let path = &self.shared.info.node_path;
        let written = self
            .transport
            .write(report)
            .map_err(|e| DeckError::io("write", path, e))?;
        if written != report.len() {
            return Err(DeckError::io(
                "write",
                path,
                io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("short write: {written} of {} bytes", report.len()),
                ),
            ));
        }
        trace!(len = report.len(), "Wrote report");
        Ok(())
    }

    pub fn send_feature_report(&self, report: &[u8]) -> Result<()> {
        self.ensure_open()?;
        self.transport
            .send_feature_report(report)
            .map_err(|e| DeckError::io("set feature report", &self.shared.info.node_path, e))
    }

    pub fn get_feature_report(&self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_open()?;
        self.transport
            .get_feature_report(buf)
            .map_err(|e| DeckError::io("get feature report", &self.shared.info.node_path, e))
    }
}
