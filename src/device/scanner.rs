//! Key scanner: turns polled key-state reports into press/release events.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::info::KeyEvent;
use super::session::{DeviceSession, ScanState, SessionShared};
use super::variant::{KeyOrder, VariantDescriptor};
use crate::error::{DeckError, Result};

/// Tuning for the background scan loop.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Longest a single read waits before the loop re-checks the session.
    pub poll_interval: Duration,
    /// Events buffered before the scan loop blocks on a slow consumer.
    pub queue_capacity: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            queue_capacity: 64,
        }
    }
}

/// Diffs successive key-state frames.
///
/// The previous frame starts all-zero, so keys already held when scanning
/// begins fire on the first frame.
#[derive(Debug, Clone)]
pub struct KeyFrameDiff {
    previous: Vec<u8>,
    offset: usize,
    columns: u8,
    key_order: KeyOrder,
}

impl KeyFrameDiff {
    pub fn new(variant: &VariantDescriptor) -> Self {
        Self {
            previous: vec![0; variant.key_state_len()],
            offset: variant.key_state_offset,
            columns: variant.columns,
            key_order: variant.key_order,
        }
    }

    /// Expected frame length.
    pub fn frame_len(&self) -> usize {
        self.previous.len()
    }

    /// Events for every key byte that changed since the last full frame.
    ///
    /// Short frames are ignored and leave the remembered state untouched.
    pub fn apply(&mut self, frame: &[u8]) -> Vec<KeyEvent> {
        if frame.len() < self.previous.len() {
            return Vec::new();
        }
        let frame = &frame[..self.previous.len()];

        let events = (self.offset..frame.len())
            .filter(|&i| frame[i] != self.previous[i])
            .map(|i| KeyEvent {
                index: self.key_order.translate((i - self.offset) as u8, self.columns),
                pressed: frame[i] == 1,
            })
            .collect();
        self.previous.copy_from_slice(frame);
        events
    }
}

/// Live stream of key events from a scanning session.
///
/// Ends (yields `None`) once the device is closed or unplugged. Dropping it
/// stops the scan loop within one poll interval, after which the session
/// can scan again.
#[derive(Debug)]
pub struct KeyEvents {
    rx: Receiver<KeyEvent>,
    worker: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl KeyEvents {
    /// Block until the next event, or `None` once the stream is closed.
    pub fn recv(&self) -> Option<KeyEvent> {
        self.rx.recv().ok()
    }

    /// Like [`recv`](Self::recv) with an upper bound on the wait.
    pub fn recv_timeout(&self, timeout: Duration) -> std::result::Result<KeyEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> std::result::Result<KeyEvent, TryRecvError> {
        self.rx.try_recv()
    }

    /// Wait for the scan loop to exit. Only returns after the session is
    /// closed or the device goes away.
    pub fn join(mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        worker.join().map_err(|_| {
            warn!("Key scanner thread panicked");
            DeckError::ScannerPanicked
        })
    }
}

impl Drop for KeyEvents {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Iterator for KeyEvents {
    type Item = KeyEvent;

    fn next(&mut self) -> Option<KeyEvent> {
        self.recv()
    }
}

impl DeviceSession {
    /// Start the background scan loop with default options.
    pub fn start_scanning(&self) -> Result<KeyEvents> {
        self.start_scanning_with(ScanOptions::default())
    }

    /// Start the background scan loop.
    ///
    /// Only one loop may run per session; it owns the read side until it
    /// stops.
    pub fn start_scanning_with(&self, options: ScanOptions) -> Result<KeyEvents> {
        if !self.is_open() {
            return Err(DeckError::NotOpen {
                path: self.node_path().to_path_buf(),
            });
        }
        self.shared.begin_scanning()?;

        let (tx, rx) = mpsc::sync_channel(options.queue_capacity.max(1));
        let shared = Arc::clone(&self.shared);
        let stop = Arc::new(AtomicBool::new(false));
        let loop_stop = Arc::clone(&stop);
        let worker = std::thread::Builder::new()
            .name("hiddeck-scan".to_string())
            .spawn(move || scan_loop(&shared, &tx, &loop_stop, &options));

        match worker {
            Ok(worker) => {
                info!(node = %self.node_path().display(), "Key scanner started");
                Ok(KeyEvents {
                    rx,
                    worker: Some(worker),
                    stop,
                })
            }
            Err(e) => {
                self.shared.set_scan_state(ScanState::Idle);
                Err(DeckError::io("spawn scanner", self.node_path(), e))
            }
        }
    }
}

/// Marks the scanner stopped however the loop exits, panics included.
struct StoppedOnExit<'a>(&'a SessionShared);

impl Drop for StoppedOnExit<'_> {
    fn drop(&mut self) {
        self.0.set_scan_state(ScanState::Stopped);
        info!(node = %self.0.info.node_path.display(), "Key scanner stopped");
    }
}

fn scan_loop(shared: &SessionShared, tx: &SyncSender<KeyEvent>, stop: &AtomicBool, options: &ScanOptions) {
    let _stopped = StoppedOnExit(shared);
    let mut diff = KeyFrameDiff::new(&shared.info.variant);
    let mut frame = vec![0u8; diff.frame_len()];

    'scan: loop {
        if stop.load(Ordering::SeqCst) {
            debug!("Key event stream dropped");
            break;
        }
        let n = match shared.read(&mut frame, options.poll_interval) {
            Ok(n) => n,
            Err(err) => {
                debug!(error = %err, "Key scanner read failed");
                break;
            }
        };
        if n < frame.len() {
            if n > 0 {
                trace!(n, expected = frame.len(), "Discarding short key-state frame");
            }
            continue;
        }

        for event in diff.apply(&frame) {
            trace!(?event, "Key event");
            if tx.send(event).is_err() {
                debug!("Key event receiver dropped");
                break 'scan;
            }
        }
    }
}
