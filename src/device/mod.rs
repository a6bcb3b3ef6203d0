//! Device layer: capability table, discovery, sessions and the key scanner.
//!
//! Everything that touches the wire goes through the [`Transport`] trait, so
//! the protocol code runs unchanged against a real hidraw node or the
//! recording [`mock::MockTransport`].

mod commands;
mod discovery;
mod hidraw;
mod info;
pub mod mock;
mod scanner;
mod session;
pub mod variant;

pub use commands::{
    brightness_report, clamp_brightness, firmware_request, parse_firmware_version, reset_report,
};
pub use discovery::{DiscoveryRoots, find_devices, find_devices_under, select_device};
pub use hidraw::HidrawNode;
pub use info::{DeviceInfo, KeyEvent};
pub use scanner::{KeyEvents, KeyFrameDiff, ScanOptions};
pub use session::{DeviceSession, ScanState, Writer};
pub use variant::{VariantDescriptor, VariantRegistry};

use std::io;
use std::time::Duration;

/// Raw report I/O against one device.
///
/// Implementations must tolerate one thread reading while another writes.
pub trait Transport: Send + Sync {
    /// Read one input report into `buf`.
    ///
    /// Returns `Ok(0)` if nothing arrived within `timeout`.
    fn read(&self, buf: &mut [u8], timeout: Duration) -> io::Result<usize>;

    /// Write one output report, returning the number of bytes accepted.
    fn write(&self, report: &[u8]) -> io::Result<usize>;

    /// Send a feature report; `report[0]` is the report id.
    fn send_feature_report(&self, report: &[u8]) -> io::Result<()>;

    /// Fetch a feature report; the caller puts the report id in `buf[0]`.
    fn get_feature_report(&self, buf: &mut [u8]) -> io::Result<usize>;
}
