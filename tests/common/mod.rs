//! Shared test support: fake sysfs trees and mock-backed sessions.
#![allow(dead_code)]

pub mod sysfs;

use std::path::PathBuf;
use std::sync::Arc;

use hiddeck::device::mock::MockTransport;
use hiddeck::device::{DeviceInfo, DeviceSession, VariantDescriptor};
use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn fake_info(variant: VariantDescriptor) -> DeviceInfo {
    DeviceInfo {
        sysfs_path: PathBuf::from("/sys/bus/usb/devices/1-4"),
        node_path: PathBuf::from("/dev/hidraw7"),
        vendor_id: hiddeck::device::variant::ELGATO_VENDOR_ID,
        product_id: 0,
        serial: Some("TEST0001".to_string()),
        manufacturer: Some("Elgato".to_string()),
        product: Some(variant.name.to_string()),
        variant,
    }
}

/// A session wired to a recording mock.
pub fn mock_session(variant: VariantDescriptor) -> (DeviceSession, Arc<MockTransport>) {
    init_test_logging();
    let mock = Arc::new(MockTransport::new());
    let session = DeviceSession::with_transport(fake_info(variant), mock.clone());
    (session, mock)
}

/// Key-state report with the given raw key positions held.
pub fn key_frame(variant: &VariantDescriptor, pressed: &[usize]) -> Vec<u8> {
    let mut frame = vec![0u8; variant.key_state_len()];
    frame[0] = 0x01;
    for &key in pressed {
        frame[variant.key_state_offset + key] = 1;
    }
    frame
}
