//! Discovered-device and key-event types.

use std::path::PathBuf;

use serde::Serialize;

use super::variant::VariantDescriptor;

/// A matched but unopened Stream Deck.
///
/// Holds no OS resources; open it with [`DeviceSession::open`].
///
/// [`DeviceSession::open`]: super::DeviceSession::open
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// USB device directory under sysfs
    pub sysfs_path: PathBuf,
    /// Raw hidraw node, e.g. `/dev/hidraw3`
    pub node_path: PathBuf,
    #[serde(serialize_with = "as_hex")]
    pub vendor_id: u16,
    #[serde(serialize_with = "as_hex")]
    pub product_id: u16,
    pub serial: Option<String>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub variant: VariantDescriptor,
}

impl DeviceInfo {
    /// Serial if the device reported one, else the node path.
    pub fn display_id(&self) -> String {
        self.serial
            .clone()
            .unwrap_or_else(|| self.node_path.display().to_string())
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's serialize_with signature
fn as_hex<S: serde::Serializer>(id: &u16, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{id:04x}"))
}

/// Key press/release transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KeyEvent {
    /// Logical key index, left-to-right, top-to-bottom
    pub index: u8,
    /// True if pressed, false if released
    pub pressed: bool,
}
