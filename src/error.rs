//! Error types for deck discovery, sessions and wire transfers.

use std::path::PathBuf;

use thiserror::Error;

/// Primary error type for deck operations.
#[derive(Error, Debug)]
pub enum DeckError {
    // Discovery errors
    #[error("Cannot enumerate USB devices at {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No hidraw node found for {sysfs_path} (device might not be bound to hid)")]
    NoInputNode { sysfs_path: PathBuf },

    #[error("No Stream Deck devices found")]
    NoDevicesFound,

    #[error("Device not found: {serial}")]
    DeviceNotFound { serial: String },

    #[error("Multiple devices found, specify --serial: {serials:?}")]
    MultipleDevices { serials: Vec<String> },

    // Session errors
    #[error("Permission denied: {op} {path}")]
    PermissionDenied {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} failed on {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Device {path} is not open")]
    NotOpen { path: PathBuf },

    #[error("Key scanner is already running")]
    AlreadyScanning,

    #[error("Key scanner thread panicked")]
    ScannerPanicked,

    #[error("Invalid key index {key} (valid range: 0-{max})")]
    InvalidKeyIndex { key: u8, max: u8 },

    // Image errors
    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Image file not found: {path}")]
    ImageNotFound { path: PathBuf },

    #[error("Cannot load font {path}: {reason}")]
    Font { path: PathBuf, reason: String },

    #[error("Invalid color '{0}': expected RRGGBB or RRGGBBAA hex")]
    InvalidColor(String),
}

impl DeckError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoDevicesFound
                | Self::DeviceNotFound { .. }
                | Self::MultipleDevices { .. }
                | Self::PermissionDenied { .. }
                | Self::ImageNotFound { .. }
                | Self::InvalidColor(_)
                | Self::InvalidKeyIndex { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NoDevicesFound => Some("Ensure the Stream Deck is connected via USB"),
            Self::MultipleDevices { .. } => Some("Use --serial to specify which device"),
            Self::PermissionDenied { .. } => Some(
                "Run as root or add a udev rule granting your user access to the hidraw node",
            ),
            Self::NoInputNode { .. } => Some("Check that the hid and usbhid kernel modules are loaded"),
            Self::NotOpen { .. } => Some("Open the device again; it was closed or unplugged"),
            Self::InvalidColor(_) => Some("Use a hex color such as ff8800"),
            Self::InvalidKeyIndex { .. } => Some("Run `hiddeck info` to see the key count"),
            _ => None,
        }
    }

    /// Wraps an I/O failure with the syscall name and the node it hit.
    ///
    /// Permission failures become [`DeckError::PermissionDenied`] so callers
    /// get the access hint.
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { op, path, source }
        } else {
            Self::Io { op, path, source }
        }
    }
}

/// Convenience type alias for Results using DeckError.
pub type Result<T> = std::result::Result<T, DeckError>;
