//! Device discovery over the sysfs USB topology.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace};

use super::info::DeviceInfo;
use super::variant::VariantRegistry;
use crate::error::{DeckError, Result};

/// Filesystem roots discovery reads from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryRoots {
    /// Directory of USB devices, one entry per device/interface
    pub sysfs: PathBuf,
    /// Directory holding the hidraw special files
    pub dev: PathBuf,
}

impl Default for DiscoveryRoots {
    fn default() -> Self {
        Self {
            sysfs: PathBuf::from("/sys/bus/usb/devices"),
            dev: PathBuf::from("/dev"),
        }
    }
}

/// List attached devices known to `registry`.
pub fn find_devices(registry: &VariantRegistry) -> Result<Vec<DeviceInfo>> {
    find_devices_under(&DiscoveryRoots::default(), registry)
}

/// List devices below explicit roots.
///
/// Unreadable entries are skipped. A matched device without a hidraw node
/// aborts the whole scan with [`DeckError::NoInputNode`]. Results come in
/// directory iteration order.
pub fn find_devices_under(roots: &DiscoveryRoots, registry: &VariantRegistry) -> Result<Vec<DeviceInfo>> {
    let entries = fs::read_dir(&roots.sysfs).map_err(|source| DeckError::Discovery {
        path: roots.sysfs.clone(),
        source,
    })?;

    let mut devices = Vec::new();
    for entry in entries.flatten() {
        let dir = entry.path();
        let (Some(vendor_id), Some(product_id)) = (
            read_id(&dir.join("idVendor")),
            read_id(&dir.join("idProduct")),
        ) else {
            continue;
        };
        let Some(variant) = registry.lookup(vendor_id, product_id) else {
            trace!(dir = %dir.display(), vendor_id, product_id, "Skipping unsupported USB device");
            continue;
        };

        let node = find_hidraw_node(&dir)?.ok_or_else(|| DeckError::NoInputNode {
            sysfs_path: dir.clone(),
        })?;
        let node_path = roots.dev.join(node);

        info!(
            usb = %dir.display(),
            node = %node_path.display(),
            vid = %format!("{vendor_id:04x}"),
            pid = %format!("{product_id:04x}"),
            model = variant.name,
            "Found device"
        );

        devices.push(DeviceInfo {
            serial: read_attr(&dir.join("serial")),
            manufacturer: read_attr(&dir.join("manufacturer")),
            product: read_attr(&dir.join("product")),
            sysfs_path: dir,
            node_path,
            vendor_id,
            product_id,
            variant: variant.clone(),
        });
    }

    debug!(count = devices.len(), "Discovery finished");
    Ok(devices)
}

/// Pick one device from a discovery result, by serial if given.
///
/// Without a serial exactly one device must be attached.
pub fn select_device(devices: Vec<DeviceInfo>, serial: Option<&str>) -> Result<DeviceInfo> {
    if devices.is_empty() {
        return Err(DeckError::NoDevicesFound);
    }

    if let Some(serial) = serial {
        return devices
            .into_iter()
            .find(|d| d.serial.as_deref() == Some(serial))
            .ok_or_else(|| DeckError::DeviceNotFound {
                serial: serial.to_string(),
            });
    }

    if devices.len() > 1 {
        let serials = devices.iter().map(DeviceInfo::display_id).collect();
        return Err(DeckError::MultipleDevices { serials });
    }
    devices.into_iter().next().ok_or(DeckError::NoDevicesFound)
}

/// A one-line sysfs attribute, trimmed. `None` if unreadable or empty.
fn read_attr(path: &Path) -> Option<String> {
    let value = fs::read_to_string(path).ok()?;
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn read_id(path: &Path) -> Option<u16> {
    u16::from_str_radix(&read_attr(path)?, 16).ok()
}

/// Name of the first `hidraw*` directory below the device's real path that
/// sits inside a `hidraw` class directory.
fn find_hidraw_node(usb_dir: &Path) -> Result<Option<String>> {
    let real = fs::canonicalize(usb_dir).map_err(|e| DeckError::io("resolve", usb_dir, e))?;
    walk_for_hidraw(&real).map_err(|e| DeckError::io("walk", &real, e))
}

fn walk_for_hidraw(dir: &Path) -> io::Result<Option<String>> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<io::Result<_>>()?;
    entries.sort_by_key(fs::DirEntry::file_name);

    for entry in entries {
        // Symlinks (subsystem, driver, ...) are not followed.
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with("hidraw") && inside_hidraw_class(&path) {
            return Ok(Some(name));
        }
        if let Some(found) = walk_for_hidraw(&path)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

fn inside_hidraw_class(path: &Path) -> bool {
    path.parent()
        .is_some_and(|parent| parent.components().any(|c| c.as_os_str() == "hidraw"))
}
