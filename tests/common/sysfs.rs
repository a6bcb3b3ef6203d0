//! Synthetic sysfs trees for discovery tests.
//!
//! Mirrors the kernel layout: `bus/usb/devices/<name>` are symlinks into
//! `devices/`, and the hidraw node sits a few levels below the USB device.

use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use hiddeck::device::DiscoveryRoots;
use tempfile::TempDir;

pub struct FakeSysfs {
    dir: TempDir,
}

impl FakeSysfs {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir_all(dir.path().join("bus/usb/devices")).unwrap();
        fs::create_dir_all(dir.path().join("devices/usb1")).unwrap();
        fs::create_dir_all(dir.path().join("dev")).unwrap();
        Self { dir }
    }

    pub fn roots(&self) -> DiscoveryRoots {
        DiscoveryRoots {
            sysfs: self.dir.path().join("bus/usb/devices"),
            dev: self.dir.path().join("dev"),
        }
    }

    fn device_dir(&self, name: &str) -> PathBuf {
        self.dir.path().join("devices/usb1").join(name)
    }

    /// A USB device with ids and a serial, linked into the bus directory.
    pub fn add_usb_device(&self, name: &str, vid: u16, pid: u16, serial: Option<&str>) -> PathBuf {
        let dev = self.device_dir(name);
        fs::create_dir_all(&dev).unwrap();
        fs::write(dev.join("idVendor"), format!("{vid:04x}\n")).unwrap();
        fs::write(dev.join("idProduct"), format!("{pid:04x}\n")).unwrap();
        fs::write(dev.join("manufacturer"), "Elgato\n").unwrap();
        if let Some(serial) = serial {
            fs::write(dev.join("serial"), format!("{serial}\n")).unwrap();
        }
        symlink(&dev, self.dir.path().join("bus/usb/devices").join(name)).unwrap();
        dev
    }

    /// Attach `hidraw/<node>` under the device's first interface.
    pub fn add_hidraw(&self, name: &str, pid: u16, node: &str) {
        let hid = self
            .device_dir(name)
            .join(format!("{name}:1.0"))
            .join(format!("0003:0FD9:{pid:04X}.0001"));
        fs::create_dir_all(hid.join("hidraw").join(node)).unwrap();
        fs::write(self.dir.path().join("dev").join(node), b"").unwrap();
    }

    /// A `hidraw*` directory outside any `hidraw` class directory.
    pub fn add_decoy_node(&self, name: &str, node: &str) {
        let decoy = self.device_dir(name).join("0000:decoy").join(node);
        fs::create_dir_all(decoy).unwrap();
    }

    /// A symlink inside the device that leads to another hidraw node.
    pub fn add_linked_node(&self, name: &str, node: &str) {
        let target = self.dir.path().join("class_elsewhere");
        fs::create_dir_all(target.join("hidraw").join(node)).unwrap();
        symlink(&target, self.device_dir(name).join("00_subsystem")).unwrap();
    }

    /// An interface entry in the bus directory without id attributes.
    pub fn add_interface_entry(&self, name: &str) {
        let iface = self.dir.path().join("devices/usb1").join(name);
        fs::create_dir_all(&iface).unwrap();
        fs::write(iface.join("bInterfaceClass"), "03\n").unwrap();
        symlink(&iface, self.dir.path().join("bus/usb/devices").join(name)).unwrap();
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}
