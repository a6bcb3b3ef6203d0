//! Linux hidraw node transport.
//!
//! Input and output reports go through plain `read`/`write` on the node;
//! feature reports need the `HIDIOC{S,G}FEATURE` ioctls.
#![allow(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::Transport;

// _IOC(dir, type, nr, size) = (dir << 30) | (size << 16) | (type << 8) | nr
const IOC_WRITE: u32 = 1;
const IOC_READ: u32 = 2;

const fn ioc(dir: u32, ty: u32, nr: u32, size: u32) -> libc::c_ulong {
    ((dir << 30) | (size << 16) | (ty << 8) | nr) as libc::c_ulong
}

const fn hidiocsfeature(len: usize) -> libc::c_ulong {
    ioc(IOC_WRITE | IOC_READ, b'H' as u32, 0x06, len as u32)
}

const fn hidiocgfeature(len: usize) -> libc::c_ulong {
    ioc(IOC_WRITE | IOC_READ, b'H' as u32, 0x07, len as u32)
}

/// An open `/dev/hidraw*` special file.
#[derive(Debug)]
pub struct HidrawNode {
    file: File,
    path: PathBuf,
}

impl HidrawNode {
    /// Open the node read/write.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait up to `timeout` for an input report. Returns false on timeout.
    fn wait_readable(&self, timeout: Duration) -> io::Result<bool> {
        let mut fds = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        // SAFETY: `fds` is a valid pollfd for the duration of the call.
        let ret = unsafe { libc::poll(&raw mut fds, 1, millis) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            return if err.kind() == io::ErrorKind::Interrupted {
                Ok(false)
            } else {
                Err(err)
            };
        }
        if ret == 0 {
            return Ok(false);
        }
        if fds.revents & libc::POLLIN == 0 {
            // POLLHUP / POLLERR / POLLNVAL without data: the device is gone.
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "hidraw node hung up",
            ));
        }
        Ok(true)
    }
}

impl Transport for HidrawNode {
    fn read(&self, buf: &mut [u8], timeout: Duration) -> io::Result<usize> {
        if !self.wait_readable(timeout)? {
            return Ok(0);
        }
        (&self.file).read(buf)
    }

    fn write(&self, report: &[u8]) -> io::Result<usize> {
        (&self.file).write(report)
    }

    fn send_feature_report(&self, report: &[u8]) -> io::Result<()> {
        // SAFETY: the kernel reads exactly `report.len()` bytes, encoded in the
        // request number, from a live slice.
        let ret = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                hidiocsfeature(report.len()),
                report.as_ptr(),
            )
        };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(())
        }
    }

    fn get_feature_report(&self, buf: &mut [u8]) -> io::Result<usize> {
        // SAFETY: the kernel writes at most `buf.len()` bytes into a live,
        // exclusively borrowed slice.
        let ret = unsafe {
            libc::ioctl(
                self.file.as_raw_fd(),
                hidiocgfeature(buf.len()),
                buf.as_mut_ptr(),
            )
        };
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret as usize)
        }
    }
}
