//! Control commands: brightness, reset and firmware query.
//!
//! Commands travel as feature reports padded to the model's feature report
//! size, under the same write lock as image transfers.

use tracing::debug;

use super::session::DeviceSession;
use super::variant::VariantDescriptor;
use crate::error::Result;

/// Brightness values above 100 are clamped, never rejected.
pub const fn clamp_brightness(percent: u8) -> u8 {
    if percent > 100 { 100 } else { percent }
}

fn padded(template: &[u8], len: usize) -> Vec<u8> {
    let mut report = template.to_vec();
    if report.len() < len {
        report.resize(len, 0);
    }
    report
}

/// Wire report that sets the panel brightness.
pub fn brightness_report(variant: &VariantDescriptor, percent: u8) -> Vec<u8> {
    let mut command = variant.commands.brightness.to_vec();
    command.push(clamp_brightness(percent));
    padded(&command, variant.feature_report_size)
}

/// Wire report that resets the panel to its splash screen.
pub fn reset_report(variant: &VariantDescriptor) -> Vec<u8> {
    padded(variant.commands.reset, variant.feature_report_size)
}

/// Buffer for fetching the firmware feature report, report id in byte 0.
pub fn firmware_request(variant: &VariantDescriptor) -> Vec<u8> {
    padded(variant.commands.firmware, variant.feature_report_size)
}

/// Firmware version text: printable bytes from `offset` up to the first NUL.
pub fn parse_firmware_version(report: &[u8], offset: usize) -> String {
    report
        .get(offset..)
        .unwrap_or_default()
        .iter()
        .take_while(|&&b| b != 0)
        .map(|&b| char::from(b))
        .collect::<String>()
        .trim()
        .to_string()
}

impl DeviceSession {
    pub fn set_brightness(&self, percent: u8) -> Result<()> {
        let report = brightness_report(self.variant(), percent);
        debug!(percent = clamp_brightness(percent), "Setting brightness");
        self.lock_writer()?.send_feature_report(&report)
    }

    pub fn reset(&self) -> Result<()> {
        let report = reset_report(self.variant());
        debug!("Resetting device");
        self.lock_writer()?.send_feature_report(&report)
    }

    /// Raw firmware feature report.
    pub fn firmware_version(&self) -> Result<Vec<u8>> {
        let mut report = firmware_request(self.variant());
        let n = self.lock_writer()?.get_feature_report(&mut report)?;
        report.truncate(n);
        Ok(report)
    }

    /// Firmware version decoded as text.
    pub fn firmware_version_string(&self) -> Result<String> {
        let report = self.firmware_version()?;
        Ok(parse_firmware_version(&report, self.variant().firmware_offset))
    }
}
