//! Key image transfer: frames prepared images into wire pages and writes
//! them through a session.

use std::path::Path;

use image::{DynamicImage, Rgb};
use tracing::{debug, trace, warn};

use crate::device::{DeviceSession, VariantDescriptor};
use crate::error::Result;
use crate::image_ops::{self, PreparedImage};

/// Full wire reports for one key image: header, payload, zero padding.
///
/// `key` is the logical index; the device index is derived from it.
pub fn image_reports<'a>(
    variant: &'a VariantDescriptor,
    key: u8,
    prepared: &'a PreparedImage,
) -> impl Iterator<Item = Vec<u8>> + 'a {
    let device_key = variant.translate_key_index(key);
    prepared.pages().map(move |page| {
        let header = variant.image_page_header(page.index, device_key, page.payload.len(), page.is_last);
        let mut report = vec![0u8; variant.image_report_size];
        report[..header.len()].copy_from_slice(&header);
        report[header.len()..header.len() + page.payload.len()].copy_from_slice(page.payload);
        report
    })
}

impl DeviceSession {
    /// Show `img` on logical key `key`.
    ///
    /// The image is resized to the key if needed. Encoding finishes before
    /// anything is written; a write failure leaves the key partially updated.
    pub fn set_image(&self, key: u8, img: &DynamicImage) -> Result<()> {
        let prepared = PreparedImage::prepare(self.variant(), img)?;
        self.send_prepared(key, &prepared)
    }

    /// Write an already prepared image as one uninterrupted transfer.
    pub fn send_prepared(&self, key: u8, prepared: &PreparedImage) -> Result<()> {
        let writer = self.lock_writer()?;
        for (page, report) in image_reports(self.variant(), key, prepared).enumerate() {
            writer.write(&report).inspect_err(|e| {
                warn!(key, page, len = report.len(), error = %e, "Cannot write image page");
            })?;
            trace!(key, page, "Sent image page");
        }
        debug!(key, pages = prepared.page_count(), "Key image updated");
        Ok(())
    }

    pub fn set_image_from_file(&self, key: u8, path: &Path) -> Result<()> {
        let img = image_ops::load_image(path)?;
        self.set_image(key, &img)
    }

    /// Fill a key with one colour.
    pub fn fill_color(&self, key: u8, color: Rgb<u8>) -> Result<()> {
        self.set_image(key, &image_ops::solid(self.variant().pixels, color))
    }

    /// Black out every key.
    ///
    /// Covers indices `0..=columns*rows`, one past the last key.
    pub fn clear(&self) -> Result<()> {
        let variant = self.variant();
        let black = PreparedImage::prepare(variant, &image_ops::solid(variant.pixels, Rgb([0, 0, 0])))?;
        for key in 0..=variant.grid_keys() {
            self.send_prepared(key, &black)?;
        }
        Ok(())
    }
}
