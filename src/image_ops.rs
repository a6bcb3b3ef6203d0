//! Image preparation: resize, orient, encode and paginate key images.

use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

use crate::device::VariantDescriptor;
use crate::error::{DeckError, Result};

const BMP_HEADER_LEN: usize = 54;
/// 96 DPI expressed in pixels per metre.
const BMP_PIXELS_PER_METRE: u32 = 3780;

/// Load an image file from disk.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.exists() {
        return Err(DeckError::ImageNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(image::open(path)?)
}

/// A square, all-one-colour key image.
pub fn solid(pixels: u32, color: Rgb<u8>) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(pixels, pixels, color))
}

/// Bilinear resize to `pixels`×`pixels`, unless the image already matches.
pub fn fit_to_key(img: &DynamicImage, pixels: u32) -> DynamicImage {
    if img.dimensions() == (pixels, pixels) {
        img.clone()
    } else {
        img.resize_exact(pixels, pixels, FilterType::Triangle)
    }
}

/// Encode as a 24-bit BMP: 54-byte file + info header, then BGR pixels in
/// source row order with no row padding.
pub fn encode_bmp(img: &DynamicImage) -> Vec<u8> {
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let pixel_bytes = (width * height * 3) as usize;
    let file_len = (BMP_HEADER_LEN + pixel_bytes) as u32;

    let mut out = Vec::with_capacity(BMP_HEADER_LEN + pixel_bytes);
    // BITMAPFILEHEADER
    out.extend_from_slice(b"BM");
    out.extend_from_slice(&file_len.to_le_bytes());
    out.extend_from_slice(&[0; 4]);
    out.extend_from_slice(&(BMP_HEADER_LEN as u32).to_le_bytes());
    // BITMAPINFOHEADER
    out.extend_from_slice(&40u32.to_le_bytes());
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&height.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&24u16.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(pixel_bytes as u32).to_le_bytes());
    out.extend_from_slice(&BMP_PIXELS_PER_METRE.to_le_bytes());
    out.extend_from_slice(&BMP_PIXELS_PER_METRE.to_le_bytes());
    out.extend_from_slice(&[0; 8]);

    for pixel in rgb.pixels() {
        let [r, g, b] = pixel.0;
        out.extend_from_slice(&[b, g, r]);
    }
    out
}

/// Encode as baseline JPEG at full quality.
pub fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, 100).encode_image(&rgb)?;
    Ok(out)
}

/// Encoded key image ready to be split into wire pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedImage {
    payload: Vec<u8>,
    page_size: usize,
}

/// One slice of a [`PreparedImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page<'a> {
    pub index: usize,
    pub payload: &'a [u8],
    pub is_last: bool,
}

impl PreparedImage {
    /// Resize, orient and encode `img` for `variant`.
    pub fn prepare(variant: &VariantDescriptor, img: &DynamicImage) -> Result<Self> {
        let fitted = fit_to_key(img, variant.pixels);
        let oriented = variant.orient(&fitted);
        let payload = variant.encode(&oriented)?;
        Ok(Self::from_encoded(payload, variant.image_page_payload()))
    }

    /// Wrap an already encoded payload.
    ///
    /// # Panics
    ///
    /// Panics if `page_size` is zero.
    pub fn from_encoded(payload: Vec<u8>, page_size: usize) -> Self {
        assert!(page_size > 0, "page size must be non-zero");
        Self { payload, page_size }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub const fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn page_count(&self) -> usize {
        self.payload.len().div_ceil(self.page_size)
    }

    /// The page at `index`, or `None` past the end.
    pub fn page(&self, index: usize) -> Option<Page<'_>> {
        let count = self.page_count();
        if index >= count {
            return None;
        }
        let start = index * self.page_size;
        let end = (start + self.page_size).min(self.payload.len());
        Some(Page {
            index,
            payload: &self.payload[start..end],
            is_last: index == count - 1,
        })
    }

    /// All pages in wire order.
    pub fn pages(&self) -> impl Iterator<Item = Page<'_>> {
        (0..self.page_count()).filter_map(|i| self.page(i))
    }
}
