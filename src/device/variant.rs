//! Capability table for the supported Stream Deck hardware models.
//!
//! Each model is described by an immutable [`VariantDescriptor`]: grid
//! geometry, report sizes, and the four wire-format hooks (key order, image
//! page header, orientation, pixel codec). The hooks are small enums so a new
//! model is one more descriptor wired to existing (or new) enum arms.

use std::collections::HashMap;

use image::DynamicImage;
use serde::Serialize;

use crate::error::Result;
use crate::image_ops;

/// USB vendor id shared by every supported model.
pub const ELGATO_VENDOR_ID: u16 = 0x0fd9;

/// USB product ids of the models in the builtin table.
pub mod product_id {
    pub const ORIGINAL: u16 = 0x0060;
    pub const MINI: u16 = 0x0063;
    pub const XL: u16 = 0x006c;
    pub const ORIGINAL_V2: u16 = 0x006d;
    pub const MK2: u16 = 0x0080;
    pub const MINI_MK2: u16 = 0x0090;
    pub const NEO: u16 = 0x009a;
}

/// How raw key offsets in a state report map to the visual layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrder {
    /// Row-major, as physically wired.
    Identity,
    /// Each row is reported right-to-left.
    RightToLeft,
}

impl KeyOrder {
    /// Translate a raw key index into a logical one (or back: both policies
    /// are involutions on the grid).
    ///
    /// Total over `u8`: indices past the grid wrap instead of overflowing,
    /// and a zero-column layout maps every index to itself.
    pub const fn translate(self, index: u8, columns: u8) -> u8 {
        match self {
            Self::Identity => index,
            Self::RightToLeft => {
                if columns == 0 {
                    return index;
                }
                let col = index % columns;
                (index - col).wrapping_add(columns - 1 - col)
            }
        }
    }
}

/// Byte layout of the header that precedes every image page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PageHeader {
    /// 16 bytes, one-based page and key numbers.
    Rev1,
    /// 16 bytes, zero-based page and one-based key numbers.
    Mini,
    /// 8 bytes, zero-based key, little-endian length and page.
    Rev2,
}

impl PageHeader {
    pub const fn size(self) -> usize {
        match self {
            Self::Rev1 | Self::Mini => 16,
            Self::Rev2 => 8,
        }
    }

    /// Build the header for one page of an image transfer.
    pub fn build(self, page: usize, key: u8, payload_len: usize, last_page: bool) -> Vec<u8> {
        let last = u8::from(last_page);
        match self {
            Self::Rev1 => {
                let mut header = vec![0x02, 0x01, (page + 1) as u8, 0x00, last, key.wrapping_add(1)];
                header.resize(16, 0);
                header
            }
            Self::Mini => {
                let mut header = vec![0x02, 0x01, page as u8, 0x00, last, key.wrapping_add(1)];
                header.resize(16, 0);
                header
            }
            Self::Rev2 => {
                let len = (payload_len as u16).to_le_bytes();
                let page = (page as u16).to_le_bytes();
                vec![0x02, 0x07, key, last, len[0], len[1], page[0], page[1]]
            }
        }
    }
}

/// Transform applied to a key image before encoding, compensating for how
/// the panel is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    FlipHorizontal,
    /// Horizontal plus vertical flip.
    Rotate180,
    RotateCounterClockwise,
}

impl Orientation {
    pub fn apply(self, img: &DynamicImage) -> DynamicImage {
        match self {
            Self::FlipHorizontal => img.fliph(),
            Self::Rotate180 => img.rotate180(),
            Self::RotateCounterClockwise => img.rotate270(),
        }
    }
}

/// Pixel encoding expected by the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageCodec {
    /// 24-bit BGR bitmap behind a fixed 54-byte header.
    Bmp,
    /// Baseline JPEG at quality 100.
    Jpeg,
}

impl ImageCodec {
    pub fn encode(self, img: &DynamicImage) -> Result<Vec<u8>> {
        match self {
            Self::Bmp => Ok(image_ops::encode_bmp(img)),
            Self::Jpeg => image_ops::encode_jpeg(img),
        }
    }
}

/// Control command templates. The first byte is the report id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSet {
    pub firmware: &'static [u8],
    pub reset: &'static [u8],
    pub brightness: &'static [u8],
}

pub const REV1_COMMANDS: CommandSet = CommandSet {
    firmware: &[0x04],
    reset: &[0x0b, 0x63],
    brightness: &[0x05, 0x55, 0xaa, 0xd1, 0x01],
};

pub const REV2_COMMANDS: CommandSet = CommandSet {
    firmware: &[0x05],
    reset: &[0x03, 0x02],
    brightness: &[0x03, 0x08],
};

/// Immutable description of one hardware model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantDescriptor {
    /// Human-readable model name
    pub name: &'static str,
    pub columns: u8,
    pub rows: u8,
    /// Keys the model advertises (may be less than `columns * rows`)
    pub key_count: u8,
    /// Side length of the square key image
    pub pixels: u32,
    /// Rendering DPI used for text metrics
    pub dpi: u32,
    pub padding: u32,
    pub feature_report_size: usize,
    pub firmware_offset: usize,
    /// Bytes preceding the first key byte in a key-state report
    pub key_state_offset: usize,
    /// Full length of an image page report, header included
    pub image_report_size: usize,
    pub key_order: KeyOrder,
    pub page_header: PageHeader,
    pub orientation: Orientation,
    pub codec: ImageCodec,
    #[serde(skip)]
    pub commands: CommandSet,
}

impl VariantDescriptor {
    pub const ORIGINAL: Self = Self {
        name: "Stream Deck (Original)",
        columns: 5,
        rows: 3,
        key_count: 15,
        pixels: 72,
        dpi: 124,
        padding: 16,
        feature_report_size: 17,
        firmware_offset: 5,
        key_state_offset: 1,
        image_report_size: 7819,
        key_order: KeyOrder::RightToLeft,
        page_header: PageHeader::Rev1,
        orientation: Orientation::FlipHorizontal,
        codec: ImageCodec::Bmp,
        commands: REV1_COMMANDS,
    };

    pub const MINI: Self = Self {
        name: "Stream Deck Mini",
        columns: 3,
        rows: 2,
        key_count: 6,
        pixels: 80,
        dpi: 138,
        padding: 16,
        feature_report_size: 17,
        firmware_offset: 5,
        key_state_offset: 1,
        image_report_size: 1024,
        key_order: KeyOrder::Identity,
        page_header: PageHeader::Mini,
        orientation: Orientation::RotateCounterClockwise,
        codec: ImageCodec::Bmp,
        commands: REV1_COMMANDS,
    };

    pub const ORIGINAL_V2: Self = Self {
        name: "Stream Deck (Original V2)",
        columns: 5,
        rows: 3,
        key_count: 15,
        pixels: 72,
        dpi: 124,
        padding: 16,
        feature_report_size: 32,
        firmware_offset: 6,
        key_state_offset: 4,
        image_report_size: 1024,
        key_order: KeyOrder::Identity,
        page_header: PageHeader::Rev2,
        orientation: Orientation::Rotate180,
        codec: ImageCodec::Jpeg,
        commands: REV2_COMMANDS,
    };

    pub const XL: Self = Self {
        name: "Stream Deck XL",
        columns: 8,
        rows: 4,
        key_count: 32,
        pixels: 96,
        dpi: 166,
        ..Self::ORIGINAL_V2
    };

    pub const NEO: Self = Self {
        name: "Stream Deck Neo",
        columns: 4,
        rows: 3,
        key_count: 10,
        pixels: 96,
        dpi: 166,
        ..Self::ORIGINAL_V2
    };

    /// Number of key slots in the grid.
    pub const fn grid_keys(&self) -> u8 {
        self.columns * self.rows
    }

    /// Length of one key-state report.
    pub const fn key_state_len(&self) -> usize {
        self.key_state_offset + self.grid_keys() as usize
    }

    /// Payload bytes carried by one image page.
    pub const fn image_page_payload(&self) -> usize {
        self.image_report_size - self.page_header.size()
    }

    pub const fn translate_key_index(&self, index: u8) -> u8 {
        self.key_order.translate(index, self.columns)
    }

    pub fn image_page_header(
        &self,
        page: usize,
        key: u8,
        payload_len: usize,
        last_page: bool,
    ) -> Vec<u8> {
        self.page_header.build(page, key, payload_len, last_page)
    }

    pub fn orient(&self, img: &DynamicImage) -> DynamicImage {
        self.orientation.apply(img)
    }

    pub fn encode(&self, img: &DynamicImage) -> Result<Vec<u8>> {
        self.codec.encode(img)
    }
}

/// Explicit map from (vendor id, product id) to model descriptor.
///
/// Discovery only recognises devices present in the registry it is handed,
/// so tests can inject synthetic models.
#[derive(Debug, Clone, Default)]
pub struct VariantRegistry {
    variants: HashMap<(u16, u16), VariantDescriptor>,
}

impl VariantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every model this crate knows how to drive.
    pub fn builtin() -> Self {
        use product_id as pid;

        let v = ELGATO_VENDOR_ID;
        Self::new()
            .with(v, pid::ORIGINAL, VariantDescriptor::ORIGINAL)
            .with(v, pid::MINI, VariantDescriptor::MINI)
            .with(
                v,
                pid::MINI_MK2,
                VariantDescriptor {
                    name: "Stream Deck Mini MK.2",
                    ..VariantDescriptor::MINI
                },
            )
            .with(v, pid::ORIGINAL_V2, VariantDescriptor::ORIGINAL_V2)
            .with(
                v,
                pid::MK2,
                VariantDescriptor {
                    name: "Stream Deck MK.2",
                    ..VariantDescriptor::ORIGINAL_V2
                },
            )
            .with(v, pid::XL, VariantDescriptor::XL)
            .with(v, pid::NEO, VariantDescriptor::NEO)
    }

    /// Builder-style insert.
    pub fn with(mut self, vendor_id: u16, product_id: u16, variant: VariantDescriptor) -> Self {
        self.insert(vendor_id, product_id, variant);
        self
    }

    pub fn insert(&mut self, vendor_id: u16, product_id: u16, variant: VariantDescriptor) {
        self.variants.insert((vendor_id, product_id), variant);
    }

    pub fn lookup(&self, vendor_id: u16, product_id: u16) -> Option<&VariantDescriptor> {
        self.variants.get(&(vendor_id, product_id))
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(u16, u16), &VariantDescriptor)> {
        self.variants.iter()
    }
}
