//! Text labels composited onto key images before transfer.

use std::path::{Path, PathBuf};

use ab_glyph::{FontVec, PxScale};
use image::{DynamicImage, Rgba};
use imageproc::drawing::draw_text_mut;
use tracing::debug;

use crate::device::DeviceSession;
use crate::error::{DeckError, Result};

pub const DEFAULT_FONT: &str = "/usr/share/fonts/adwaita-sans-fonts/AdwaitaSans-Regular.ttf";
/// Points.
pub const DEFAULT_FONT_SIZE: f32 = 14.0;

/// How a label is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    /// TrueType/OpenType file; [`DEFAULT_FONT`] when unset
    pub font_path: Option<PathBuf>,
    /// Size in points; [`DEFAULT_FONT_SIZE`] when unset
    pub size: Option<f32>,
    pub color: Rgba<u8>,
    /// Top-left corner of the text box, in pixels
    pub anchor: (i32, i32),
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_path: None,
            size: None,
            color: Rgba([255, 255, 255, 255]),
            anchor: (0, 0),
        }
    }
}

impl TextStyle {
    pub fn font_path(&self) -> &Path {
        self.font_path
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_FONT))
    }

    /// Glyph height in pixels at `dpi`.
    pub fn pixel_size(&self, dpi: u32) -> f32 {
        self.size.unwrap_or(DEFAULT_FONT_SIZE) * dpi as f32 / 72.0
    }
}

/// Parse `RRGGBB` or `RRGGBBAA`, with or without a leading `#`.
pub fn parse_color(s: &str) -> Result<Rgba<u8>> {
    let hex = s.trim().trim_start_matches('#');
    let bytes = hex::decode(hex).map_err(|_| DeckError::InvalidColor(s.to_string()))?;
    match bytes.as_slice() {
        &[r, g, b] => Ok(Rgba([r, g, b, 255])),
        &[r, g, b, a] => Ok(Rgba([r, g, b, a])),
        _ => Err(DeckError::InvalidColor(s.to_string())),
    }
}

pub fn load_font(path: &Path) -> Result<FontVec> {
    let data = std::fs::read(path).map_err(|e| DeckError::Font {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    FontVec::try_from_vec(data).map_err(|e| DeckError::Font {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Draw `text` onto a copy of `img`, sizing glyphs for a panel of `dpi`.
pub fn compose_text(img: &DynamicImage, text: &str, style: &TextStyle, dpi: u32) -> Result<DynamicImage> {
    let font = load_font(style.font_path())?;
    let px = style.pixel_size(dpi);
    debug!(text, px, font = %style.font_path().display(), "Compositing label");

    let mut canvas = img.to_rgba8();
    let (x, y) = style.anchor;
    draw_text_mut(&mut canvas, style.color, x, y, PxScale::from(px), &font, text);
    Ok(DynamicImage::ImageRgba8(canvas))
}

impl DeviceSession {
    /// [`compose_text`] at this device's DPI.
    pub fn compose_text(&self, img: &DynamicImage, text: &str, style: &TextStyle) -> Result<DynamicImage> {
        compose_text(img, text, style, self.variant().dpi)
    }
}
