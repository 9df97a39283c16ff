//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the upload pipeline (which decides what derivatives to
//! create) and the [`backend`](super::backend) (which does the pixel work).
//! Keeping them plain data lets the pipeline be tested against a mock backend.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`OutputFormat`]: Lossy container the pipeline emits (JPEG or AVIF).
//! - [`CropMargins`]: Per-edge pixel margins stripped before derivatives are made.
//! - [`RenderParams`]: Bound-and-encode: the main display derivative of an upload.
//! - [`ThumbnailParams`]: Exact-box center crop for fixed-aspect thumbnails.
//! - [`CleanParams`]: The multi-derivative branding-removal recipe.

use serde::{Deserialize, Serialize};

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Quality as the `u8` the `image` encoders take.
    pub fn as_u8(self) -> u8 {
        self.0.clamp(1, 100) as u8
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Lossy output format for stored derivatives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Jpeg,
    Avif,
}

impl OutputFormat {
    /// MIME type written into the data URL prefix.
    pub fn mime(self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "image/jpeg",
            OutputFormat::Avif => "image/avif",
        }
    }
}

/// Pixel margins to strip from each edge (dealer banners, watermarks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropMargins {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl CropMargins {
    pub fn is_empty(&self) -> bool {
        self.top == 0 && self.bottom == 0 && self.left == 0 && self.right == 0
    }
}

/// A width × height bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxSize {
    pub width: u32,
    pub height: u32,
}

impl BoxSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Parameters for the main derivative: orient, flatten, bound, encode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParams {
    pub bounds: BoxSize,
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Parameters for a thumbnail operation (center crop to exact box).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailParams {
    pub size: BoxSize,
    pub format: OutputFormat,
    pub quality: Quality,
}

/// Parameters for the branding-removal derivative set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanParams {
    pub margins: CropMargins,
    pub full: BoxSize,
    pub display: BoxSize,
    pub thumb: BoxSize,
    pub quality_full: Quality,
    pub quality_display: Quality,
    pub quality_thumb: Quality,
    pub format: OutputFormat,
    /// When false only `orig` and `clean` are produced.
    pub derivatives: bool,
}
