//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary. Each trait operation is a
//! fixed chain of [`transform`](super::transform) steps:
//!
//! | Operation | Chain |
//! |---|---|
//! | identify | decode |
//! | render | decode → orient → RGB → bound → encode |
//! | thumbnail | decode → orient → RGB → center crop → encode |
//! | clean | decode → orient → RGB → {orig, crop → clean/full/display/thumb} |

use super::backend::{BackendError, CleanedImage, Dimensions, ImageBackend};
use super::params::{CleanParams, RenderParams, ThumbnailParams};
use super::transform;
use image::{DynamicImage, ImageFormat};
use std::sync::LazyLock;

/// Upload extensions and the decoder each one needs.
const UPLOAD_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("webp", ImageFormat::WebP),
    ("gif", ImageFormat::Gif),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    UPLOAD_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the upload file extensions that have working decoders compiled in.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the operation chains.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode, orient upright and flatten to RGB: the common prefix of every chain.
fn load_upright(content: &[u8]) -> Result<DynamicImage, BackendError> {
    let img = transform::decode(content)?;
    Ok(transform::to_rgb(transform::correct_orientation(img, content)))
}

impl ImageBackend for RustBackend {
    fn identify(&self, content: &[u8]) -> Result<Dimensions, BackendError> {
        let img = transform::decode(content)?;
        Ok(Dimensions {
            width: img.width(),
            height: img.height(),
        })
    }

    fn render(&self, content: &[u8], params: &RenderParams) -> Result<Vec<u8>, BackendError> {
        let img = load_upright(content)?;
        let bounded = transform::resize_within(img, params.bounds.width, params.bounds.height);
        transform::encode(&bounded, params.format, params.quality)
    }

    fn thumbnail(
        &self,
        content: &[u8],
        params: &ThumbnailParams,
    ) -> Result<Vec<u8>, BackendError> {
        let img = load_upright(content)?;
        let thumb = transform::center_crop_to_box(img, params.size.width, params.size.height);
        transform::encode(&thumb, params.format, params.quality)
    }

    fn clean(&self, content: &[u8], params: &CleanParams) -> Result<CleanedImage, BackendError> {
        let img = load_upright(content)?;
        let (full_w, full_h) = (params.full.width, params.full.height);

        let orig = transform::encode(
            &transform::resize_within(img.clone(), full_w, full_h),
            params.format,
            params.quality_full,
        )?;

        let cleaned = transform::crop_bounds(img, params.margins);
        let clean = transform::encode(
            &transform::resize_within(cleaned.clone(), full_w, full_h),
            params.format,
            params.quality_full,
        )?;

        if !params.derivatives {
            return Ok(CleanedImage {
                orig,
                clean,
                ..CleanedImage::default()
            });
        }

        // `full` is the same bounding and quality as `clean`
        let full = clean.clone();
        let display = transform::encode(
            &transform::resize_within(
                cleaned.clone(),
                params.display.width,
                params.display.height,
            ),
            params.format,
            params.quality_display,
        )?;
        let thumb = transform::encode(
            &transform::center_crop_to_box(cleaned, params.thumb.width, params.thumb.height),
            params.format,
            params.quality_thumb,
        )?;

        Ok(CleanedImage {
            orig,
            clean,
            full: Some(full),
            display: Some(display),
            thumb: Some(thumb),
        })
    }
}
