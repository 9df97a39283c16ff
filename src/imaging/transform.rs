//! Pixel-level operations on decoded rasters.
//!
//! Every function here takes and returns a [`DynamicImage`] (or bytes at the
//! edges) and is deterministic. Geometry decisions are delegated to
//! [`calculations`](super::calculations); this module only applies them.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP) | `image::load_from_memory` |
//! | Orientation tag | `kamadak-exif` (`exif::Reader`) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Crop | `DynamicImage::crop_imm` |
//! | Encode → JPEG | `jpeg_encoder::Encoder` (optimized Huffman tables) |
//! | Encode → AVIF | `image::codecs::avif::AvifEncoder` (rav1e, speed 6) |

use super::backend::BackendError;
use super::calculations::{center_crop_box, clamp_crop, fit_within};
use super::params::{CropMargins, OutputFormat, Quality};
use image::codecs::avif::AvifEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use std::io::Cursor;
use tracing::{debug, warn};

/// Decode raw bytes into a raster, sniffing the format from the content.
pub fn decode(content: &[u8]) -> Result<DynamicImage, BackendError> {
    image::load_from_memory(content).map_err(|e| BackendError::Decode(e.to_string()))
}

/// Read the EXIF orientation tag (1–8) from an encoded image, if present.
pub fn read_orientation(content: &[u8]) -> Option<u32> {
    let mut cursor = Cursor::new(content);
    let exif = exif::Reader::new().read_from_container(&mut cursor).ok()?;
    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?
        .value
        .get_uint(0)
}

/// Apply the rotation/mirror that makes an image with the given EXIF
/// orientation display upright. Unknown values leave the image untouched.
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Rotate `img` upright according to the orientation stored in `content`
/// (the bytes it was decoded from). Missing or unreadable metadata is a no-op.
pub fn correct_orientation(img: DynamicImage, content: &[u8]) -> DynamicImage {
    match read_orientation(content) {
        Some(orientation) if orientation != 1 => {
            debug!(orientation, "applying EXIF orientation");
            apply_orientation(img, orientation)
        }
        Some(_) => img,
        None => {
            debug!("no EXIF orientation");
            img
        }
    }
}

/// Normalize to three-channel RGB. Transparent pixels are blended onto white.
pub fn to_rgb(img: DynamicImage) -> DynamicImage {
    if let DynamicImage::ImageRgb8(_) = img {
        return img;
    }
    if !img.color().has_alpha() {
        return DynamicImage::ImageRgb8(img.to_rgb8());
    }

    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let flattened = RgbImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        Rgb([over_white(r, a), over_white(g, a), over_white(b, a)])
    });
    DynamicImage::ImageRgb8(flattened)
}

fn over_white(channel: u8, alpha: u8) -> u8 {
    let (c, a) = (channel as u32, alpha as u32);
    ((c * a + 255 * (255 - a) + 127) / 255) as u8
}

/// Scale down to fit inside `max_width` × `max_height`. Never upscales.
pub fn resize_within(img: DynamicImage, max_width: u32, max_height: u32) -> DynamicImage {
    match fit_within((img.width(), img.height()), (max_width, max_height)) {
        Some((w, h)) => img.resize_exact(w, h, FilterType::Lanczos3),
        None => img,
    }
}

/// Strip per-edge margins, each clamped to 20% of its axis.
pub fn crop_bounds(img: DynamicImage, margins: CropMargins) -> DynamicImage {
    if margins.is_empty() {
        return img;
    }
    match clamp_crop((img.width(), img.height()), margins) {
        Some(b) => img.crop_imm(b.x, b.y, b.width, b.height),
        None => {
            warn!(
                width = img.width(),
                height = img.height(),
                "crop box degenerate, keeping original"
            );
            img
        }
    }
}

/// Crop the longer axis around the center, then resize to exactly `width` × `height`.
pub fn center_crop_to_box(img: DynamicImage, width: u32, height: u32) -> DynamicImage {
    let b = center_crop_box((img.width(), img.height()), (width, height));
    img.crop_imm(b.x, b.y, b.width, b.height)
        .resize_exact(width.max(1), height.max(1), FilterType::Lanczos3)
}

/// Serialize to a lossy format at the given quality.
///
/// Non-RGB inputs are flattened first since neither encoder takes alpha.
pub fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: Quality,
) -> Result<Vec<u8>, BackendError> {
    let flattened;
    let img = match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => img,
        other => {
            flattened = to_rgb(other.clone());
            &flattened
        }
    };

    match format {
        OutputFormat::Jpeg => encode_jpeg(img, quality, true),
        OutputFormat::Avif => {
            let mut buf = Vec::new();
            img.write_with_encoder(AvifEncoder::new_with_speed_quality(
                &mut buf,
                6,
                quality.as_u8(),
            ))
            .map_err(|e| BackendError::ProcessingFailed(format!("Avif encode failed: {e}")))?;
            Ok(buf)
        }
    }
}

/// Baseline JPEG from an 8-bit RGB or grayscale raster. With `optimize`, a
/// second pass builds Huffman tables from the image's own statistics.
fn encode_jpeg(
    img: &DynamicImage,
    quality: Quality,
    optimize: bool,
) -> Result<Vec<u8>, BackendError> {
    let color = match img {
        DynamicImage::ImageLuma8(_) => jpeg_encoder::ColorType::Luma,
        _ => jpeg_encoder::ColorType::Rgb,
    };
    let (Ok(width), Ok(height)) = (u16::try_from(img.width()), u16::try_from(img.height()))
    else {
        return Err(BackendError::ProcessingFailed(format!(
            "{}x{} exceeds the JPEG size limit",
            img.width(),
            img.height()
        )));
    };

    let mut buf = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut buf, quality.as_u8());
    encoder.set_optimized_huffman_tables(optimize);
    encoder
        .encode(img.as_bytes(), width, height, color)
        .map_err(|e| BackendError::ProcessingFailed(format!("Jpeg encode failed: {e}")))?;
    Ok(buf)
}
