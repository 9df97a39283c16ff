//! Image processing: pure Rust, statically linked.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::load_from_memory` (JPEG, PNG, GIF, WebP) |
//! | **Orientation** | `kamadak-exif` tag 0x0112 |
//! | **Resize / crop** | Lanczos3 + `crop_imm` |
//! | **Encode** | JPEG (default, `jpeg-encoder` with optimized Huffman tables) or AVIF via rav1e |
//! | **Storage form** | base64 data URLs |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Transform**: Pixel operations on decoded rasters
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Codec**: bytes ⇄ data URL

pub mod backend;
pub mod calculations;
pub mod codec;
pub mod params;
pub mod rust_backend;
pub mod transform;

pub use backend::{BackendError, CleanedImage, Dimensions, ImageBackend};
pub use codec::{FormatError, bytes_to_text, is_data_url, text_to_bytes};
pub use params::{
    BoxSize, CleanParams, CropMargins, OutputFormat, Quality, RenderParams, ThumbnailParams,
};
pub use rust_backend::{RustBackend, supported_input_extensions};
