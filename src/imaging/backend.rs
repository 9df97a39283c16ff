//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the four operations the upload and
//! cleaning pipelines need: identify, render, thumbnail, and clean. All of
//! them work on in-memory byte buffers. Uploads arrive as multipart bodies
//! and results are stored inline in the vehicle document, so nothing touches
//! the filesystem.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend): pure Rust, built on the
//! `image` crate.

use super::params::{CleanParams, RenderParams, ThumbnailParams};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The bytes are not a well-formed image in any enabled format.
    #[error("Invalid or corrupted image file: {0}")]
    Decode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Encoded derivatives of one source photo after branding removal.
///
/// `orig` is the orientation-corrected source, `clean` the cropped one; the
/// three sized derivatives are present only when requested.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanedImage {
    pub orig: Vec<u8>,
    pub clean: Vec<u8>,
    pub full: Option<Vec<u8>>,
    pub display: Option<Vec<u8>>,
    pub thumb: Option<Vec<u8>>,
}

/// Trait for image processing backends.
///
/// `identify` doubles as the well-formedness check: it must fail with
/// [`BackendError::Decode`] on anything that does not fully decode.
pub trait ImageBackend: Sync {
    /// Decode the image and report its stored dimensions.
    fn identify(&self, content: &[u8]) -> Result<Dimensions, BackendError>;

    /// Orient, flatten, bound and encode the main derivative.
    fn render(&self, content: &[u8], params: &RenderParams) -> Result<Vec<u8>, BackendError>;

    /// Orient, flatten, center-crop to an exact box and encode.
    fn thumbnail(&self, content: &[u8], params: &ThumbnailParams)
    -> Result<Vec<u8>, BackendError>;

    /// Produce the branding-removal derivative set.
    fn clean(&self, content: &[u8], params: &CleanParams) -> Result<CleanedImage, BackendError>;
}
