//! Uploaded file → stored-ready [`ImageRecord`].
//!
//! ```text
//! validate (ext, size, content-type, decode)
//!   → render (orient → RGB → bound → encode)
//!   → thumbnail (orient → RGB → center crop → encode)   [optional]
//!   → data URLs → ImageRecord { upload_id: fresh }
//! ```
//!
//! A batch processes every file independently: per-file failures are
//! collected next to the successes and only an all-failed batch is an error.
//! The per-vehicle capacity check runs before any file is touched.

use super::record::ImageRecord;
use super::{BatchError, ImageError};
use crate::imaging::{
    BackendError, ImageBackend, RenderParams, ThumbnailParams, bytes_to_text,
    supported_input_extensions,
};
use serde::Serialize;
use std::path::Path;
use tracing::{info, warn};

/// MIME types accepted when the client declares one.
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// One file from a multipart upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: Option<String>,
    pub content: Vec<u8>,
}

impl Upload {
    /// Build an upload from a file on disk, guessing nothing about its type.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            filename,
            content_type: None,
            content: std::fs::read(path)?,
        })
    }
}

/// Everything the pipeline needs to know from configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadConfig {
    pub render: RenderParams,
    pub thumbnail: ThumbnailParams,
    pub max_upload_mb: u32,
    pub max_per_vehicle: usize,
}

/// A file that did not make it into the vehicle, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub filename: String,
    pub error: String,
}

/// Result of a batch in which at least one file succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub records: Vec<ImageRecord>,
    pub failures: Vec<UploadFailure>,
}

fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

/// Reject anything that is not a reasonably-sized, well-formed image.
///
/// Checks run cheapest first: extension, size, declared content type, and
/// finally a full decode through the backend.
pub fn validate_upload(
    backend: &impl ImageBackend,
    upload: &Upload,
    config: &UploadConfig,
) -> Result<(), ImageError> {
    let ext = extension_of(&upload.filename);
    let allowed: Vec<String> = supported_input_extensions()
        .iter()
        .map(|e| format!(".{e}"))
        .collect();
    if !allowed.contains(&ext) {
        return Err(ImageError::Validation(format!(
            "Invalid file type '{ext}'. Allowed: {}",
            allowed.join(", ")
        )));
    }

    let size_mb = upload.content.len() as f64 / BYTES_PER_MB;
    if size_mb > config.max_upload_mb as f64 {
        return Err(ImageError::Validation(format!(
            "File too large ({size_mb:.1}MB). Maximum: {}MB",
            config.max_upload_mb
        )));
    }

    if let Some(ct) = upload.content_type.as_deref()
        && !ct.is_empty()
        && !ALLOWED_MIME_TYPES.contains(&ct)
    {
        return Err(ImageError::Validation(format!(
            "Invalid content type '{ct}'. Allowed: {}",
            ALLOWED_MIME_TYPES.join(", ")
        )));
    }

    backend
        .identify(&upload.content)
        .map(|_| ())
        .map_err(|e| ImageError::Validation(e.to_string()))
}

fn processing(e: BackendError) -> ImageError {
    ImageError::Processing(e.to_string())
}

/// Turn one uploaded file into a record with embedded derivatives.
pub fn process_upload(
    backend: &impl ImageBackend,
    upload: &Upload,
    is_primary: bool,
    make_thumbnail: bool,
    config: &UploadConfig,
) -> Result<ImageRecord, ImageError> {
    validate_upload(backend, upload, config)?;

    let rendered = backend
        .render(&upload.content, &config.render)
        .map_err(processing)?;
    let url = bytes_to_text(&rendered, config.render.format.mime());

    let thumbnail_url = if make_thumbnail {
        let thumb = backend
            .thumbnail(&upload.content, &config.thumbnail)
            .map_err(processing)?;
        Some(bytes_to_text(&thumb, config.thumbnail.format.mime()))
    } else {
        None
    };

    let mut record = ImageRecord::from_url(url, is_primary);
    record.thumbnail_url = thumbnail_url;
    record.original_filename = Some(upload.filename.clone());
    Ok(record)
}

/// Process a multi-file upload for a vehicle that currently has
/// `current_count` images.
///
/// When the vehicle has no images, the first file that succeeds is flagged
/// primary.
pub fn process_batch(
    backend: &impl ImageBackend,
    uploads: &[Upload],
    current_count: usize,
    make_thumbnail: bool,
    config: &UploadConfig,
) -> Result<BatchOutcome, BatchError> {
    if uploads.is_empty() {
        return Err(BatchError::NoFiles);
    }
    let max = config.max_per_vehicle;
    if current_count + uploads.len() > max {
        return Err(BatchError::CapacityExceeded {
            max,
            current: current_count,
            requested: uploads.len(),
            free_slots: max.saturating_sub(current_count),
        });
    }

    let mut records = Vec::new();
    let mut failures = Vec::new();
    for upload in uploads {
        let is_primary = current_count == 0 && records.is_empty();
        match process_upload(backend, upload, is_primary, make_thumbnail, config) {
            Ok(record) => {
                info!(filename = %upload.filename, "processed upload");
                records.push(record);
            }
            Err(e) => {
                warn!(filename = %upload.filename, error = %e, "upload rejected");
                failures.push(UploadFailure {
                    filename: upload.filename.clone(),
                    error: e.to_string(),
                });
            }
        }
    }

    if records.is_empty() {
        return Err(BatchError::AllFailed(failures));
    }
    Ok(BatchOutcome { records, failures })
}
