//! Vehicle photos: records, normalization, upload pipeline, and cleaning.
//!
//! | Module | Role |
//! |---|---|
//! | [`record`] | `ImageRecord` and the stored field names |
//! | [`list`] | Ordered list with one primary; every mutation is a full rebuild |
//! | [`normalize`] | Legacy → canonical reader, plus `migrate_all` |
//! | [`pipeline`] | Validate → transform → encode for uploaded files |
//! | [`service`] | Store-backed upload / delete / set-primary by vehicle id |
//! | [`cleaning`] | Branding-removal derivatives for already-stored photos |

pub mod cleaning;
pub mod list;
pub mod normalize;
pub mod pipeline;
pub mod record;
pub mod service;

pub use list::ImageList;
pub use normalize::{MigrationReport, StoredImages, migrate_all, normalize};
pub use pipeline::{BatchOutcome, Upload, UploadConfig, UploadFailure};
pub use record::ImageRecord;
pub use service::{UploadResponse, VehicleImageService};

use crate::store::StoreError;
use thiserror::Error;

/// A single file failed. Never fatal to the rest of a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    /// Type, size, or corruption check failed before any processing.
    #[error("{0}")]
    Validation(String),
    /// Validation passed but a later transform or encode step failed.
    #[error("{0}")]
    Processing(String),
}

/// Whole-batch rejection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    #[error("No files provided")]
    NoFiles,
    #[error(
        "Maximum {max} images per vehicle. Vehicle has {current}, tried to add {requested}; {free_slots} slot(s) free"
    )]
    CapacityExceeded {
        max: usize,
        current: usize,
        requested: usize,
        free_slots: usize,
    },
    #[error("All {} uploads failed", .0.len())]
    AllFailed(Vec<UploadFailure>),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageListError {
    #[error("Invalid image index {index} (vehicle has {len} images)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("No image with upload id '{0}'")]
    UnknownUploadId(String),
}

/// Errors from vehicle-scoped image operations.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Vehicle not found: {0}")]
    VehicleNotFound(String),
    #[error(transparent)]
    Batch(#[from] BatchError),
    #[error(transparent)]
    List(#[from] ImageListError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
