//! Branding removal for photos that are already attached to vehicles.
//!
//! Dealer feeds often burn a banner into the bottom of every photo. This
//! module re-derives each stored photo from its source: strip the configured
//! margins, then store `orig`/`clean`/`full`/`display`/`thumb` data URLs on the
//! record and point `url`/`thumbnail_url` at the clean display and thumb
//! versions.
//!
//! Sources are fetched through an [`ImageFetcher`]. [`LocalFetcher`] resolves
//! site-relative paths under a public directory and decodes inline data URLs;
//! [`HttpFetcher`] downloads scraped `http(s)` photos. [`SourceFetcher`]
//! routes each reference to the right one.

use super::list::ImageList;
use super::normalize::{image_fields, normalize};
use super::record::ImageRecord;
use super::ServiceError;
use crate::imaging::{CleanParams, FormatError, ImageBackend, bytes_to_text, is_data_url, text_to_bytes};
use crate::store::{Document, DocumentStore, Filter, UPDATED_AT_FIELD, document_id, timestamp};
use serde::Serialize;
use serde_json::Value;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

/// Per-image error messages are cut to this many characters.
const MAX_ERROR_CHARS: usize = 100;
/// How many errors a batch report keeps.
const MAX_REPORTED_ERRORS: usize = 10;
/// How many per-vehicle results a batch report keeps.
const MAX_REPORTED_VEHICLES: usize = 20;
/// Redirect hops followed before a download is abandoned.
const MAX_REDIRECTS: usize = 10;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("no fetcher for source: {0}")]
    Unsupported(String),
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("path escapes the public root: {0}")]
    OutsideRoot(String),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("bad data URL: {0}")]
    Format(#[from] FormatError),
}

/// Retrieve the encoded bytes behind a stored image reference.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Resolves `/admin-vehicles/<id>/<file>`-style paths under a public root.
pub struct LocalFetcher {
    public_root: PathBuf,
}

impl LocalFetcher {
    pub fn new(public_root: impl Into<PathBuf>) -> Self {
        Self {
            public_root: public_root.into(),
        }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, FetchError> {
        let relative = Path::new(url.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(FetchError::OutsideRoot(url.to_string()));
        }
        Ok(self.public_root.join(relative))
    }
}

impl ImageFetcher for LocalFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if is_data_url(url) {
            return Ok(text_to_bytes(url)?.0);
        }
        if is_remote(url) {
            return Err(FetchError::Unsupported(url.to_string()));
        }
        let path = self.resolve(url)?;
        std::fs::read(&path).map_err(|source| FetchError::Io { path, source })
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Downloads `http(s)` sources, following redirects and failing on
/// non-success status codes.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("showroom/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if !is_remote(url) {
            return Err(FetchError::Unsupported(url.to_string()));
        }
        let response = self.client.get(url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// Sends `http(s)` references to `remote` and everything else to `local`.
pub struct SourceFetcher<R> {
    local: LocalFetcher,
    remote: R,
}

impl<R: ImageFetcher> SourceFetcher<R> {
    pub fn new(local: LocalFetcher, remote: R) -> Self {
        Self { local, remote }
    }
}

impl<R: ImageFetcher> ImageFetcher for SourceFetcher<R> {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if is_remote(url) {
            self.remote.fetch(url)
        } else {
            self.local.fetch(url)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleaningStatus {
    NoImages,
    Processed,
}

/// Outcome of cleaning one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleCleaning {
    pub vehicle_id: String,
    pub status: CleaningStatus,
    pub processed: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Short per-vehicle line in a batch report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleSummary {
    pub vehicle_id: String,
    pub processed: usize,
    pub status: CleaningStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchCleaningReport {
    pub vehicles_checked: usize,
    pub images_processed: usize,
    pub images_skipped: usize,
    pub errors: Vec<String>,
    pub vehicle_results: Vec<VehicleSummary>,
}

fn truncate(message: &str) -> String {
    message.chars().take(MAX_ERROR_CHARS).collect()
}

fn needs_cleaning(record: &ImageRecord) -> bool {
    record.clean.is_none()
}

pub struct ImageCleaner<'a, S, B, F> {
    store: &'a S,
    backend: &'a B,
    fetcher: &'a F,
    params: CleanParams,
}

impl<'a, S: DocumentStore, B: ImageBackend, F: ImageFetcher> ImageCleaner<'a, S, B, F> {
    pub fn new(store: &'a S, backend: &'a B, fetcher: &'a F, params: CleanParams) -> Self {
        Self {
            store,
            backend,
            fetcher,
            params,
        }
    }

    /// Where to re-derive from: the uncropped `orig` if an earlier pass stored
    /// one, else the active `url`.
    fn source_of(record: &ImageRecord) -> Option<&str> {
        record
            .orig
            .as_deref()
            .or(Some(record.url.as_str()))
            .filter(|s| !s.is_empty())
    }

    fn clean_record(&self, record: &ImageRecord, source: &str) -> Result<ImageRecord, String> {
        let content = self.fetcher.fetch(source).map_err(|e| e.to_string())?;
        let derived = self
            .backend
            .clean(&content, &self.params)
            .map_err(|e| e.to_string())?;

        let mime = self.params.format.mime();
        let encode = |bytes: &[u8]| bytes_to_text(bytes, mime);
        let mut updated = record.clone();
        updated.orig = Some(encode(&derived.orig));
        updated.clean = Some(encode(&derived.clean));

        match (derived.full, derived.display, derived.thumb) {
            (Some(full), Some(display), Some(thumb)) => {
                updated.full = Some(encode(&full));
                updated.display = Some(encode(&display));
                updated.thumb = Some(encode(&thumb));
                updated.url = encode(&display);
                updated.thumbnail_url = Some(encode(&thumb));
            }
            // Derivatives disabled: the clean crop is served as-is
            _ => updated.url = encode(&derived.clean),
        }
        Ok(updated)
    }

    fn clean_document(&self, doc: &Document, force: bool) -> Result<VehicleCleaning, ServiceError> {
        let vehicle_id = document_id(doc).unwrap_or_default().to_string();
        let records = normalize(doc);
        if records.is_empty() {
            return Ok(VehicleCleaning {
                vehicle_id,
                status: CleaningStatus::NoImages,
                processed: 0,
                skipped: 0,
                errors: Vec::new(),
            });
        }

        let mut processed = 0;
        let mut skipped = 0;
        let mut errors = Vec::new();
        let mut updated = Vec::with_capacity(records.len());

        for record in records {
            let source = Self::source_of(&record)
                .filter(|s| force || (needs_cleaning(&record) && !is_data_url(s)))
                .map(str::to_string);
            let Some(source) = source else {
                skipped += 1;
                updated.push(record);
                continue;
            };

            match self.clean_record(&record, &source) {
                Ok(cleaned) => {
                    processed += 1;
                    updated.push(cleaned);
                }
                Err(e) => {
                    error!(vehicle_id = %vehicle_id, error = %e, "image cleaning failed");
                    errors.push(truncate(&e));
                    updated.push(record);
                }
            }
        }

        if processed > 0 {
            let list = ImageList::from_records(updated);
            let mut set = image_fields(&list);
            set.insert(UPDATED_AT_FIELD.into(), Value::String(timestamp()));
            self.store.update_one(&Filter::Id(vehicle_id.clone()), set)?;
            info!(vehicle_id = %vehicle_id, processed, "cleaned vehicle images");
        }

        Ok(VehicleCleaning {
            vehicle_id,
            status: CleaningStatus::Processed,
            processed,
            skipped,
            errors,
        })
    }

    /// Clean every photo of one vehicle.
    ///
    /// Without `force`, photos that already have a `clean` derivative or
    /// whose source is already inline are left alone.
    pub fn clean_vehicle(&self, vehicle_id: &str, force: bool) -> Result<VehicleCleaning, ServiceError> {
        let doc = self
            .store
            .find_one(&Filter::Id(vehicle_id.to_string()))?
            .ok_or_else(|| ServiceError::VehicleNotFound(vehicle_id.to_string()))?;
        self.clean_document(&doc, force)
    }

    /// Clean up to `limit` vehicles that have photos still needing it (all
    /// vehicles with photos when `force`).
    pub fn run_batch(&self, force: bool, limit: usize) -> Result<BatchCleaningReport, ServiceError> {
        let candidates: Vec<Document> = self
            .store
            .find(&Filter::All, None)?
            .into_iter()
            .filter(|doc| {
                let records = normalize(doc);
                !records.is_empty() && (force || records.iter().any(needs_cleaning))
            })
            .take(limit)
            .collect();

        let mut report = BatchCleaningReport {
            vehicles_checked: candidates.len(),
            ..BatchCleaningReport::default()
        };
        for doc in &candidates {
            let result = self.clean_document(doc, force)?;
            report.images_processed += result.processed;
            report.images_skipped += result.skipped;
            report.errors.extend(result.errors);
            report.vehicle_results.push(VehicleSummary {
                vehicle_id: result.vehicle_id,
                processed: result.processed,
                status: result.status,
            });
        }
        report.errors.truncate(MAX_REPORTED_ERRORS);
        report.vehicle_results.truncate(MAX_REPORTED_VEHICLES);
        Ok(report)
    }
}
