//! Reconcile the historical image shapes into canonical records.
//!
//! Vehicle documents have stored their photos three ways over time:
//!
//! 1. `images`: the canonical `ImageRecord[]` (occasionally with bare URL
//!    strings mixed in by older writers)
//! 2. `photo_urls`: a flat URL list, index 0 implicitly primary
//! 3. `imageUrls`: the same flat list under another name
//!
//! [`StoredImages::classify`] picks the shape once at the read boundary and
//! [`normalize`] turns it into records; nothing downstream ever looks at the
//! raw fields. [`migrate_all`] rewrites legacy documents in place so the
//! classification eventually only ever sees the canonical shape.

use super::list::ImageList;
use super::record::{
    IMAGE_URLS_FIELD, IMAGES_FIELD, ImageEntry, ImageRecord, PHOTO_URLS_FIELD, records_to_value,
};
use crate::store::{Document, DocumentStore, Filter, StoreError, document_id};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Which shape a document's image data is in, resolved by field precedence.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredImages<'a> {
    Canonical(&'a [Value]),
    LegacyPhotoUrls(&'a [Value]),
    LegacyImageUrls(&'a [Value]),
    Empty,
}

fn non_empty_array<'a>(doc: &'a Document, field: &str) -> Option<&'a [Value]> {
    match doc.get(field)? {
        Value::Array(items) if !items.is_empty() => Some(items),
        Value::Array(_) | Value::Null => None,
        other => {
            warn!(field, value = %other, "image field is not a list, ignoring");
            None
        }
    }
}

impl<'a> StoredImages<'a> {
    pub fn classify(doc: &'a Document) -> Self {
        if let Some(items) = non_empty_array(doc, IMAGES_FIELD) {
            StoredImages::Canonical(items)
        } else if let Some(items) = non_empty_array(doc, PHOTO_URLS_FIELD) {
            StoredImages::LegacyPhotoUrls(items)
        } else if let Some(items) = non_empty_array(doc, IMAGE_URLS_FIELD) {
            StoredImages::LegacyImageUrls(items)
        } else {
            StoredImages::Empty
        }
    }

    /// True when no rewrite is needed: every canonical entry is a structured
    /// record that already carries its `upload_id`. Anything else gets ids
    /// generated on read, which only stay valid once written back.
    pub fn is_migrated(&self) -> bool {
        matches!(self, StoredImages::Canonical(items) if items.iter().all(has_upload_id))
    }

    pub fn into_records(self) -> Vec<ImageRecord> {
        match self {
            StoredImages::Canonical(items) => parse_entries(items, |_| false),
            StoredImages::LegacyPhotoUrls(items) | StoredImages::LegacyImageUrls(items) => {
                parse_entries(items, |i| i == 0)
            }
            StoredImages::Empty => Vec::new(),
        }
    }
}

fn has_upload_id(item: &Value) -> bool {
    item.get("upload_id")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty())
}

/// Parse each element; bare strings become records flagged by `primary_at`,
/// structured entries are kept as they are, anything else is dropped.
fn parse_entries(items: &[Value], primary_at: impl Fn(usize) -> bool) -> Vec<ImageRecord> {
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| match ImageEntry::parse(item) {
            Some(ImageEntry::Record(r)) => Some(r),
            Some(ImageEntry::Url(url)) => Some(ImageRecord::from_url(url, primary_at(i))),
            None => {
                warn!(index = i, value = %item, "skipping malformed image entry");
                None
            }
        })
        .collect()
}

/// Canonical records for whatever shape `doc` stores its photos in.
///
/// Idempotent: a document holding the output of a previous call normalizes
/// to the same records.
pub fn normalize(doc: &Document) -> Vec<ImageRecord> {
    StoredImages::classify(doc).into_records()
}

/// The `$set` payload that persists a list in both representations.
pub fn image_fields(list: &ImageList) -> Document {
    let mut set = Map::new();
    set.insert(IMAGES_FIELD.into(), records_to_value(list.records()));
    set.insert(
        PHOTO_URLS_FIELD.into(),
        Value::Array(list.urls().into_iter().map(Value::String).collect()),
    );
    set
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub migrated: usize,
    pub skipped: usize,
}

/// Rewrite every legacy-shaped document into the canonical shape.
///
/// Documents whose records all carry an `upload_id`, and documents with no
/// photos at all, are skipped without a write. Safe to run repeatedly.
pub fn migrate_all(store: &impl DocumentStore) -> Result<MigrationReport, StoreError> {
    let docs = store.find(
        &Filter::All,
        Some(&[IMAGES_FIELD, PHOTO_URLS_FIELD, IMAGE_URLS_FIELD]),
    )?;

    let mut report = MigrationReport::default();
    for doc in &docs {
        let stored = StoredImages::classify(doc);
        let Some(id) = document_id(doc) else {
            warn!("document without _id, skipping migration");
            report.skipped += 1;
            continue;
        };
        if stored.is_migrated() {
            report.skipped += 1;
            continue;
        }
        let records = stored.into_records();
        if records.is_empty() {
            report.skipped += 1;
            continue;
        }

        let list = ImageList::from_records(records);
        store.update_one(&Filter::Id(id.to_string()), image_fields(&list))?;
        info!(vehicle_id = id, images = list.len(), "migrated image schema");
        report.migrated += 1;
    }
    Ok(report)
}
