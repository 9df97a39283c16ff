//! Ordered image list with a single primary.
//!
//! A vehicle's primary photo is encoded twice: it is element 0 *and* the only
//! record with `is_primary = true`. Every mutation here goes through
//! [`rebuild`], which derives both from one chosen index, so the two can never
//! disagree after a write.

use super::ImageListError;
use super::record::ImageRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageList {
    records: Vec<ImageRecord>,
}

/// Move `records[primary]` to the front and set flags to match.
fn rebuild(mut records: Vec<ImageRecord>, primary: usize) -> Vec<ImageRecord> {
    if primary < records.len() {
        let chosen = records.remove(primary);
        records.insert(0, chosen);
    }
    for (i, r) in records.iter_mut().enumerate() {
        r.is_primary = i == 0;
    }
    records
}

impl ImageList {
    /// Canonicalize an arbitrary record list. The first flagged record wins;
    /// with none flagged, element 0 becomes primary.
    pub fn from_records(records: Vec<ImageRecord>) -> Self {
        let primary = records.iter().position(|r| r.is_primary).unwrap_or(0);
        Self {
            records: rebuild(records, primary),
        }
    }

    pub fn records(&self) -> &[ImageRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ImageRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn primary(&self) -> Option<&ImageRecord> {
        self.records.first()
    }

    /// The flattened URL list written to `photo_urls`.
    pub fn urls(&self) -> Vec<String> {
        self.records.iter().map(|r| r.url.clone()).collect()
    }

    fn check_index(&self, index: usize) -> Result<(), ImageListError> {
        if index >= self.records.len() {
            return Err(ImageListError::IndexOutOfRange {
                index,
                len: self.records.len(),
            });
        }
        Ok(())
    }

    /// Make `records[index]` the primary; the rest keep their relative order.
    pub fn set_primary(&mut self, index: usize) -> Result<(), ImageListError> {
        self.check_index(index)?;
        self.records = rebuild(std::mem::take(&mut self.records), index);
        Ok(())
    }

    /// Remove by position. If the primary goes, the new first element takes over.
    pub fn remove_at(&mut self, index: usize) -> Result<ImageRecord, ImageListError> {
        self.check_index(index)?;
        let mut records = std::mem::take(&mut self.records);
        let removed = records.remove(index);
        let primary = records.iter().position(|r| r.is_primary).unwrap_or(0);
        self.records = rebuild(records, primary);
        Ok(removed)
    }

    pub fn remove_by_id(&mut self, upload_id: &str) -> Result<ImageRecord, ImageListError> {
        let index = self
            .records
            .iter()
            .position(|r| r.upload_id == upload_id)
            .ok_or_else(|| ImageListError::UnknownUploadId(upload_id.to_string()))?;
        self.remove_at(index)
    }

    /// Append new records. A flagged incoming record takes over as primary;
    /// otherwise the current primary stays.
    pub fn append(&mut self, incoming: Vec<ImageRecord>) {
        let offset = self.records.len();
        let primary = incoming
            .iter()
            .position(|r| r.is_primary)
            .map(|i| offset + i)
            .unwrap_or(0);
        let mut records = std::mem::take(&mut self.records);
        records.extend(incoming);
        self.records = rebuild(records, primary);
    }
}
