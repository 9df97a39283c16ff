//! The report handed back for every import, dry run or not.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowAction {
    Create,
    Update,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportCounts {
    pub total_rows: usize,
    pub valid_rows: usize,
    pub to_create: usize,
    pub to_update: usize,
    /// Rejected by validation plus rows whose write failed.
    pub skipped: usize,
    pub created: usize,
    pub updated: usize,
}

/// One of the first accepted rows, for showing before committing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub row: usize,
    pub vin: String,
    /// `"{year} {make} {model}"`.
    pub vehicle: String,
    pub action: RowAction,
    pub price: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    /// The VIN cell as given, or `"N/A"` when blank.
    pub vin: String,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportOutcome {
    pub success: bool,
    pub dry_run: bool,
    pub counts: ImportCounts,
    pub preview: Vec<PreviewRow>,
    pub errors: Vec<String>,
    pub skipped_rows: Vec<SkippedRow>,
    pub headers: Vec<String>,
    pub warnings: Vec<String>,
}

impl ImportOutcome {
    pub(crate) fn new(dry_run: bool, headers: Vec<String>) -> Self {
        Self {
            success: true,
            dry_run,
            counts: ImportCounts::default(),
            preview: Vec::new(),
            errors: Vec::new(),
            skipped_rows: Vec::new(),
            headers,
            warnings: Vec::new(),
        }
    }

    /// Best effort: no errors at all, or at least one row actually written.
    pub(crate) fn settle(&mut self) {
        self.success =
            self.errors.is_empty() || self.counts.created + self.counts.updated > 0;
    }
}
