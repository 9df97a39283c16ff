//! Bulk vehicle import from spreadsheet CSV exports.
//!
//! | Stage | Module | Failure scope |
//! |-------|--------|---------------|
//! | Size, decode, parse, header check | [`parse`] | whole file ([`CsvValidationError`]) |
//! | Field coercion | [`fields`] | none (pure helpers) |
//! | Row validation, VIN lookup, classification | [`validate`] | one row (skip list) |
//! | Writes | [`execute`] | one row (error list) |
//! | Report | [`outcome`] | n/a |
//!
//! Dry runs go through every stage except [`execute`], so a dry run and the
//! real import report identical counts and previews for the same file and
//! store contents.

pub mod execute;
pub mod fields;
pub mod outcome;
pub mod parse;
pub mod template;
pub mod validate;

pub use execute::{PlannedRow, generate_stock_number};
pub use outcome::{ImportCounts, ImportOutcome, PreviewRow, RowAction, SkippedRow};
pub use template::csv_template;
pub use validate::{Classification, RowCheck, VehicleRow, validate_row};

use crate::config::ImportConfig;
use crate::store::{DocumentStore, StoreError, timestamp};
use chrono::Datelike;
use std::collections::HashMap;
use thiserror::Error;
use tracing::info;

/// Problems that reject a file before any row is considered.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CsvValidationError {
    #[error("CSV file too large. Maximum size is {max_mb}MB")]
    TooLarge { max_mb: u32 },
    #[error("Unable to decode CSV file. Please use UTF-8 encoding.")]
    Encoding,
    #[error("CSV file has no headers")]
    NoHeaders,
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("CSV file contains no data rows")]
    NoDataRows,
    #[error("Malformed CSV: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Csv(#[from] CsvValidationError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Validate, classify and (unless `dry_run`) persist every row of `content`.
pub fn run_import(
    store: &impl DocumentStore,
    content: &[u8],
    dry_run: bool,
    config: &ImportConfig,
) -> Result<ImportOutcome, ImportError> {
    let year = i64::from(chrono::Local::now().year());
    import_for_year(store, content, dry_run, config, year)
}

fn import_for_year(
    store: &impl DocumentStore,
    content: &[u8],
    dry_run: bool,
    config: &ImportConfig,
    current_year: i64,
) -> Result<ImportOutcome, ImportError> {
    let parsed = parse::read_csv(content, config.max_csv_mb)?;
    let existing = validate::existing_vins(store)?;

    let mut outcome = ImportOutcome::new(dry_run, parsed.headers);
    outcome.counts.total_rows = parsed.rows.len();

    let mut planned = Vec::new();
    let mut first_seen: HashMap<String, usize> = HashMap::new();

    for raw in &parsed.rows {
        let mut check = validate_row(raw, current_year);
        if let RowCheck::Valid { row, .. } = &check
            && let Some(first) = first_seen.get(&row.vin)
        {
            check = RowCheck::Invalid {
                errors: vec![format!(
                    "Row {}: Duplicate VIN {} (already in row {first})",
                    raw.number, row.vin
                )],
            };
        }

        match check {
            RowCheck::Invalid { errors } => {
                outcome.errors.extend(errors.iter().cloned());
                outcome.skipped_rows.push(SkippedRow {
                    row: raw.number,
                    vin: raw
                        .raw("vin")
                        .filter(|v| !v.trim().is_empty())
                        .unwrap_or("N/A")
                        .to_string(),
                    reasons: errors,
                });
                outcome.counts.skipped += 1;
            }
            RowCheck::Valid { row, warnings } => {
                first_seen.insert(row.vin.clone(), raw.number);
                outcome.warnings.extend(warnings);

                let action = validate::classify(&row.vin, &existing);
                match action {
                    Classification::Create => outcome.counts.to_create += 1,
                    Classification::Update(_) => outcome.counts.to_update += 1,
                }
                outcome.counts.valid_rows += 1;

                if outcome.preview.len() < config.preview_rows {
                    outcome.preview.push(PreviewRow {
                        row: raw.number,
                        vin: row.vin.clone(),
                        vehicle: row.label(),
                        action: match action {
                            Classification::Create => RowAction::Create,
                            Classification::Update(_) => RowAction::Update,
                        },
                        price: row.price,
                    });
                }
                planned.push(PlannedRow {
                    number: raw.number,
                    row,
                    action,
                });
            }
        }
    }

    info!(
        total = outcome.counts.total_rows,
        valid = outcome.counts.valid_rows,
        to_create = outcome.counts.to_create,
        to_update = outcome.counts.to_update,
        skipped = outcome.counts.skipped,
        dry_run,
        "validated import"
    );

    if dry_run {
        return Ok(outcome);
    }

    execute::execute(store, &planned, &timestamp(), config, &mut outcome);
    outcome.settle();
    Ok(outcome)
}
