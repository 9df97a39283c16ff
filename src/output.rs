//! CLI output formatting for every command.
//!
//! # Output Format
//!
//! ## Import
//!
//! ```text
//! Import (dry run)
//!     Rows: 3 total, 2 valid, 1 skipped
//!     Plan: 1 to create, 1 to update
//!
//! Preview
//! 002 1HGCM82633A123456 2020 Honda Accord → create $32500
//! 003 2HGCM82633A123456 2021 Toyota Camry → update
//!
//! Skipped
//! 004 N/A
//!     Row 4: VIN is required
//! ```
//!
//! ## Images
//!
//! ```text
//! 001 /admin-vehicles/v1/a.jpg (primary)
//!     Thumbnail: /admin-vehicles/v1/a_thumb.jpg
//!     Upload: 5b0c…
//! 002 embedded image/jpeg
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::images::cleaning::{BatchCleaningReport, VehicleCleaning};
use crate::images::{ImageRecord, MigrationReport, UploadResponse};
use crate::import::{ImportOutcome, RowAction};

// ============================================================================
// Shared helpers
// ============================================================================

fn index(i: usize) -> String {
    format!("{:03}", i + 1)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Image references for display; embedded data shows as its MIME type.
fn short_url(url: &str) -> String {
    match url.strip_prefix("data:").and_then(|rest| rest.split_once(';')) {
        Some((mime, _)) => format!("embedded {mime}"),
        None => url.to_string(),
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

// ============================================================================
// Import
// ============================================================================

pub fn format_import_outcome(outcome: &ImportOutcome) -> Vec<String> {
    let c = &outcome.counts;
    let mut lines = vec![
        if outcome.dry_run {
            "Import (dry run)".to_string()
        } else {
            "Import".to_string()
        },
        format!(
            "    Rows: {} total, {} valid, {} skipped",
            c.total_rows, c.valid_rows, c.skipped
        ),
        format!("    Plan: {} to create, {} to update", c.to_create, c.to_update),
    ];
    if !outcome.dry_run {
        lines.push(format!("    Written: {} created, {} updated", c.created, c.updated));
    }

    if !outcome.preview.is_empty() {
        lines.push(String::new());
        lines.push("Preview".to_string());
        for p in &outcome.preview {
            let action = match p.action {
                RowAction::Create => "create",
                RowAction::Update => "update",
            };
            let mut line = format!("{:03} {} {} → {action}", p.row, p.vin, p.vehicle);
            if let Some(price) = p.price {
                line.push_str(&format!(" ${price}"));
            }
            lines.push(line);
        }
        let hidden = c.valid_rows.saturating_sub(outcome.preview.len());
        if hidden > 0 {
            lines.push(format!("    … and {} more", plural(hidden, "row")));
        }
    }

    if !outcome.skipped_rows.is_empty() {
        lines.push(String::new());
        lines.push("Skipped".to_string());
        for s in &outcome.skipped_rows {
            lines.push(format!("{:03} {}", s.row, s.vin));
            lines.extend(s.reasons.iter().map(|r| format!("    {r}")));
        }
    }

    if !outcome.warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        lines.extend(outcome.warnings.iter().map(|w| format!("    {w}")));
    }

    // Row rejections are already listed under their rows.
    let write_errors: Vec<&String> = outcome
        .errors
        .iter()
        .filter(|e| !outcome.skipped_rows.iter().any(|s| s.reasons.contains(e)))
        .collect();
    if !write_errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors".to_string());
        lines.extend(write_errors.iter().map(|e| format!("    {e}")));
    }

    if !outcome.dry_run {
        lines.push(String::new());
        lines.push(if outcome.success {
            "Import succeeded".to_string()
        } else {
            "Import failed".to_string()
        });
    }
    lines
}

pub fn print_import_outcome(outcome: &ImportOutcome) {
    print_lines(format_import_outcome(outcome));
}

// ============================================================================
// Images
// ============================================================================

pub fn format_image_list(records: &[ImageRecord]) -> Vec<String> {
    if records.is_empty() {
        return vec!["No photos".to_string()];
    }
    let mut lines = Vec::new();
    for (i, r) in records.iter().enumerate() {
        let marker = if r.is_primary { " (primary)" } else { "" };
        lines.push(format!("{} {}{marker}", index(i), short_url(&r.url)));
        if let Some(thumb) = &r.thumbnail_url {
            lines.push(format!("    Thumbnail: {}", short_url(thumb)));
        }
        if let Some(name) = &r.original_filename {
            lines.push(format!("    Source: {name}"));
        }
        if r.clean.is_some() {
            lines.push("    Cleaned".to_string());
        }
        lines.push(format!("    Upload: {}", r.upload_id));
    }
    lines
}

pub fn print_image_list(records: &[ImageRecord]) {
    print_lines(format_image_list(records));
}

pub fn format_upload_response(response: &UploadResponse) -> Vec<String> {
    let failed = response.errors.as_ref().map_or(0, Vec::len);
    let mut lines = vec![format!(
        "Uploaded {} of {} ({} total)",
        response.uploaded_count,
        plural(response.uploaded_count + failed, "file"),
        plural(response.total_images, "photo"),
    )];
    lines.extend(format_image_list(&response.images));
    if let Some(errors) = &response.errors {
        lines.push(String::new());
        lines.push("Failed".to_string());
        lines.extend(
            errors
                .iter()
                .map(|f| format!("    {}: {}", f.filename, f.error)),
        );
    }
    lines
}

pub fn print_upload_response(response: &UploadResponse) {
    print_lines(format_upload_response(response));
}

pub fn format_migration_report(report: &MigrationReport) -> Vec<String> {
    vec![format!(
        "Migrated {}, skipped {}",
        plural(report.migrated, "vehicle"),
        report.skipped
    )]
}

pub fn print_migration_report(report: &MigrationReport) {
    print_lines(format_migration_report(report));
}

// ============================================================================
// Cleaning
// ============================================================================

pub fn format_vehicle_cleaning(result: &VehicleCleaning) -> Vec<String> {
    let mut lines = vec![format!(
        "{}: {} cleaned, {} skipped",
        result.vehicle_id,
        plural(result.processed, "image"),
        result.skipped
    )];
    lines.extend(result.errors.iter().map(|e| format!("    {e}")));
    lines
}

pub fn print_vehicle_cleaning(result: &VehicleCleaning) {
    print_lines(format_vehicle_cleaning(result));
}

pub fn format_cleaning_report(report: &BatchCleaningReport) -> Vec<String> {
    let mut lines = vec![format!(
        "Checked {}: {} cleaned, {} skipped",
        plural(report.vehicles_checked, "vehicle"),
        plural(report.images_processed, "image"),
        report.images_skipped
    )];
    for v in &report.vehicle_results {
        lines.push(format!("    {}: {}", v.vehicle_id, plural(v.processed, "image")));
    }
    if !report.errors.is_empty() {
        lines.push(String::new());
        lines.push("Errors".to_string());
        lines.extend(report.errors.iter().map(|e| format!("    {e}")));
    }
    lines
}

pub fn print_cleaning_report(report: &BatchCleaningReport) {
    print_lines(format_cleaning_report(report));
}
