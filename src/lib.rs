//! # Showroom
//!
//! Inventory media and bulk-import core for a car dealership backend. Two
//! pipelines sit behind a small document-store seam:
//!
//! ```text
//! photos   upload → validate → orient → flatten → resize → encode → data URL → ImageRecord[]
//! CSV      bytes → decode → parse → validate rows → classify by VIN → create | update
//! ```
//!
//! Both pipelines prefer partial success: a bad photo in a batch or a bad row
//! in a spreadsheet is reported and skipped while the rest goes through. Only
//! structural problems (over-capacity batches, undecodable or malformed CSV
//! files) reject the whole request up front.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Pixel layer: EXIF orientation, RGB flattening, resize, crop, JPEG/AVIF encode, data URLs |
//! | [`images`] | Vehicle photo records: legacy-shape normalization, migration, uploads, primary/delete, branding removal |
//! | [`import`] | CSV import: decoding, row validation, VIN classification, dry run and execution |
//! | [`store`] | `DocumentStore` trait and the JSON-file backed `MemoryStore` |
//! | [`config`] | `showroom.toml` loading, environment overrides, validation |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## One Record Shape
//!
//! Vehicle documents have carried photos as plain URL lists under two names
//! and as structured records. [`images::normalize`] resolves whichever shape
//! is present exactly once, at the read boundary; nothing downstream sees the
//! legacy fields. [`images::migrate_all`] rewrites old documents in place.
//!
//! ## Primary Is Position Zero
//!
//! The primary photo is both first in the list and the only record with
//! `is_primary = true`. [`images::ImageList`] owns that pairing: every
//! mutation rebuilds order and flags together so they cannot drift.
//!
//! ## Embedded Images
//!
//! Processed photos are stored as `data:` URLs inside the vehicle document,
//! so a single document read yields everything needed to render a listing.
//!
//! ## Pure-Rust Imaging
//!
//! Decoding, resampling (Lanczos3) and AVIF encoding (via `rav1e`) go through
//! the `image` crate; JPEG is written by `jpeg-encoder` so every output gets an
//! optimized Huffman pass. No system libraries are required.

pub mod config;
pub mod images;
pub mod imaging;
pub mod import;
pub mod output;
pub mod store;

#[cfg(test)]
pub(crate) mod test_helpers;
