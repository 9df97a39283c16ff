//! Shared test utilities for the showroom test suite.
//!
//! Synthetic image encoders (so no binary fixtures are checked in), document
//! builders for the three historical image shapes, CSV builders, and a store
//! wrapper that fails writes on demand.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let photo = jpeg_with_orientation(80, 40, 6);
//! let store = store_with(vec![legacy_vehicle("v1", &["/a.jpg", "/b.jpg"])]);
//! let csv = csv_bytes(VALID_HEADER, &["1HGCM82633A123456,2020,Honda,Civic,18000"]);
//! ```

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use serde_json::{Value, json};
use std::io::Cursor;

use crate::store::{Document, DocumentStore, Filter, MemoryStore, StoreError};

// =========================================================================
// Synthetic images
// =========================================================================

fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }))
}

fn encode_as(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format).unwrap();
    buf
}

/// A small valid baseline JPEG with a color gradient.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_as(&gradient(width, height), ImageFormat::Jpeg)
}

/// A small valid opaque PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode_as(&gradient(width, height), ImageFormat::Png)
}

/// A PNG whose every pixel is fully transparent black.
pub fn transparent_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    encode_as(&DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

/// A JPEG carrying an APP1 Exif segment with the given orientation tag.
///
/// The pixel data is stored un-rotated (`width` × `height`), exactly as a
/// phone camera writes a sideways photo.
pub fn jpeg_with_orientation(width: u32, height: u32, orientation: u16) -> Vec<u8> {
    let jpeg = jpeg_bytes(width, height);

    // Little-endian TIFF header with one IFD0 entry: 0x0112 SHORT x1
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II*\0");
    tiff.extend_from_slice(&8u32.to_le_bytes());
    tiff.extend_from_slice(&1u16.to_le_bytes());
    tiff.extend_from_slice(&0x0112u16.to_le_bytes());
    tiff.extend_from_slice(&3u16.to_le_bytes());
    tiff.extend_from_slice(&1u32.to_le_bytes());
    tiff.extend_from_slice(&orientation.to_le_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_le_bytes());

    let mut payload = b"Exif\0\0".to_vec();
    payload.extend_from_slice(&tiff);
    let segment_len = (payload.len() + 2) as u16;

    let mut out = jpeg[..2].to_vec(); // SOI
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(&payload);
    out.extend_from_slice(&jpeg[2..]);
    out
}

// =========================================================================
// Documents
// =========================================================================

/// Unwrap a `json!` object literal into a [`Document`].
pub fn doc(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

/// A vehicle in the oldest shape: a bare `photo_urls` string list.
pub fn legacy_vehicle(id: &str, urls: &[&str]) -> Document {
    doc(json!({ "_id": id, "vin": "1HGCM82633A123456", "photo_urls": urls }))
}

/// A vehicle with no images at all.
pub fn bare_vehicle(id: &str) -> Document {
    doc(json!({ "_id": id, "vin": "1HGCM82633A123456", "make": "Honda" }))
}

/// A vehicle already in canonical shape with `n` records, the first primary.
pub fn canonical_vehicle(id: &str, n: usize) -> Document {
    let images: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "url": format!("/admin-vehicles/{id}/{i}.jpg"),
                "is_primary": i == 0,
                "thumbnail_url": null,
                "upload_id": format!("up-{i}"),
            })
        })
        .collect();
    let urls: Vec<String> = (0..n)
        .map(|i| format!("/admin-vehicles/{id}/{i}.jpg"))
        .collect();
    doc(json!({ "_id": id, "vin": "1HGCM82633A123456", "images": images, "photo_urls": urls }))
}

pub fn store_with(docs: Vec<Document>) -> MemoryStore {
    MemoryStore::from_documents(docs)
}

// =========================================================================
// CSV
// =========================================================================

/// The five required columns, in template order.
pub const VALID_HEADER: &str = "vin,year,make,model,price";

/// Join a header and rows into CSV bytes with a trailing newline.
pub fn csv_bytes(header: &str, rows: &[&str]) -> Vec<u8> {
    let mut out = String::from(header);
    out.push('\n');
    for row in rows {
        out.push_str(row);
        out.push('\n');
    }
    out.into_bytes()
}

// =========================================================================
// Failing store
// =========================================================================

/// Wraps a [`MemoryStore`] and rejects any insert or update that would write
/// `vin == poisoned_vin`. Reads pass through.
pub struct RejectingStore {
    pub inner: MemoryStore,
    pub poisoned_vin: String,
}

impl RejectingStore {
    pub fn new(inner: MemoryStore, poisoned_vin: &str) -> Self {
        Self {
            inner,
            poisoned_vin: poisoned_vin.to_string(),
        }
    }

    fn check(&self, doc: &Document) -> Result<(), StoreError> {
        if doc.get("vin").and_then(Value::as_str) == Some(self.poisoned_vin.as_str()) {
            return Err(StoreError::Rejected("simulated write failure".into()));
        }
        Ok(())
    }
}

impl DocumentStore for RejectingStore {
    fn find(
        &self,
        filter: &Filter,
        projection: Option<&[&str]>,
    ) -> Result<Vec<Document>, StoreError> {
        self.inner.find(filter, projection)
    }

    fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        self.inner.find_one(filter)
    }

    fn insert_one(&self, doc: Document) -> Result<String, StoreError> {
        self.check(&doc)?;
        self.inner.insert_one(doc)
    }

    fn update_one(&self, filter: &Filter, set: Document) -> Result<bool, StoreError> {
        self.check(&set)?;
        self.inner.update_one(filter, set)
    }

    fn delete_one(&self, filter: &Filter) -> Result<bool, StoreError> {
        self.inner.delete_one(filter)
    }

    fn count_documents(&self, filter: &Filter) -> Result<usize, StoreError> {
        self.inner.count_documents(filter)
    }
}
