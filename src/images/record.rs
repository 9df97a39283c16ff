//! The canonical image record and the raw entry shapes it is read from.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Field holding the canonical `ImageRecord[]`.
pub const IMAGES_FIELD: &str = "images";
/// Legacy flat URL list, still written on every change for older readers.
pub const PHOTO_URLS_FIELD: &str = "photo_urls";
/// Alternate legacy name for the same flat URL list.
pub const IMAGE_URLS_FIELD: &str = "imageUrls";

/// Generate a fresh upload handle.
pub fn new_upload_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn upload_id_or_new<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .filter(|id| !id.is_empty())
        .unwrap_or_else(new_upload_id))
}

/// One photo attached to a vehicle.
///
/// Unknown keys are carried through in `extra` so rewriting a list never
/// drops data written by other tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_primary: bool,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default = "new_upload_id", deserialize_with = "upload_id_or_new")]
    pub upload_id: String,

    // Branding-removal derivatives
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clean: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumb: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ImageRecord {
    /// A minimal record for a bare URL.
    pub fn from_url(url: impl Into<String>, is_primary: bool) -> Self {
        Self {
            url: url.into(),
            is_primary,
            thumbnail_url: None,
            original_filename: None,
            upload_id: new_upload_id(),
            orig: None,
            clean: None,
            full: None,
            display: None,
            thumb: None,
            extra: Map::new(),
        }
    }

    pub fn to_value(&self) -> Value {
        // A struct of strings, bools and a string-keyed map always serializes.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// An element of any stored image list, before normalization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ImageEntry {
    Record(ImageRecord),
    Url(String),
}

impl ImageEntry {
    /// Parse one stored element. `None` for shapes that are neither.
    pub fn parse(value: &Value) -> Option<Self> {
        ImageEntry::deserialize(value).ok()
    }
}

/// Serialize a record list for storage.
pub fn records_to_value(records: &[ImageRecord]) -> Value {
    Value::Array(records.iter().map(ImageRecord::to_value).collect())
}
