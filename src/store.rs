//! Vehicle document store.
//!
//! The pipelines never talk to a database directly; they go through the
//! [`DocumentStore`] trait, which exposes the handful of operations they need
//! (filtered scan with projection, keyed lookup, insert, `$set`-style update,
//! delete, count). Documents are schemaless JSON objects with a string `_id`,
//! so the legacy and canonical image shapes can coexist until migration.
//!
//! [`MemoryStore`] is the process-local implementation used by the CLI and the
//! tests. It persists to a single JSON file:
//!
//! ```json
//! { "version": 1, "documents": [ { "_id": "…", "vin": "…", … } ] }
//! ```
//!
//! A missing file loads as an empty store. A file that exists but does not
//! parse is an error, never silently discarded.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// A stored vehicle (or any other) document.
pub type Document = Map<String, Value>;

/// Name of the identifier field every stored document carries.
pub const ID_FIELD: &str = "_id";

/// Version of the on-disk store format.
const STORE_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store file version {found} is not supported")]
    Version { found: u32 },
    #[error("write rejected: {0}")]
    Rejected(String),
}

/// Which documents an operation applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    /// Match on `_id`.
    Id(String),
    /// Match documents whose top-level `field` equals `value`.
    Eq(String, Value),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Id(id) => doc.get(ID_FIELD).and_then(Value::as_str) == Some(id.as_str()),
            Filter::Eq(field, value) => doc.get(field) == Some(value),
        }
    }
}

/// Field every write path touches with [`timestamp`].
pub const UPDATED_AT_FIELD: &str = "updated_at";

/// Current UTC time as stored in documents (RFC 3339).
pub fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Read `_id` as a string, if the document has one.
pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// The operations the inventory pipelines need from persistence.
pub trait DocumentStore: Sync {
    /// All matching documents. With a projection, only the listed top-level
    /// fields (plus `_id`) are returned.
    fn find(&self, filter: &Filter, projection: Option<&[&str]>)
    -> Result<Vec<Document>, StoreError>;

    fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError>;

    /// Insert a document, assigning an `_id` if it has none. Returns the id.
    fn insert_one(&self, doc: Document) -> Result<String, StoreError>;

    /// Shallow-merge `set` into the first matching document. Returns whether
    /// a document matched.
    fn update_one(&self, filter: &Filter, set: Document) -> Result<bool, StoreError>;

    /// Remove the first matching document. Returns whether one was removed.
    fn delete_one(&self, filter: &Filter) -> Result<bool, StoreError>;

    fn count_documents(&self, filter: &Filter) -> Result<usize, StoreError>;
}

#[derive(Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    documents: Vec<Document>,
}

/// In-process document store guarded by a mutex.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: Mutex<Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(docs: Vec<Document>) -> Self {
        Self {
            docs: Mutex::new(docs),
        }
    }

    /// Load from a JSON store file. A missing file yields an empty store.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        let file: StoreFile = serde_json::from_str(&content)?;
        if file.version != STORE_VERSION {
            return Err(StoreError::Version {
                found: file.version,
            });
        }
        Ok(Self::from_documents(file.documents))
    }

    /// Write the whole store to `path`, replacing it.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        let file = StoreFile {
            version: STORE_VERSION,
            documents: self.documents(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Snapshot of every stored document.
    pub fn documents(&self) -> Vec<Document> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Document>> {
        // A panic mid-write cannot leave a half-applied document: every
        // mutation below is a single push/assign/remove.
        self.docs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn project(doc: &Document, fields: &[&str]) -> Document {
    doc.iter()
        .filter(|(k, _)| k.as_str() == ID_FIELD || fields.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

impl DocumentStore for MemoryStore {
    fn find(
        &self,
        filter: &Filter,
        projection: Option<&[&str]>,
    ) -> Result<Vec<Document>, StoreError> {
        let docs = self.lock();
        Ok(docs
            .iter()
            .filter(|d| filter.matches(d))
            .map(|d| match projection {
                Some(fields) => project(d, fields),
                None => d.clone(),
            })
            .collect())
    }

    fn find_one(&self, filter: &Filter) -> Result<Option<Document>, StoreError> {
        Ok(self.lock().iter().find(|d| filter.matches(d)).cloned())
    }

    fn insert_one(&self, mut doc: Document) -> Result<String, StoreError> {
        let mut docs = self.lock();
        let id = match document_id(&doc) {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().simple().to_string();
                doc.insert(ID_FIELD.into(), Value::String(id.clone()));
                id
            }
        };
        if docs.iter().any(|d| document_id(d) == Some(id.as_str())) {
            return Err(StoreError::Rejected(format!("duplicate _id '{id}'")));
        }
        docs.push(doc);
        Ok(id)
    }

    fn update_one(&self, filter: &Filter, set: Document) -> Result<bool, StoreError> {
        if set.contains_key(ID_FIELD) {
            return Err(StoreError::Rejected("_id is immutable".into()));
        }
        let mut docs = self.lock();
        match docs.iter_mut().find(|d| filter.matches(d)) {
            Some(doc) => {
                doc.extend(set);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_one(&self, filter: &Filter) -> Result<bool, StoreError> {
        let mut docs = self.lock();
        match docs.iter().position(|d| filter.matches(d)) {
            Some(i) => {
                docs.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn count_documents(&self, filter: &Filter) -> Result<usize, StoreError> {
        Ok(self.lock().iter().filter(|d| filter.matches(d)).count())
    }
}
