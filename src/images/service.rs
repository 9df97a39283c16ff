//! Store-backed photo operations keyed by vehicle id.
//!
//! Every operation reads the vehicle through [`StoredImages`], applies one
//! [`ImageList`] mutation, and writes the full list back together with the
//! flattened `photo_urls` and a fresh `updated_at`.

use super::list::ImageList;
use super::normalize::{StoredImages, image_fields};
use super::pipeline::{Upload, UploadConfig, UploadFailure, process_batch};
use super::record::ImageRecord;
use super::ServiceError;
use crate::imaging::ImageBackend;
use crate::store::{DocumentStore, Filter, UPDATED_AT_FIELD, timestamp};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// What the upload endpoint hands back to the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub uploaded_count: usize,
    pub total_images: usize,
    pub images: Vec<ImageRecord>,
    pub photo_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<UploadFailure>>,
}

pub struct VehicleImageService<'a, S, B> {
    store: &'a S,
    backend: &'a B,
    config: UploadConfig,
}

impl<'a, S: DocumentStore, B: ImageBackend> VehicleImageService<'a, S, B> {
    pub fn new(store: &'a S, backend: &'a B, config: UploadConfig) -> Self {
        Self {
            store,
            backend,
            config,
        }
    }

    fn load(&self, vehicle_id: &str) -> Result<ImageList, ServiceError> {
        let doc = self
            .store
            .find_one(&Filter::Id(vehicle_id.to_string()))?
            .ok_or_else(|| ServiceError::VehicleNotFound(vehicle_id.to_string()))?;
        let stored = StoredImages::classify(&doc);
        let settled = stored.is_migrated();
        let list = ImageList::from_records(stored.into_records());
        if !settled && !list.is_empty() {
            // Ids generated while reading must be stored or delete-by-id can't find them
            self.store
                .update_one(&Filter::Id(vehicle_id.to_string()), image_fields(&list))?;
            info!(vehicle_id, images = list.len(), "stored normalized image records");
        }
        Ok(list)
    }

    fn save(&self, vehicle_id: &str, list: &ImageList) -> Result<(), ServiceError> {
        let mut set = image_fields(list);
        set.insert(UPDATED_AT_FIELD.into(), Value::String(timestamp()));
        if !self.store.update_one(&Filter::Id(vehicle_id.to_string()), set)? {
            return Err(ServiceError::VehicleNotFound(vehicle_id.to_string()));
        }
        Ok(())
    }

    /// The vehicle's photos in canonical form.
    pub fn list(&self, vehicle_id: &str) -> Result<Vec<ImageRecord>, ServiceError> {
        Ok(self.load(vehicle_id)?.into_records())
    }

    /// Process and attach a batch of uploaded files.
    pub fn upload(
        &self,
        vehicle_id: &str,
        uploads: &[Upload],
        make_thumbnail: bool,
    ) -> Result<UploadResponse, ServiceError> {
        let mut list = self.load(vehicle_id)?;
        let outcome = process_batch(
            self.backend,
            uploads,
            list.len(),
            make_thumbnail,
            &self.config,
        )?;

        let uploaded_count = outcome.records.len();
        list.append(outcome.records);
        self.save(vehicle_id, &list)?;
        info!(
            vehicle_id,
            uploaded = uploaded_count,
            failed = outcome.failures.len(),
            "attached uploads"
        );

        Ok(UploadResponse {
            success: true,
            uploaded_count,
            total_images: list.len(),
            photo_urls: list.urls(),
            images: list.into_records(),
            errors: (!outcome.failures.is_empty()).then_some(outcome.failures),
        })
    }

    pub fn set_primary(
        &self,
        vehicle_id: &str,
        index: usize,
    ) -> Result<Vec<ImageRecord>, ServiceError> {
        let mut list = self.load(vehicle_id)?;
        list.set_primary(index)?;
        self.save(vehicle_id, &list)?;
        Ok(list.into_records())
    }

    pub fn delete_at(
        &self,
        vehicle_id: &str,
        index: usize,
    ) -> Result<Vec<ImageRecord>, ServiceError> {
        let mut list = self.load(vehicle_id)?;
        list.remove_at(index)?;
        self.save(vehicle_id, &list)?;
        Ok(list.into_records())
    }

    pub fn delete_by_id(
        &self,
        vehicle_id: &str,
        upload_id: &str,
    ) -> Result<Vec<ImageRecord>, ServiceError> {
        let mut list = self.load(vehicle_id)?;
        list.remove_by_id(upload_id)?;
        self.save(vehicle_id, &list)?;
        Ok(list.into_records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::{BatchError, ImageListError};
    use crate::imaging::backend::tests::{CORRUPT, MockBackend};
    use crate::imaging::{BoxSize, OutputFormat, Quality, RenderParams, ThumbnailParams};
    use crate::store::MemoryStore;
    use crate::test_helpers::*;
    use serde_json::json;

    fn config() -> UploadConfig {
        UploadConfig {
            render: RenderParams {
                bounds: BoxSize::new(1920, 1440),
                format: OutputFormat::Jpeg,
                quality: Quality::new(92),
            },
            thumbnail: ThumbnailParams {
                size: BoxSize::new(600, 450),
                format: OutputFormat::Jpeg,
                quality: Quality::new(85),
            },
            max_upload_mb: 15,
            max_per_vehicle: 12,
        }
    }

    fn upload(name: &str, content: &[u8]) -> Upload {
        Upload {
            filename: name.into(),
            content_type: Some("image/jpeg".into()),
            content: content.to_vec(),
        }
    }

    fn stored(store: &MemoryStore, id: &str) -> crate::store::Document {
        store.find_one(&Filter::Id(id.into())).unwrap().unwrap()
    }

    // =========================================================================
    // upload
    // =========================================================================

    #[test]
    fn upload_three_valid_one_invalid() {
        let store = store_with(vec![bare_vehicle("v1")]);
        let backend = MockBackend::new();
        let svc = VehicleImageService::new(&store, &backend, config());

        let resp = svc
            .upload(
                "v1",
                &[
                    upload("1.jpg", b"a"),
                    upload("2.jpg", b"b"),
                    upload("3.jpg", b"c"),
                    upload("broken.jpg", CORRUPT),
                ],
                true,
            )
            .unwrap();

        assert!(resp.success);
        assert_eq!(resp.uploaded_count, 3);
        assert_eq!(resp.total_images, 3);
        let errors = resp.errors.unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].filename, "broken.jpg");
        assert!(resp.images[0].is_primary);
        assert_eq!(resp.photo_urls.len(), 3);
    }

    #[test]
    fn upload_persists_both_representations() {
        let store = store_with(vec![legacy_vehicle("v1", &["/old.jpg"])]);
        let backend = MockBackend::new();
        let svc = VehicleImageService::new(&store, &backend, config());
        svc.upload("v1", &[upload("new.jpg", b"a")], false).unwrap();

        let d = stored(&store, "v1");
        let urls = d["photo_urls"].as_array().unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], json!("/old.jpg"));
        assert_eq!(d["images"][0]["is_primary"], json!(true));
        assert_eq!(d["images"][1]["is_primary"], json!(false));
        assert!(d["updated_at"].is_string());
    }

    #[test]
    fn upload_response_omits_errors_when_clean() {
        let store = store_with(vec![bare_vehicle("v1")]);
        let backend = MockBackend::new();
        let svc = VehicleImageService::new(&store, &backend, config());
        let resp = svc.upload("v1", &[upload("a.png", b"a")], false).unwrap();
        let v = serde_json::to_value(&resp).unwrap();
        assert!(v.get("errors").is_none());
    }

    #[test]
    fn upload_over_capacity_processes_nothing() {
        let store = store_with(vec![canonical_vehicle("v1", 10)]);
        let backend = MockBackend::new();
        let svc = VehicleImageService::new(&store, &backend, config());

        let err = svc
            .upload(
                "v1",
                &[upload("1.jpg", b"a"), upload("2.jpg", b"b"), upload("3.jpg", b"c")],
                true,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Batch(BatchError::CapacityExceeded { free_slots: 2, .. })
        ));
        assert!(backend.get_operations().is_empty());
        assert_eq!(svc.list("v1").unwrap().len(), 10);
    }

    #[test]
    fn upload_unknown_vehicle() {
        let store = MemoryStore::new();
        let backend = MockBackend::new();
        let svc = VehicleImageService::new(&store, &backend, config());
        assert!(matches!(
            svc.upload("ghost", &[upload("a.jpg", b"a")], true),
            Err(ServiceError::VehicleNotFound(_))
        ));
    }

    // =========================================================================
    // set_primary / delete
    // =========================================================================

    #[test]
    fn set_primary_rewrites_order_and_flat_list() {
        let store = store_with(vec![canonical_vehicle("v1", 3)]);
        let backend = MockBackend::new();
        let svc = VehicleImageService::new(&store, &backend, config());

        let records = svc.set_primary("v1", 2).unwrap();
        assert_eq!(records[0].upload_id, "up-2");
        let d = stored(&store, "v1");
        assert_eq!(d["photo_urls"][0], json!("/admin-vehicles/v1/2.jpg"));
        assert_eq!(d["images"][0]["is_primary"], json!(true));
        assert_eq!(d["images"][1]["is_primary"], json!(false));
    }

    #[test]
    fn delete_primary_promotes_next() {
        let store = store_with(vec![canonical_vehicle("v1", 3)]);
        let backend = MockBackend::new();
        let svc = VehicleImageService::new(&store, &backend, config());

        let records = svc.delete_at("v1", 0).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records.iter().filter(|r| r.is_primary).count(), 1);
        assert_eq!(records[0].upload_id, "up-1");
    }

    #[test]
    fn listed_ids_survive_for_delete_by_id() {
        let store = store_with(vec![doc(json!({
            "_id": "v1",
            "images": [
                {"url": "/a.jpg", "is_primary": true},
                {"url": "/b.jpg", "is_primary": false},
            ],
        }))]);
        let backend = MockBackend::new();
        let svc = VehicleImageService::new(&store, &backend, config());

        let first = svc.list("v1").unwrap();
        let second = svc.list("v1").unwrap();
        assert_eq!(first, second);
        assert_eq!(stored(&store, "v1")["images"][0]["upload_id"], json!(first[0].upload_id));

        let records = svc.delete_by_id("v1", &first[0].upload_id).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].url, "/b.jpg");
        assert!(records[0].is_primary);
    }

    #[test]
    fn reading_settled_list_does_not_write() {
        let store = store_with(vec![doc(json!({
            "_id": "v1",
            "images": [{"url": "/a.jpg", "is_primary": true, "upload_id": "a"}],
        }))]);
        let backend = MockBackend::new();
        let svc = VehicleImageService::new(&store, &backend, config());
        assert_eq!(svc.list("v1").unwrap()[0].upload_id, "a");
        // A write would have added the flat list
        assert!(stored(&store, "v1").get("photo_urls").is_none());
    }

    #[test]
    fn delete_by_id_and_bounds() {
        let store = store_with(vec![canonical_vehicle("v1", 2)]);
        let backend = MockBackend::new();
        let svc = VehicleImageService::new(&store, &backend, config());

        let records = svc.delete_by_id("v1", "up-1").unwrap();
        assert_eq!(records.len(), 1);
        assert!(matches!(
            svc.delete_at("v1", 1),
            Err(ServiceError::List(ImageListError::IndexOutOfRange { index: 1, len: 1 }))
        ));
        assert!(matches!(
            svc.delete_by_id("v1", "up-1"),
            Err(ServiceError::List(ImageListError::UnknownUploadId(_)))
        ));
    }
}
