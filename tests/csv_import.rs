//! End-to-end CSV import against a file-backed inventory.

use serde_json::json;
use showroom::config::ImportConfig;
use showroom::import::{CsvValidationError, ImportError, RowAction, csv_template, run_import};
use showroom::store::{DocumentStore, Filter, MemoryStore};
use tempfile::TempDir;

const HEADER: &str = "VIN,Year,Make,Model,Price,Mileage,Condition,Stock Number,Image URLs";

fn csv(rows: &[&str]) -> Vec<u8> {
    let mut out = format!("{HEADER}\r\n");
    for row in rows {
        out.push_str(row);
        out.push_str("\r\n");
    }
    out.into_bytes()
}

fn inventory() -> (TempDir, std::path::PathBuf) {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("inventory.json");
    (tmp, path)
}

#[test]
fn dry_run_then_import_then_reimport() {
    let (_tmp, path) = inventory();
    let content = csv(&[
        "1HGCM82633A123456,2020,Honda,Accord,\"$32,500\",\"15,000\",used,,/a.jpg|/b.jpg",
        "2T1BURHE0JC123456,2018,Toyota,Corolla,18900,42000,New,LOT-7,",
        "BADVIN,2018,Toyota,Corolla,18900,42000,New,,",
    ]);
    let config = ImportConfig::default();

    // Dry run leaves the file untouched
    let store = MemoryStore::load(&path).unwrap();
    let preview = run_import(&store, &content, true, &config).unwrap();
    assert!(preview.dry_run);
    assert_eq!(preview.counts.total_rows, 3);
    assert_eq!(preview.counts.valid_rows, 2);
    assert_eq!(preview.counts.to_create, 2);
    assert_eq!(preview.counts.skipped, 1);
    assert_eq!(preview.skipped_rows[0].row, 4);
    assert_eq!(preview.skipped_rows[0].vin, "BADVIN");
    assert!(store.documents().is_empty());

    // Real run writes both valid rows
    let outcome = run_import(&store, &content, false, &config).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.counts.created, 2);
    assert_eq!(outcome.counts.to_create, preview.counts.to_create);
    assert_eq!(outcome.preview, preview.preview);
    store.save(&path).unwrap();

    let store = MemoryStore::load(&path).unwrap();
    let accord = store
        .find_one(&Filter::eq("vin", "1HGCM82633A123456"))
        .unwrap()
        .unwrap();
    assert_eq!(accord["price"], json!(32500));
    assert_eq!(accord["mileage"], json!(15000));
    assert_eq!(accord["condition"], json!("Used"));
    assert_eq!(accord["is_active"], json!(true));
    assert_eq!(accord["photo_urls"], json!(["/a.jpg", "/b.jpg"]));
    assert_eq!(accord["images"][0]["is_primary"], json!(true));
    assert!(accord["stock_number"].as_str().unwrap().starts_with("CMA"));

    let corolla = store
        .find_one(&Filter::eq("vin", "2T1BURHE0JC123456"))
        .unwrap()
        .unwrap();
    assert_eq!(corolla["stock_number"], json!("LOT-7"));

    // Same file again: every valid row is now an update
    let again = run_import(&store, &content, false, &config).unwrap();
    assert_eq!(again.counts.to_update, 2);
    assert_eq!(again.counts.updated, 2);
    assert_eq!(again.counts.created, 0);
    assert!(again.preview.iter().all(|p| p.action == RowAction::Update));
    assert_eq!(store.count_documents(&Filter::All).unwrap(), 2);
}

#[test]
fn latin1_export_is_decoded() {
    let mut content = b"vin,year,make,model,price\n1HGCM82633A123456,2019,Citro".to_vec();
    content.push(0xEB);
    content.extend_from_slice(b"n,C4,12000\n");

    let store = MemoryStore::new();
    let outcome = run_import(&store, &content, false, &ImportConfig::default()).unwrap();
    assert_eq!(outcome.counts.created, 1);
    assert_eq!(store.documents()[0]["make"], json!("Citroën"));
}

#[test]
fn file_level_errors_abort_before_rows() {
    let store = MemoryStore::new();
    let config = ImportConfig {
        max_csv_mb: 1,
        ..ImportConfig::default()
    };

    let big = vec![b'a'; 1024 * 1024 + 1];
    let err = run_import(&store, &big, false, &config).unwrap_err();
    assert!(matches!(
        err,
        ImportError::Csv(CsvValidationError::TooLarge { max_mb: 1 })
    ));

    let err = run_import(&store, b"vin,make\nX,Y\n", false, &config).unwrap_err();
    assert_eq!(err.to_string(), "Missing required columns: year, model, price");
    assert!(store.documents().is_empty());
}

#[test]
fn template_imports_cleanly() {
    let store = MemoryStore::new();
    let template = csv_template().unwrap();
    let outcome = run_import(&store, template.as_bytes(), false, &ImportConfig::default()).unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.counts.created, 1);
    assert_eq!(store.documents()[0]["stock_number"], json!("CMA001"));
    assert_eq!(store.documents()[0]["is_featured_homepage"], json!(false));
}

#[test]
fn outcome_serializes_for_http_layer() {
    let store = MemoryStore::new();
    let outcome = run_import(
        &store,
        &csv(&["1HGCM82633A123456,2020,Honda,Accord,100,,weird,,"]),
        true,
        &ImportConfig::default(),
    )
    .unwrap();
    let v = serde_json::to_value(&outcome).unwrap();
    for key in [
        "success",
        "dry_run",
        "counts",
        "preview",
        "errors",
        "skipped_rows",
        "headers",
        "warnings",
    ] {
        assert!(v.get(key).is_some(), "{key}");
    }
    assert_eq!(v["headers"][7], json!("stock_number"));
    assert_eq!(
        v["warnings"],
        json!(["Row 2: Unrecognized condition 'weird', defaulted to Used"])
    );
}
