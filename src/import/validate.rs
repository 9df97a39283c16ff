//! Row validation and create/update classification.
//!
//! A row moves through `validate-required-fields → normalize-types →
//! classify`; any failure before classification rejects the row with every
//! reason found, prefixed by its row number. Rejections are data, not errors:
//! the import always continues with the next row.

use super::fields::{
    BOOL_FIELDS, MAX_YEARS_AHEAD, MIN_YEAR, REQUIRED_FIELDS, merge_image_urls,
    normalize_condition, parse_bool, parse_image_urls, parse_number, validate_vin,
};
use super::parse::RawRow;
use crate::images::{ImageList, ImageRecord};
use crate::store::{Document, DocumentStore, Filter, StoreError, document_id};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// A row that passed validation, in the shape it is written to the store.
///
/// Absent optional fields are omitted on serialization so an update only
/// touches what the spreadsheet actually supplied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleRow {
    pub vin: String,
    pub year: i64,
    pub make: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mileage: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub featured_rank: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<&'static str>,
    /// Remaining free-text columns, trimmed.
    #[serde(flatten)]
    pub text: BTreeMap<&'static str, String>,
    #[serde(flatten)]
    pub flags: BTreeMap<&'static str, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_urls: Option<Vec<String>>,
}

/// Free-text columns other than `make`, `model` and `condition`, which get
/// dedicated handling above.
const PASSTHROUGH_TEXT: &[&str] = &[
    "trim",
    "stock_number",
    "exterior_color",
    "interior_color",
    "transmission",
    "drivetrain",
    "fuel_type",
    "body_style",
    "engine",
    "carfax_url",
    "window_sticker_url",
    "primary_image_url",
];

impl VehicleRow {
    pub fn to_document(&self) -> Document {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Document::new(),
        }
    }

    pub fn stock_number(&self) -> Option<&str> {
        self.text.get("stock_number").map(String::as_str)
    }

    pub fn is_active(&self) -> Option<bool> {
        self.flags.get("is_active").copied()
    }

    /// `"2020 Honda Accord"`.
    pub fn label(&self) -> String {
        format!("{} {} {}", self.year, self.make, self.model)
    }
}

/// Outcome of validating one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowCheck {
    Valid {
        row: VehicleRow,
        warnings: Vec<String>,
    },
    Invalid {
        errors: Vec<String>,
    },
}

fn non_negative(
    row: &RawRow,
    field: &str,
    label: &str,
    errors: &mut Vec<String>,
) -> Option<i64> {
    let n = row.get(field).and_then(parse_number)?;
    if n < 0 {
        errors.push(format!("Row {}: {label} cannot be negative", row.number));
        return None;
    }
    Some(n)
}

/// Validate and normalize one parsed row against the calendar year.
pub fn validate_row(row: &RawRow, current_year: i64) -> RowCheck {
    let n = row.number;
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let vin = match validate_vin(row.raw("vin").unwrap_or_default()) {
        Ok(vin) => Some(vin),
        Err(reason) => {
            errors.push(format!("Row {n}: {reason}"));
            None
        }
    };

    for field in REQUIRED_FIELDS.iter().filter(|f| **f != "vin") {
        if row.get(field).is_none() {
            errors.push(format!("Row {n}: Missing required field '{field}'"));
        }
    }

    let year = row.get("year").and_then(|raw| {
        let year = parse_number(raw)
            .filter(|y| (MIN_YEAR..=current_year + MAX_YEARS_AHEAD).contains(y));
        if year.is_none() {
            errors.push(format!("Row {n}: Invalid year '{raw}'"));
        }
        year
    });

    let price = non_negative(row, "price", "Price", &mut errors);
    let mileage = non_negative(row, "mileage", "Mileage", &mut errors);

    let condition = row.get("condition").map(|raw| {
        let (canonical, recognized) = normalize_condition(raw);
        if !recognized {
            warn!(row = n, condition = raw, "unrecognized condition, defaulting to Used");
            warnings.push(format!(
                "Row {n}: Unrecognized condition '{raw}', defaulted to {canonical}"
            ));
        }
        canonical
    });

    let (Some(vin), Some(year), Some(make), Some(model), true) = (
        vin,
        year,
        row.get("make"),
        row.get("model"),
        errors.is_empty(),
    ) else {
        return RowCheck::Invalid { errors };
    };

    let text: BTreeMap<&'static str, String> = PASSTHROUGH_TEXT
        .iter()
        .filter_map(|f| row.get(f).map(|v| (*f, v.to_string())))
        .collect();
    let flags: BTreeMap<&'static str, bool> = BOOL_FIELDS
        .iter()
        .filter_map(|f| row.get(f).and_then(parse_bool).map(|b| (*f, b)))
        .collect();

    let urls = merge_image_urls(
        row.get("primary_image_url"),
        row.get("image_urls").map(parse_image_urls).unwrap_or_default(),
    );
    let (images, photo_urls) = if urls.is_empty() {
        (None, None)
    } else {
        let list = ImageList::from_records(
            urls.into_iter()
                .enumerate()
                .map(|(i, url)| ImageRecord::from_url(url, i == 0))
                .collect(),
        );
        (Some(list.records().to_vec()), Some(list.urls()))
    };

    RowCheck::Valid {
        row: VehicleRow {
            vin,
            year,
            make: make.to_string(),
            model: model.to_string(),
            price,
            mileage,
            featured_rank: row.get("featured_rank").and_then(parse_number),
            condition,
            text,
            flags,
            images,
            photo_urls,
        },
        warnings,
    }
}

/// Upper-cased VIN → document id for every stored vehicle, read in one scan.
pub fn existing_vins(store: &impl DocumentStore) -> Result<HashMap<String, String>, StoreError> {
    let docs = store.find(&Filter::All, Some(&["vin"]))?;
    Ok(docs
        .iter()
        .filter_map(|doc| {
            let vin = doc.get("vin")?.as_str()?.trim().to_uppercase();
            let id = document_id(doc)?;
            (!vin.is_empty()).then(|| (vin, id.to_string()))
        })
        .collect())
}

/// Where an accepted row goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Create,
    /// Update the stored vehicle with this id.
    Update(String),
}

pub fn classify(vin: &str, existing: &HashMap<String, String>) -> Classification {
    match existing.get(vin) {
        Some(id) => Classification::Update(id.clone()),
        None => Classification::Create,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use serde_json::json;

    const VIN: &str = "1HGCM82633A123456";

    fn raw(number: usize, cells: &[(&str, &str)]) -> RawRow {
        RawRow {
            number,
            cells: cells
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn base(extra: &[(&'static str, &'static str)]) -> RawRow {
        let mut cells = vec![
            ("vin", VIN),
            ("year", "2020"),
            ("make", "Honda"),
            ("model", "Accord"),
            ("price", "$32,500"),
        ];
        cells.extend_from_slice(extra);
        raw(2, &cells)
    }

    fn valid(check: RowCheck) -> (VehicleRow, Vec<String>) {
        match check {
            RowCheck::Valid { row, warnings } => (row, warnings),
            RowCheck::Invalid { errors } => panic!("expected valid row, got {errors:?}"),
        }
    }

    fn invalid(check: RowCheck) -> Vec<String> {
        match check {
            RowCheck::Invalid { errors } => errors,
            RowCheck::Valid { row, .. } => panic!("expected rejection, got {row:?}"),
        }
    }

    // =========================================================================
    // Acceptance and normalization
    // =========================================================================

    #[test]
    fn minimal_row_normalizes() {
        let (row, warnings) = valid(validate_row(&base(&[]), 2025));
        assert!(warnings.is_empty());
        assert_eq!(row.vin, VIN);
        assert_eq!(row.year, 2020);
        assert_eq!(row.price, Some(32500));
        assert_eq!(row.label(), "2020 Honda Accord");
        assert_eq!(
            Value::Object(row.to_document()),
            json!({"vin": VIN, "year": 2020, "make": "Honda", "model": "Accord", "price": 32500})
        );
    }

    #[test]
    fn optional_fields_flow_through() {
        let (row, _) = valid(validate_row(
            &base(&[
                ("trim", " Sport "),
                ("mileage", "15,000"),
                ("condition", "nuevo"),
                ("is_featured_homepage", "Yes"),
                ("is_active", "maybe"),
                ("featured_rank", "3"),
                ("stock_number", "A1"),
            ]),
            2025,
        ));
        let d = row.to_document();
        assert_eq!(d["trim"], json!("Sport"));
        assert_eq!(d["mileage"], json!(15000));
        assert_eq!(d["condition"], json!("New"));
        assert_eq!(d["is_featured_homepage"], json!(true));
        assert!(!d.contains_key("is_active"));
        assert_eq!(d["featured_rank"], json!(3));
        assert_eq!(row.stock_number(), Some("A1"));
    }

    #[test]
    fn unparseable_price_is_absent_not_error() {
        let (row, _) = valid(validate_row(&base(&[("price", "call")]), 2025));
        assert_eq!(row.price, None);
        assert!(!row.to_document().contains_key("price"));
    }

    #[test]
    fn unrecognized_condition_warns_and_defaults() {
        let (row, warnings) = valid(validate_row(&base(&[("condition", "certified")]), 2025));
        assert_eq!(row.condition, Some("Used"));
        assert_eq!(
            warnings,
            vec!["Row 2: Unrecognized condition 'certified', defaulted to Used"]
        );
    }

    #[test]
    fn images_merge_primary_first() {
        let (row, _) = valid(validate_row(
            &base(&[
                ("primary_image_url", "/p.jpg"),
                ("image_urls", r#"["/a.jpg", "/p.jpg", "/b.jpg"]"#),
            ]),
            2025,
        ));
        assert_eq!(
            row.photo_urls.as_deref(),
            Some(&["/p.jpg".to_string(), "/a.jpg".into(), "/b.jpg".into()][..])
        );
        let images = row.images.unwrap();
        assert!(images[0].is_primary);
        assert!(images[1..].iter().all(|r| !r.is_primary));
        assert_eq!(row.text.get("primary_image_url").map(String::as_str), Some("/p.jpg"));
    }

    #[test]
    fn no_image_columns_means_no_image_fields() {
        let (row, _) = valid(validate_row(&base(&[("image_urls", "  ")]), 2025));
        let d = row.to_document();
        assert!(!d.contains_key("images"));
        assert!(!d.contains_key("photo_urls"));
    }

    #[test]
    fn year_window_edges() {
        assert!(matches!(
            validate_row(&base(&[("year", "1900")]), 2025),
            RowCheck::Valid { .. }
        ));
        assert!(matches!(
            validate_row(&base(&[("year", "2027")]), 2025),
            RowCheck::Valid { .. }
        ));
        assert_eq!(
            invalid(validate_row(&base(&[("year", "2028")]), 2025)),
            vec!["Row 2: Invalid year '2028'"]
        );
        assert_eq!(
            invalid(validate_row(&base(&[("year", "1899")]), 2025)),
            vec!["Row 2: Invalid year '1899'"]
        );
    }

    // =========================================================================
    // Rejection
    // =========================================================================

    #[test]
    fn short_vin_rejected_with_row_number() {
        let mut row = base(&[]);
        row.number = 7;
        row.cells.insert("vin".into(), "1HGCM82633A12345".into());
        assert_eq!(
            invalid(validate_row(&row, 2025)),
            vec!["Row 7: VIN must be 17 characters (got 16)"]
        );
    }

    #[test]
    fn every_reason_is_collected() {
        let row = raw(4, &[("vin", ""), ("year", "abc"), ("price", "-10"), ("mileage", "-1")]);
        assert_eq!(
            invalid(validate_row(&row, 2025)),
            vec![
                "Row 4: VIN is required",
                "Row 4: Missing required field 'make'",
                "Row 4: Missing required field 'model'",
                "Row 4: Invalid year 'abc'",
                "Row 4: Price cannot be negative",
                "Row 4: Mileage cannot be negative",
            ]
        );
    }

    #[test]
    fn blank_required_field_rejected() {
        assert_eq!(
            invalid(validate_row(&base(&[("model", "   ")]), 2025)),
            vec!["Row 2: Missing required field 'model'"]
        );
    }

    // =========================================================================
    // Classification
    // =========================================================================

    #[test]
    fn existing_vins_are_uppercased_and_keyed_to_ids() {
        let store = store_with(vec![
            doc(json!({"_id": "a", "vin": "1hgcm82633a123456"})),
            doc(json!({"_id": "b"})),
            doc(json!({"_id": "c", "vin": ""})),
        ]);
        let map = existing_vins(&store).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(
            classify(VIN, &map),
            Classification::Update("a".into())
        );
        assert_eq!(classify("2HGCM82633A123456", &map), Classification::Create);
    }
}
