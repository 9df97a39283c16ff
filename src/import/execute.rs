//! Persist classified rows.
//!
//! Each row is written independently. A failed write is recorded against its
//! VIN, counted as skipped, and the loop moves on.

use super::outcome::ImportOutcome;
use super::validate::{Classification, VehicleRow};
use crate::config::ImportConfig;
use crate::store::{DocumentStore, Filter, StoreError, UPDATED_AT_FIELD};
use serde_json::Value;
use thiserror::Error;
use tracing::{error, info};

pub const CREATED_AT_FIELD: &str = "created_at";

/// A validated row with its destination.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRow {
    pub number: usize,
    pub row: VehicleRow,
    pub action: Classification,
}

#[derive(Error, Debug)]
enum WriteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("vehicle {0} no longer exists")]
    Vanished(String),
}

/// `CMA` + six upper-case hex characters.
pub fn generate_stock_number(prefix: &str) -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}{}", hex[..6].to_uppercase())
}

fn update(store: &impl DocumentStore, id: &str, row: &VehicleRow, now: &str) -> Result<(), WriteError> {
    let mut set = row.to_document();
    set.insert(UPDATED_AT_FIELD.into(), Value::String(now.to_string()));
    if !store.update_one(&Filter::Id(id.to_string()), set)? {
        return Err(WriteError::Vanished(id.to_string()));
    }
    Ok(())
}

fn create(
    store: &impl DocumentStore,
    row: &VehicleRow,
    now: &str,
    config: &ImportConfig,
) -> Result<String, WriteError> {
    let mut doc = row.to_document();
    doc.insert(CREATED_AT_FIELD.into(), Value::String(now.to_string()));
    doc.insert(UPDATED_AT_FIELD.into(), Value::String(now.to_string()));
    doc.insert("is_active".into(), Value::Bool(row.is_active().unwrap_or(true)));
    if row.stock_number().is_none() {
        doc.insert(
            "stock_number".into(),
            Value::String(generate_stock_number(&config.stock_prefix)),
        );
    }
    Ok(store.insert_one(doc)?)
}

/// Write every planned row, stamping all of them with the same `now`.
pub fn execute(
    store: &impl DocumentStore,
    planned: &[PlannedRow],
    now: &str,
    config: &ImportConfig,
    outcome: &mut ImportOutcome,
) {
    for PlannedRow { number, row, action } in planned {
        let vin = row.vin.as_str();
        let result = match action {
            Classification::Update(id) => update(store, id, row, now).map(|()| {
                outcome.counts.updated += 1;
                info!(row = number, vin, id = id.as_str(), "updated vehicle");
            }),
            Classification::Create => create(store, row, now, config).map(|id| {
                outcome.counts.created += 1;
                info!(row = number, vin, id = id.as_str(), "created vehicle");
            }),
        };
        if let Err(e) = result {
            error!(row = number, vin, error = %e, "import write failed");
            outcome.errors.push(format!("Database error for VIN {vin}: {e}"));
            outcome.counts.skipped += 1;
        }
    }
}
