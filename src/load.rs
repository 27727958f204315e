//! Record Loader: streams the extracted CSV into memory and persists the
//! whole batch in a single round trip.
//!
//! Rows are mapped by the fixed `Name`/`Sex` header columns; a row missing a
//! column yields a record with that field absent rather than being rejected.
//! The batch-at-end design trades memory for one bulk insert, which is fine
//! for the tens of thousands of rows this dataset holds.

use std::path::Path;

use thiserror::Error;
use tracing::{error, info};

use crate::contract::{NameRecord, RecordStore, StoreError};

/// Fixed source column names; matched by exact header equality.
pub const NAME_COLUMN: &str = "Name";
pub const SEX_COLUMN: &str = "Sex";

#[derive(Debug, Error)]
pub enum LoadError {
    /// The CSV stream could not be opened or read.
    #[error("failed to read csv: {0}")]
    Csv(#[from] csv::Error),
    /// Schema initialisation or the bulk insert failed; no partial batch is
    /// committed and no partial count is reported.
    #[error("failed to persist batch: {0}")]
    Store(StoreError),
}

/// Read every row of `csv_path` into a [`NameRecord`] batch and persist it.
/// Returns the number of rows written.
pub async fn load_and_persist<S: RecordStore>(
    store: &S,
    csv_path: &Path,
) -> Result<u64, LoadError> {
    // Schema creation is idempotent; safe on an already-initialised store.
    store.init_schema().await.map_err(|e| {
        error!(error = %e, "[LOAD][ERROR] Failed to initialise schema");
        LoadError::Store(e)
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(csv_path)?;
    let headers = reader.headers()?.clone();
    let name_index = headers.iter().position(|header| header == NAME_COLUMN);
    let sex_index = headers.iter().position(|header| header == SEX_COLUMN);

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        // Values are kept verbatim: no trimming, no case normalisation.
        let field = |index: Option<usize>| {
            index.and_then(|i| row.get(i)).map(str::to_string)
        };
        records.push(NameRecord {
            name: field(name_index),
            sex: field(sex_index),
        });
    }
    info!(rows = records.len(), path = %csv_path.display(), "[LOAD] CSV read into memory");

    let count = store.insert_all(&records).await.map_err(|e| {
        error!(error = %e, "[LOAD][ERROR] Bulk insert failed");
        LoadError::Store(e)
    })?;

    info!(count, "[LOAD] Batch persisted");
    Ok(count)
}
