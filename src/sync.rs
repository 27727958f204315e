//! CRM Synchronizer: replicates every persisted record to the CRM, one call
//! in flight at a time.
//!
//! Per-record isolation: a failed call is logged and tallied, never aborting
//! the loop — all records are attempted regardless of prior failures. There
//! is no retry and no batching.

use thiserror::Error;
use tracing::{error, info};

use crate::contract::{CrmClient, RecordStore, StoreError};

#[derive(Debug, Error)]
pub enum SyncError {
    /// The read-back of persisted records failed; unlike per-record call
    /// failures this aborts the stage.
    #[error("failed to read back persisted records: {0}")]
    Store(StoreError),
}

/// Aggregated outcome of the sync loop, so a non-interactive caller can
/// decide what to do about the failed subset.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_ids: Vec<i64>,
}

/// Read back all persisted records and issue one contact-creation call per
/// record, strictly sequentially.
pub async fn sync_all<S, C>(store: &S, crm: &C) -> Result<SyncReport, SyncError>
where
    S: RecordStore,
    C: CrmClient,
{
    let records = store.fetch_all().await.map_err(|e| {
        error!(error = %e, "[SYNC][ERROR] Failed to read back persisted records");
        SyncError::Store(e)
    })?;
    info!(records = records.len(), "[SYNC] Replicating records to CRM");

    let mut report = SyncReport::default();
    for record in &records {
        report.attempted += 1;
        match crm.create_contact(record).await {
            Ok(()) => {
                report.succeeded += 1;
                info!(id = record.id, name = ?record.name, "[SYNC] Contact created");
            }
            Err(e) => {
                report.failed += 1;
                report.failed_ids.push(record.id);
                error!(id = record.id, error = %e, "[SYNC][ERROR] Contact creation failed");
            }
        }
    }

    info!(
        attempted = report.attempted,
        succeeded = report.succeeded,
        failed = report.failed,
        "[SYNC] CRM replication finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{MockCrmClient, MockRecordStore, StoredRecord};
    use mockall::Sequence;

    fn three_records() -> Vec<StoredRecord> {
        vec![
            StoredRecord {
                id: 1,
                name: Some("Mary".into()),
                sex: Some("F".into()),
            },
            StoredRecord {
                id: 2,
                name: Some("John".into()),
                sex: Some("M".into()),
            },
            StoredRecord {
                id: 3,
                name: Some("Ann".into()),
                sex: Some("F".into()),
            },
        ]
    }

    #[tokio::test]
    async fn every_record_is_attempted_despite_a_mid_loop_failure() {
        let mut store = MockRecordStore::new();
        store.expect_fetch_all().returning(|| Ok(three_records()));

        let mut crm = MockCrmClient::new();
        crm.expect_create_contact()
            .times(3)
            .returning(|record| {
                if record.id == 2 {
                    Err("simulated 500 response".into())
                } else {
                    Ok(())
                }
            });

        let report = sync_all(&store, &crm).await.unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.failed_ids, vec![2]);
    }

    #[tokio::test]
    async fn records_are_synced_sequentially_in_storage_order() {
        let mut store = MockRecordStore::new();
        store.expect_fetch_all().returning(|| Ok(three_records()));

        let mut crm = MockCrmClient::new();
        let mut seq = Sequence::new();
        for expected_id in [1i64, 2, 3] {
            crm.expect_create_contact()
                .withf(move |record| record.id == expected_id)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(()));
        }

        let report = sync_all(&store, &crm).await.unwrap();
        assert_eq!(report.attempted, 3);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn empty_store_syncs_nothing() {
        let mut store = MockRecordStore::new();
        store.expect_fetch_all().returning(|| Ok(Vec::new()));

        let crm = MockCrmClient::new();

        let report = sync_all(&store, &crm).await.unwrap();
        assert_eq!(report, SyncReport::default());
    }

    #[tokio::test]
    async fn read_back_failure_aborts_the_stage() {
        let mut store = MockRecordStore::new();
        store
            .expect_fetch_all()
            .returning(|| Err("connection lost".into()));

        let crm = MockCrmClient::new();

        let result = sync_all(&store, &crm).await;
        assert!(matches!(result, Err(SyncError::Store(_))));
    }
}
