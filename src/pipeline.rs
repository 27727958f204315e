//! Pipeline Orchestrator: runs Acquire → Extract → Load → Sync → Cleanup in
//! strict sequence, with a single failed state reachable from any stage.
//!
//! All collaborators are injected; there is no global pipeline state. The
//! store connection is released exactly once by [`run_to_completion`]'s
//! terminal step, regardless of which state the run ends in. Cleanup of the
//! transient files only happens on the success path: a run that fails
//! mid-way leaves the archive and CSV on disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{error, info, warn};

use crate::acquire::{self, AcquireError};
use crate::config::Config;
use crate::contract::{Browser, CrmClient, RecordStore};
use crate::extract::{self, ExtractError};
use crate::load::{self, LoadError};
use crate::sync::{self, SyncError, SyncReport};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("acquire stage failed: {0}")]
    Acquire(#[from] AcquireError),
    #[error("extract stage failed: {0}")]
    Extract(#[from] ExtractError),
    #[error("load stage failed: {0}")]
    Load(#[from] LoadError),
    #[error("sync stage failed: {0}")]
    Sync(#[from] SyncError),
    #[error("cleanup failed: {0}")]
    Cleanup(io::Error),
}

/// Outcome of a fully successful run.
#[derive(Debug)]
pub struct PipelineReport {
    pub archive_path: PathBuf,
    pub csv_path: PathBuf,
    /// Rows persisted by the Load stage.
    pub loaded: u64,
    /// Per-record tally from the Sync stage.
    pub sync: SyncReport,
}

/// Run the pipeline and release the store exactly once, on every exit path.
pub async fn run_to_completion<B, S, C>(
    browser: &B,
    store: &S,
    crm: &C,
    config: &Config,
) -> Result<PipelineReport, PipelineError>
where
    B: Browser,
    S: RecordStore,
    C: CrmClient,
{
    let outcome = run(browser, store, crm, config).await;
    if let Err(e) = store.close().await {
        warn!(error = %e, "[PIPELINE] Failed to release store connection");
    }
    outcome
}

/// The stage sequence itself. Prefer [`run_to_completion`], which adds the
/// guaranteed store release.
pub async fn run<B, S, C>(
    browser: &B,
    store: &S,
    crm: &C,
    config: &Config,
) -> Result<PipelineReport, PipelineError>
where
    B: Browser,
    S: RecordStore,
    C: CrmClient,
{
    info!("[PIPELINE] Starting run");

    let archive_path = match acquire::acquire_dataset(browser, config).await {
        Ok(path) => path,
        Err(e) => {
            // Terminal, non-retryable: Extract/Load/Sync are never invoked
            // and no temp-file deletion is attempted.
            error!(error = %e, "[PIPELINE][ERROR] Acquire stage failed, stopping run");
            return Err(e.into());
        }
    };

    info!("[PIPELINE] Extracting CSV...");
    let csv_path = match extract::extract_csv(&archive_path, &config.staging_dir).await {
        Ok(path) => path,
        Err(e) => {
            error!(error = %e, "[PIPELINE][ERROR] Extract stage failed");
            return Err(e.into());
        }
    };

    info!("[PIPELINE] Loading records into the store...");
    let loaded = match load::load_and_persist(store, &csv_path).await {
        Ok(count) => count,
        Err(e) => {
            error!(error = %e, "[PIPELINE][ERROR] Load stage failed");
            return Err(e.into());
        }
    };

    info!("[PIPELINE] Synchronising records to the CRM...");
    let sync = match sync::sync_all(store, crm).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "[PIPELINE][ERROR] Sync stage failed");
            return Err(e.into());
        }
    };

    cleanup(&archive_path, &csv_path).map_err(|e| {
        error!(error = %e, "[PIPELINE][ERROR] Cleanup failed");
        PipelineError::Cleanup(e)
    })?;

    info!(loaded, "[PIPELINE] Run complete");
    Ok(PipelineReport {
        archive_path,
        csv_path,
        loaded,
        sync,
    })
}

fn cleanup(archive_path: &Path, csv_path: &Path) -> io::Result<()> {
    fs::remove_file(archive_path)?;
    fs::remove_file(csv_path)?;
    info!("[PIPELINE] Temporary files deleted");
    Ok(())
}
