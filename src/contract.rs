//! # contract: interface seams between pipeline stages and their collaborators
//!
//! This module defines the traits the pipeline depends on — the browser
//! automation engine, the relational record store, and the CRM client — plus
//! the plain data types that cross those seams.
//!
//! ## Interface & Extensibility
//! - Implement [`Browser`] to plug in a different automation engine.
//! - Implement [`RecordStore`] to back the pipeline with another store.
//! - Implement [`CrmClient`] to replicate records to another CRM.
//! - All methods are async, returning results and using boxed error types.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall` so consumers can generate
//!   deterministic mocks for unit/integration tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use mockall::automock;

/// A single row from the source CSV, in file order.
///
/// Neither field is validated: a malformed row yields `None` for the missing
/// column rather than being rejected, and values are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameRecord {
    pub name: Option<String>,
    pub sex: Option<String>,
}

/// A record as read back from the store, carrying its storage-assigned id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub id: i64,
    pub name: Option<String>,
    pub sex: Option<String>,
}

/// A finished download announced by the browser session, not yet moved into
/// the staging directory.
#[derive(Debug, Clone)]
pub struct DownloadHandle {
    /// Filename suggested by the download signal.
    pub suggested_filename: String,
    /// Where the session wrote the bytes.
    pub source_path: PathBuf,
}

/// Error type for Browser trait (simple boxed error for now)
pub type BrowserError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for RecordStore trait.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// Error type for CrmClient trait.
pub type CrmError = Box<dyn std::error::Error + Send + Sync>;

/// Operations the pipeline needs from the browser-automation engine:
/// navigate, fill field, click, await download, save file.
///
/// The trait is agnostic of the underlying driver; selectors are plain
/// strings interpreted by the implementation.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigate the session to the given URL.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Fill the field matching `selector` with `value`.
    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError>;

    /// Click the element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), BrowserError>;

    /// Wait at most `timeout` for an element matching `selector` to appear.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// Resolve once the session reports a started-and-completed download.
    async fn await_download(&self) -> Result<DownloadHandle, BrowserError>;

    /// Persist a finished download into `dir` under its suggested filename,
    /// creating `dir` if absent. Returns the final path.
    async fn save_download(
        &self,
        download: &DownloadHandle,
        dir: &Path,
    ) -> Result<PathBuf, BrowserError>;

    /// Release the underlying session. Safe to call exactly once.
    async fn close(&self) -> Result<(), BrowserError>;
}

/// Persistence seam: schema definition, bulk insert, full read-back.
/// The implementor is responsible for connecting to a backing database.
///
/// The trait is implemented by the real store and by test mocks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Create the backing table if it does not already exist. Idempotent:
    /// calling this against an initialised schema must not fail and must not
    /// alter existing rows.
    async fn init_schema(&self) -> Result<(), StoreError>;

    /// Write the whole batch in a single round trip, preserving batch order.
    /// Returns the number of rows written.
    async fn insert_all(&self, records: &[NameRecord]) -> Result<u64, StoreError>;

    /// Read back every stored record, ordered by storage identity.
    async fn fetch_all(&self) -> Result<Vec<StoredRecord>, StoreError>;

    /// Release the connection. Called exactly once by the orchestrator's
    /// terminal step, regardless of how the run ended.
    async fn close(&self) -> Result<(), StoreError>;
}

/// Outbound CRM seam: one operation, contact creation.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CrmClient: Send + Sync {
    /// Create one remote contact for a stored record.
    async fn create_contact(&self, record: &StoredRecord) -> Result<(), CrmError>;
}
