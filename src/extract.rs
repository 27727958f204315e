//! Archive Extractor: materialises exactly one named CSV entry from the
//! downloaded zip into the staging directory.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, error, info};
use zip::result::ZipError;
use zip::ZipArchive;

/// The entry the archive must contain; also the fixed destination filename.
pub const TARGET_ENTRY: &str = "babyNamesUSYOB-full.csv";

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The archive could not be opened or parsed.
    #[error("failed to open or parse archive: {0}")]
    Archive(#[from] ZipError),
    /// Iteration finished without ever seeing the target entry.
    #[error("archive has no entry named {0:?}")]
    EntryNotFound(&'static str),
    /// The destination file could not be written.
    #[error("failed to write extracted entry: {0}")]
    Write(#[from] io::Error),
}

/// Extract the target CSV entry from `archive_path` into the staging
/// directory. Resolves only once the destination file is fully written and
/// flushed; either the named entry is fully materialised or the stage fails.
pub async fn extract_csv(
    archive_path: &Path,
    staging_dir: &Path,
) -> Result<PathBuf, ExtractError> {
    let csv_path = staging_dir.join(TARGET_ENTRY);

    let file = File::open(archive_path).map_err(ZipError::Io)?;
    let mut archive = ZipArchive::new(file)?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.name() != TARGET_ENTRY {
            // Entries are decompressed on demand, so a skipped entry is
            // never read; nothing to drain.
            debug!(entry = entry.name(), "[EXTRACT] Skipping non-target entry");
            continue;
        }

        let mut destination = File::create(&csv_path)?;
        io::copy(&mut entry, &mut destination)?;
        // Completion is the write side finishing, not the read side:
        // consumers must not see the path before the bytes are on disk.
        destination.sync_all()?;
        info!(path = %csv_path.display(), "[EXTRACT] Entry extracted");
        return Ok(csv_path);
    }

    error!(entry = TARGET_ENTRY, "[EXTRACT][ERROR] Target entry absent from archive");
    Err(ExtractError::EntryNotFound(TARGET_ENTRY))
}
