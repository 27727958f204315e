//! WebDriver-backed implementation of the [`Browser`] contract.
//!
//! The WebDriver protocol has no download event, so "await download" is
//! realised by watching the session's download directory for a file that
//! appears after the watch begins and whose size is stable across two
//! polls. Files already present when the watch starts are ignored: a failed
//! run deliberately leaves its archive on disk in this same directory, and
//! that leftover must never be mistaken for the new download. Browsers mark
//! in-flight downloads with a `.part`/`.crdownload` suffix and drop it when
//! the stream finishes.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use fantoccini::error::NewSessionError;
use fantoccini::{Client, ClientBuilder, Locator};
use tokio::time::Instant;
use tracing::{debug, info};

use crate::contract::{Browser, BrowserError, DownloadHandle};

const DOWNLOAD_POLL: Duration = Duration::from_millis(500);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// A browser session driven over the WebDriver protocol.
///
/// `download_dir` must match the directory the browser profile is configured
/// to download into; the headless profile is expected to download without
/// prompting.
pub struct WebDriverBrowser {
    client: Client,
    download_dir: PathBuf,
}

impl WebDriverBrowser {
    /// Connect to a running WebDriver server (chromedriver, geckodriver, or
    /// a Selenium hub).
    pub async fn connect(
        webdriver_url: &str,
        download_dir: &Path,
    ) -> Result<Self, NewSessionError> {
        let client = ClientBuilder::rustls().connect(webdriver_url).await?;
        info!(url = webdriver_url, "[BROWSER] WebDriver session established");
        Ok(Self {
            client,
            download_dir: download_dir.to_path_buf(),
        })
    }

    /// Selectors starting with `//` are treated as XPath, anything else as CSS.
    fn locator(selector: &str) -> Locator<'_> {
        if selector.starts_with("//") {
            Locator::XPath(selector)
        } else {
            Locator::Css(selector)
        }
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.client.goto(url).await?;
        Ok(())
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<(), BrowserError> {
        let field = self.client.find(Self::locator(selector)).await?;
        field.clear().await?;
        field.send_keys(value).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<(), BrowserError> {
        self.client.find(Self::locator(selector)).await?.click().await?;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.client
            .wait()
            .at_most(timeout)
            .for_element(Self::locator(selector))
            .await?;
        Ok(())
    }

    async fn await_download(&self) -> Result<DownloadHandle, BrowserError> {
        watch_for_download(&self.download_dir, DOWNLOAD_POLL, DOWNLOAD_TIMEOUT).await
    }

    async fn save_download(
        &self,
        download: &DownloadHandle,
        dir: &Path,
    ) -> Result<PathBuf, BrowserError> {
        fs::create_dir_all(dir)?;
        let target = dir.join(&download.suggested_filename);
        if download.source_path != target {
            // Rename fails across filesystems; fall back to copy-and-remove.
            if fs::rename(&download.source_path, &target).is_err() {
                fs::copy(&download.source_path, &target)?;
                fs::remove_file(&download.source_path)?;
            }
        }
        Ok(target)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.client.clone().close().await?;
        Ok(())
    }
}

/// Watch `dir` for a freshly appearing, completed archive.
///
/// A baseline snapshot is taken on entry; only files absent from it are
/// candidates, and a candidate is reported only once its size is unchanged
/// across two consecutive polls.
async fn watch_for_download(
    dir: &Path,
    poll: Duration,
    timeout: Duration,
) -> Result<DownloadHandle, BrowserError> {
    let baseline = snapshot(dir)?;
    let deadline = Instant::now() + timeout;
    let mut candidate: Option<(PathBuf, u64)> = None;

    loop {
        match finished_download(dir, &baseline)? {
            Some((path, size)) => match candidate.take() {
                Some((seen_path, seen_size)) if seen_path == path && seen_size == size => {
                    let suggested_filename = path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .unwrap_or("download.zip")
                        .to_string();
                    debug!(file = %suggested_filename, size, "[BROWSER] Download completed");
                    return Ok(DownloadHandle {
                        suggested_filename,
                        source_path: path,
                    });
                }
                _ => candidate = Some((path, size)),
            },
            None => candidate = None,
        }
        if Instant::now() >= deadline {
            return Err("timed out waiting for the download to complete".into());
        }
        tokio::time::sleep(poll).await;
    }
}

/// Files present in `dir` before the watch began; these can never be the
/// download this run is waiting for.
fn snapshot(dir: &Path) -> io::Result<HashSet<PathBuf>> {
    let mut seen = HashSet::new();
    if !dir.exists() {
        return Ok(seen);
    }
    for entry in fs::read_dir(dir)? {
        seen.insert(entry?.path());
    }
    Ok(seen)
}

/// Returns the first completed archive in `dir` that is not part of the
/// baseline, with its current size, or `None` while the download is still
/// in flight (or has not started).
fn finished_download(
    dir: &Path,
    baseline: &HashSet<PathBuf>,
) -> io::Result<Option<(PathBuf, u64)>> {
    if !dir.exists() {
        return Ok(None);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if baseline.contains(&path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.ends_with(".part") || name.ends_with(".crdownload") {
            continue;
        }
        if path.is_file() && name.ends_with(".zip") {
            let size = entry.metadata()?.len();
            return Ok(Some((path, size)));
        }
    }
    Ok(None)
}
