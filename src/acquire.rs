//! Session Acquirer: logs in to the dataset provider through an interactive
//! browser session and triggers the archive download.
//!
//! The only evidence of successful authentication is the post-login UI marker
//! appearing within the bounded wait; no token or session object is returned.
//! The download trigger joins two concurrent waits — the download signal and
//! the menu click's own completion — before the artifact is saved into the
//! staging directory.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::contract::{Browser, BrowserError};

const LOGIN_URL: &str = "https://www.kaggle.com/account/login?phase=emailSignIn&returnUrl=%2F";
const DATASET_URL: &str =
    "https://www.kaggle.com/datasets/thedevastator/us-baby-names-by-year-of-birth";

const EMAIL_FIELD: &str = r#"input[name="email"]"#;
const PASSWORD_FIELD: &str = r#"input[name="password"]"#;
const SUBMIT_BUTTON: &str = r#"button[type="submit"]"#;
const LOGGED_IN_MARKER: &str = r#"button[data-menutarget="true"]"#;
const DOWNLOAD_BUTTON: &str = "//button[contains(., 'Download')]";
const DOWNLOAD_AS_ZIP: &str = "//li[contains(., 'Download as zip')]";

/// Bounded wait for the post-login marker.
const LOGIN_TIMEOUT: Duration = Duration::from_secs(50);

/// Tagged failure kinds so the orchestrator can branch on what went wrong
/// rather than on a generic "no result".
#[derive(Debug, Error)]
pub enum AcquireError {
    /// Login failed: a control was missing or the post-login marker never
    /// appeared within the bounded wait.
    #[error("authentication failed: {0}")]
    Auth(BrowserError),
    /// The export trigger, download signal or save-to-disk failed after a
    /// successful login.
    #[error("download failed: {0}")]
    Download(BrowserError),
}

/// Authenticate, trigger the export and save the archive under the staging
/// directory. The browser session is always released before returning,
/// success or failure.
pub async fn acquire_dataset<B: Browser>(
    browser: &B,
    config: &Config,
) -> Result<PathBuf, AcquireError> {
    let outcome = login_and_download(browser, config).await;
    if let Err(e) = browser.close().await {
        warn!(error = %e, "[ACQUIRE] Failed to release browser session");
    }
    outcome
}

async fn login_and_download<B: Browser>(
    browser: &B,
    config: &Config,
) -> Result<PathBuf, AcquireError> {
    info!(url = LOGIN_URL, "[ACQUIRE] Navigating to provider login page");
    browser.navigate(LOGIN_URL).await.map_err(|e| {
        error!(error = %e, "[ACQUIRE][ERROR] Failed to open login page");
        AcquireError::Auth(e)
    })?;

    debug!("[ACQUIRE] Putting in email and password");
    browser
        .fill(EMAIL_FIELD, &config.provider_email)
        .await
        .map_err(|e| {
            error!(error = %e, "[ACQUIRE][ERROR] Failed to fill email field");
            AcquireError::Auth(e)
        })?;
    browser
        .fill(PASSWORD_FIELD, &config.provider_password)
        .await
        .map_err(|e| {
            error!(error = %e, "[ACQUIRE][ERROR] Failed to fill password field");
            AcquireError::Auth(e)
        })?;
    browser.click(SUBMIT_BUTTON).await.map_err(|e| {
        error!(error = %e, "[ACQUIRE][ERROR] Failed to submit login form");
        AcquireError::Auth(e)
    })?;

    // The marker appearing is the sole evidence of successful authentication.
    browser
        .wait_for(LOGGED_IN_MARKER, LOGIN_TIMEOUT)
        .await
        .map_err(|e| {
            error!(error = %e, "[ACQUIRE][ERROR] Timed out waiting for post-login marker");
            AcquireError::Auth(e)
        })?;
    debug!("[ACQUIRE] Logged in");

    browser.navigate(DATASET_URL).await.map_err(|e| {
        error!(error = %e, "[ACQUIRE][ERROR] Failed to open dataset page");
        AcquireError::Download(e)
    })?;
    browser.click(DOWNLOAD_BUTTON).await.map_err(|e| {
        error!(error = %e, "[ACQUIRE][ERROR] Failed to click export control");
        AcquireError::Download(e)
    })?;
    debug!("[ACQUIRE] Download clicked");

    // The download signal and the menu click resolve together, as one join
    // point; both must succeed before the artifact is saved.
    let (download, clicked) = tokio::join!(
        browser.await_download(),
        browser.click(DOWNLOAD_AS_ZIP)
    );
    clicked.map_err(|e| {
        error!(error = %e, "[ACQUIRE][ERROR] Failed to click archive option");
        AcquireError::Download(e)
    })?;
    let download = download.map_err(|e| {
        error!(error = %e, "[ACQUIRE][ERROR] Download signal never completed");
        AcquireError::Download(e)
    })?;

    let archive_path = browser
        .save_download(&download, &config.staging_dir)
        .await
        .map_err(|e| {
            error!(error = %e, "[ACQUIRE][ERROR] Failed to save archive to staging dir");
            AcquireError::Download(e)
        })?;

    info!(path = %archive_path.display(), "[ACQUIRE] Archive downloaded successfully");
    Ok(archive_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{DownloadHandle, MockBrowser};
    use std::path::Path;

    fn test_config(staging: &Path) -> Config {
        Config {
            provider_email: "user@example.com".into(),
            provider_password: "hunter2".into(),
            crm_api_key: String::new(),
            db_user: String::new(),
            db_password: String::new(),
            db_name: String::new(),
            staging_dir: staging.to_path_buf(),
            webdriver_url: String::new(),
        }
    }

    #[tokio::test]
    async fn marker_timeout_is_an_auth_failure_and_session_is_released() {
        let mut browser = MockBrowser::new();
        browser.expect_navigate().times(1).returning(|_| Ok(()));
        browser.expect_fill().times(2).returning(|_, _| Ok(()));
        browser.expect_click().times(1).returning(|_| Ok(()));
        browser
            .expect_wait_for()
            .times(1)
            .returning(|_, _| Err("timed out waiting for element".into()));
        browser.expect_close().times(1).returning(|| Ok(()));

        let config = test_config(Path::new("downloads"));
        let result = acquire_dataset(&browser, &config).await;
        assert!(matches!(result, Err(AcquireError::Auth(_))));
    }

    #[tokio::test]
    async fn missing_login_control_is_an_auth_failure() {
        let mut browser = MockBrowser::new();
        browser.expect_navigate().times(1).returning(|_| Ok(()));
        browser
            .expect_fill()
            .times(1)
            .returning(|_, _| Err("no such element".into()));
        browser.expect_close().times(1).returning(|| Ok(()));

        let config = test_config(Path::new("downloads"));
        let result = acquire_dataset(&browser, &config).await;
        assert!(matches!(result, Err(AcquireError::Auth(_))));
    }

    #[tokio::test]
    async fn save_failure_is_a_download_failure() {
        let mut browser = MockBrowser::new();
        browser.expect_navigate().times(2).returning(|_| Ok(()));
        browser.expect_fill().times(2).returning(|_, _| Ok(()));
        browser.expect_click().times(3).returning(|_| Ok(()));
        browser.expect_wait_for().times(1).returning(|_, _| Ok(()));
        browser.expect_await_download().times(1).returning(|| {
            Ok(DownloadHandle {
                suggested_filename: "archive.zip".into(),
                source_path: "/tmp/archive.zip".into(),
            })
        });
        browser
            .expect_save_download()
            .times(1)
            .returning(|_, _| Err("disk full".into()));
        browser.expect_close().times(1).returning(|| Ok(()));

        let config = test_config(Path::new("downloads"));
        let result = acquire_dataset(&browser, &config).await;
        assert!(matches!(result, Err(AcquireError::Download(_))));
    }

    #[tokio::test]
    async fn happy_path_yields_the_saved_archive_path() {
        let mut browser = MockBrowser::new();
        browser.expect_navigate().times(2).returning(|_| Ok(()));
        browser
            .expect_fill()
            .withf(|selector, value| {
                (selector.contains("email") && value == "user@example.com")
                    || (selector.contains("password") && value == "hunter2")
            })
            .times(2)
            .returning(|_, _| Ok(()));
        browser.expect_click().times(3).returning(|_| Ok(()));
        browser.expect_wait_for().times(1).returning(|_, _| Ok(()));
        browser.expect_await_download().times(1).returning(|| {
            Ok(DownloadHandle {
                suggested_filename: "archive.zip".into(),
                source_path: "/tmp/archive.zip".into(),
            })
        });
        browser
            .expect_save_download()
            .times(1)
            .returning(|download, dir| Ok(dir.join(&download.suggested_filename)));
        browser.expect_close().times(1).returning(|| Ok(()));

        let config = test_config(Path::new("downloads"));
        let path = acquire_dataset(&browser, &config)
            .await
            .expect("acquire should succeed");
        assert_eq!(path, Path::new("downloads").join("archive.zip"));
    }
}
