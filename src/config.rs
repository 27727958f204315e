use std::env;
use std::path::PathBuf;

use tracing::info;

/// The database host is fixed; only credentials and database name vary.
pub const DB_HOST: &str = "localhost";

const DEFAULT_STAGING_DIR: &str = "./downloads";
const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

/// Environment-sourced configuration for a full pipeline run.
///
/// All credential fields default to the empty string when unset; a real run
/// requires every one of them.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider_email: String,
    pub provider_password: String,
    pub crm_api_key: String,
    pub db_user: String,
    pub db_password: String,
    pub db_name: String,
    /// Process-local directory for the downloaded archive and extracted CSV.
    pub staging_dir: PathBuf,
    /// WebDriver server the browser session connects through.
    pub webdriver_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            provider_email: var_or_empty("PROVIDER_EMAIL"),
            provider_password: var_or_empty("PROVIDER_PASSWORD"),
            crm_api_key: var_or_empty("CRM_API_KEY"),
            db_user: var_or_empty("DB_USER"),
            db_password: var_or_empty("DB_PASSWORD"),
            db_name: var_or_empty("DB_NAME"),
            staging_dir: env::var("STAGING_DIR")
                .unwrap_or_else(|_| DEFAULT_STAGING_DIR.to_string())
                .into(),
            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| DEFAULT_WEBDRIVER_URL.to_string()),
        }
    }

    pub fn trace_loaded(&self) {
        // Credentials stay out of the logs; lengths are enough to diagnose
        // an unset variable.
        info!(
            staging_dir = %self.staging_dir.display(),
            webdriver_url = %self.webdriver_url,
            db_name = %self.db_name,
            db_user = %self.db_user,
            provider_email_len = self.provider_email.len(),
            crm_api_key_len = self.crm_api_key.len(),
            "Loaded Config"
        );
    }
}

fn var_or_empty(key: &str) -> String {
    env::var(key).unwrap_or_default()
}
