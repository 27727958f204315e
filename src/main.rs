use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use babynames_etl::browser::WebDriverBrowser;
use babynames_etl::config::Config;
use babynames_etl::contract::Browser;
use babynames_etl::crm::HubSpotClient;
use babynames_etl::pipeline;
use babynames_etl::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    config.trace_loaded();

    let browser = WebDriverBrowser::connect(&config.webdriver_url, &config.staging_dir)
        .await
        .context("failed to establish a browser session")?;
    // The browser session is already live; release it if the database
    // connection cannot be established.
    let store = match PgStore::connect(&config).await {
        Ok(store) => store,
        Err(e) => {
            if let Err(close_err) = browser.close().await {
                eprintln!("[ERROR] Failed to close browser session: {close_err}");
            }
            return Err(e).context("failed to connect to the database");
        }
    };
    let crm = HubSpotClient::new(config.crm_api_key.clone());

    println!("Pipeline starting...");
    match pipeline::run_to_completion(&browser, &store, &crm, &config).await {
        Ok(report) => {
            println!("Pipeline complete.\nReport:");
            println!("{:#?}", report);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("[ERROR] Pipeline failed: {e}");
            std::process::exit(1);
        }
    }
}
