//! # Daily Digest
//!
//! A batch job that writes one multilingual, multi-style news summary per
//! subject per day. Raw context comes from web search, summaries from a
//! generative-language model, and results are merged into a document store.
//!
//! ## Usage
//!
//! ```sh
//! GEMINI_API_KEY=... daily_digest
//! daily_digest --json-output-dir ./out --date 2025-05-06
//! ```
//!
//! ## Architecture
//!
//! The job is a two-level fan-out over one shared rate limiter:
//! 1. **Run**: one task per subject, all awaited together
//! 2. **Subject**: one generation per language, all awaited together
//! 3. **Generation**: search context → prompt → rate-limited model call → validated JSON
//! 4. **Merge**: thumbnail lookup from the first impartial headline, then a merge-write
//!    keyed by language code
//!
//! Failures stay inside their (subject, language) cell. Only a missing
//! configuration aborts the run.

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod context;
mod error;
mod generator;
mod images;
mod models;
mod orchestrator;
mod rate_limiter;
mod run;
mod search;
mod store;
mod utils;

#[cfg(test)]
mod testing;

use api::GeminiClient;
use cli::Cli;
use config::{Settings, StoreConfig};
use error::NewsError;
use run::RunController;
use search::duckduckgo::DuckDuckGo;
use store::firestore::{FirestoreStore, ServiceAccount};
use store::json::JsonFileStore;
use store::Store;
use utils::ensure_writable_dir;

fn main() -> Result<(), Box<dyn Error>> {
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let args = Cli::parse();
    debug!(?args.config, ?args.json_output_dir, ?args.date, "Parsed CLI arguments");

    let settings = match Settings::from_cli(&args) {
        Ok(settings) => settings,
        Err(e) => {
            error!(error = %e, "Invalid configuration; aborting before any work");
            return Err(e.into());
        }
    };

    // The worker pool is owned here and lives exactly as long as the run
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(settings.worker_threads)
        .enable_all()
        .build()?;
    info!(worker_threads = settings.worker_threads, "Runtime started");

    runtime.block_on(execute(settings))
}

async fn execute(settings: Settings) -> Result<(), Box<dyn Error>> {
    let start_time = std::time::Instant::now();
    info!("daily_digest starting up");

    let store = open_store(&settings).await?;
    let mut model = GeminiClient::new(&settings.api_key, &settings.model, settings.request_timeout)?;
    if let Some(base_url) = &settings.model_base_url {
        model = model.with_base_url(base_url);
    }
    let search = DuckDuckGo::new(settings.request_timeout)?;

    let controller = RunController::new(
        Arc::new(model),
        Arc::new(search),
        Arc::new(store),
        &settings,
    );
    let summary = controller.run(&settings.run_date()).await;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        date = %summary.date,
        persisted = summary.persisted(),
        generated = summary.generated(),
        "Execution complete"
    );
    Ok(())
}

async fn open_store(settings: &Settings) -> Result<Store, Box<dyn Error>> {
    match &settings.store {
        StoreConfig::Json { dir } => {
            if let Err(e) = ensure_writable_dir(dir).await {
                error!(path = %dir, error = %e, "JSON output directory is not writable");
                return Err(e);
            }
            info!(path = %dir, "Writing documents to local JSON files");
            Ok(Store::Json(JsonFileStore::new(dir)))
        }
        StoreConfig::Firestore {
            credentials_json,
            key_path,
        } => {
            let account = match credentials_json {
                Some(json) => ServiceAccount::from_json(json)?,
                None => ServiceAccount::from_file(key_path)?,
            };
            info!(project = %account.project_id, "Writing documents to Firestore");
            let store = FirestoreStore::new(account, settings.request_timeout)
                .map_err(|e| NewsError::Config(format!("unusable Firestore credentials: {e}")))?;
            Ok(Store::Firestore(store))
        }
    }
}
