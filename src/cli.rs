//! Command-line interface definitions for the daily digest job.
//!
//! All options can be provided via command-line flags or environment
//! variables (a `.env` file in the working directory is loaded first).

use chrono::NaiveDate;
use clap::Parser;

/// Command-line arguments for one generation run.
///
/// # Examples
///
/// ```sh
/// # Production run: key and Firestore credentials from the environment
/// GEMINI_API_KEY=... daily_digest
///
/// # Write documents to local JSON files instead of Firestore
/// daily_digest --json-output-dir ./out
///
/// # Re-run a past date with a custom subject list
/// daily_digest --date 2025-05-06 --config subjects.yaml
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Gemini API key (required)
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = crate::api::DEFAULT_MODEL)]
    pub model: String,

    /// Override the Gemini API host (proxies, local mocks)
    #[arg(long, env = "GEMINI_BASE_URL")]
    pub gemini_base_url: Option<String>,

    /// Minimum seconds between the starts of two model requests
    #[arg(long, env = "REQUEST_INTERVAL_SECONDS", default_value_t = 10.0)]
    pub request_interval_secs: f64,

    /// Timeout in seconds for any single HTTP request
    #[arg(long, env = "REQUEST_TIMEOUT_SECONDS", default_value_t = 120)]
    pub request_timeout_secs: u64,

    /// Path to the Firebase service-account key file
    #[arg(long, env = "FIREBASE_KEY_PATH", default_value = "serviceAccountKey.json")]
    pub firebase_key_path: String,

    /// Inline Firebase service-account JSON (takes precedence over the key file)
    #[arg(long, env = "FIREBASE_CREDENTIALS", hide_env_values = true)]
    pub firebase_credentials: Option<String>,

    /// Write documents as JSON files under this directory instead of Firestore
    #[arg(short, long, env = "NEWS_JSON_OUTPUT_DIR")]
    pub json_output_dir: Option<String>,

    /// Optional path to a YAML file overriding subjects and languages
    #[arg(short, long, env = "NEWS_CONFIG")]
    pub config: Option<String>,

    /// Run date (YYYY-MM-DD); defaults to today's local date
    #[arg(long, env = "NEWS_DATE")]
    pub date: Option<NaiveDate>,

    /// Worker threads of the async runtime
    #[arg(long, env = "NEWS_WORKER_THREADS", default_value_t = 4)]
    pub worker_threads: usize,

    /// Search region code
    #[arg(long, env = "NEWS_SEARCH_REGION", default_value = "wt-wt")]
    pub search_region: String,
}
