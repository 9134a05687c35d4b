//! Run configuration.
//!
//! Settings come from three layers, later ones winning:
//! 1. Built-in defaults (six subjects, three languages, 10 s interval)
//! 2. An optional YAML file with `subjects` and/or `languages`
//! 3. CLI flags / environment variables (see [`crate::cli::Cli`])
//!
//! ```yaml
//! subjects:
//!   - Politics
//!   - Economy & Business
//! languages:
//!   - { name: English, code: en }
//!   - { name: Portuguese, code: pt }
//! ```

use crate::cli::Cli;
use crate::error::{NewsError, Result};
use crate::images::DEFAULT_LOOKUP_DELAY;
use crate::models::{LanguageSpec, Subject};
use chrono::NaiveDate;
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, instrument};

pub const DEFAULT_SUBJECTS: [&str; 6] = [
    "Politics",
    "Economy & Business",
    "Technology",
    "Health & Science",
    "Sports",
    "Entertainment & Culture",
];

pub const DEFAULT_LANGUAGES: [(&str, &str); 3] =
    [("English", "en"), ("Portuguese", "pt"), ("Spanish", "es")];

/// Where subject documents are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    /// Firestore with inline credentials, or the key file when none are given.
    Firestore {
        credentials_json: Option<String>,
        key_path: PathBuf,
    },
    /// Local JSON files under a directory.
    Json { dir: String },
}

/// Optional YAML overrides.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub subjects: Option<Vec<String>>,
    pub languages: Option<Vec<LanguageSpec>>,
}

impl FileConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &str) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| NewsError::Config(format!("cannot read config file {path}: {e}")))?;
        Self::from_yaml(&yaml)
    }
}

#[derive(Clone)]
pub struct Settings {
    pub api_key: String,
    pub model: String,
    pub model_base_url: Option<String>,
    pub request_interval: Duration,
    pub request_timeout: Duration,
    pub image_lookup_delay: Duration,
    pub worker_threads: usize,
    pub search_region: String,
    pub subjects: Vec<Subject>,
    pub languages: Vec<LanguageSpec>,
    pub date: Option<NaiveDate>,
    pub store: StoreConfig,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("model", &self.model)
            .field("request_interval", &self.request_interval)
            .field("worker_threads", &self.worker_threads)
            .field("subjects", &self.subjects)
            .field("languages", &self.languages)
            .field("date", &self.date)
            .finish_non_exhaustive()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: crate::api::DEFAULT_MODEL.to_string(),
            model_base_url: None,
            request_interval: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            image_lookup_delay: DEFAULT_LOOKUP_DELAY,
            worker_threads: 4,
            search_region: "wt-wt".to_string(),
            subjects: DEFAULT_SUBJECTS.iter().map(|s| Subject::new(*s)).collect(),
            languages: DEFAULT_LANGUAGES
                .iter()
                .map(|(name, code)| LanguageSpec::new(*name, *code))
                .collect(),
            date: None,
            store: StoreConfig::Firestore {
                credentials_json: None,
                key_path: PathBuf::from("serviceAccountKey.json"),
            },
        }
    }
}

impl Settings {
    /// Resolve settings from parsed CLI arguments and the optional YAML file.
    ///
    /// # Errors
    ///
    /// [`NewsError::Config`] when the model API key is missing, the config
    /// file is unreadable, or [`Settings::validate`] fails.
    #[instrument(level = "info", skip_all)]
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let api_key = cli
            .gemini_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| NewsError::Config("GEMINI_API_KEY environment variable not set".to_string()))?;

        let file = match &cli.config {
            Some(path) => {
                info!(%path, "Loading config file");
                FileConfig::load(path)?
            }
            None => FileConfig::default(),
        };

        let request_interval = Duration::try_from_secs_f64(cli.request_interval_secs).map_err(|e| {
            NewsError::Config(format!(
                "request interval must be a non-negative number of seconds, got {}: {e}",
                cli.request_interval_secs
            ))
        })?;

        let defaults = Settings::default();
        let store = match &cli.json_output_dir {
            Some(dir) => StoreConfig::Json { dir: dir.clone() },
            None => StoreConfig::Firestore {
                credentials_json: cli.firebase_credentials.clone(),
                key_path: PathBuf::from(&cli.firebase_key_path),
            },
        };

        let settings = Settings {
            api_key,
            model: cli.model.clone(),
            model_base_url: cli.gemini_base_url.clone(),
            request_interval,
            request_timeout: Duration::from_secs(cli.request_timeout_secs),
            worker_threads: cli.worker_threads,
            search_region: cli.search_region.clone(),
            subjects: file
                .subjects
                .map(|s| s.into_iter().map(Subject::new).collect())
                .unwrap_or(defaults.subjects),
            languages: file.languages.unwrap_or(defaults.languages),
            date: cli.date,
            store,
            ..defaults
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check the run matrix and runtime sizing.
    pub fn validate(&self) -> Result<()> {
        if self.subjects.is_empty() {
            return Err(NewsError::Config("at least one subject is required".to_string()));
        }
        if self.languages.is_empty() {
            return Err(NewsError::Config("at least one language is required".to_string()));
        }
        if self.worker_threads == 0 {
            return Err(NewsError::Config("worker_threads must be at least 1".to_string()));
        }

        let mut by_slug: HashMap<String, &Subject> = HashMap::new();
        for subject in &self.subjects {
            if subject.label().trim().is_empty() {
                return Err(NewsError::Config("subject labels must not be empty".to_string()));
            }
            if let Some(other) = by_slug.insert(subject.slug(), subject) {
                return Err(NewsError::Config(format!(
                    "subjects '{other}' and '{subject}' share the document id '{}'",
                    subject.slug()
                )));
            }
        }

        let duplicates: Vec<&str> = self
            .languages
            .iter()
            .map(|l| l.code.as_str())
            .duplicates()
            .collect();
        if !duplicates.is_empty() {
            return Err(NewsError::Config(format!(
                "duplicate language codes: {}",
                duplicates.join(", ")
            )));
        }
        if self.languages.iter().any(|l| l.code.trim().is_empty() || l.name.trim().is_empty()) {
            return Err(NewsError::Config("languages need a name and a code".to_string()));
        }
        Ok(())
    }

    /// The run date, `YYYY-MM-DD`.
    pub fn run_date(&self) -> String {
        match self.date {
            Some(date) => date.format("%Y-%m-%d").to_string(),
            None => crate::run::today(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["daily_digest"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.subjects.len(), 6);
        assert_eq!(settings.languages[1], LanguageSpec::new("Portuguese", "pt"));
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let err = Settings::from_cli(&cli(&["--gemini-api-key", "  "])).unwrap_err();
        assert!(matches!(err, NewsError::Config(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn test_from_cli_selects_json_store() {
        let settings = Settings::from_cli(&cli(&["--gemini-api-key", "k", "-j", "./out"])).unwrap();
        assert_eq!(settings.store, StoreConfig::Json { dir: "./out".to_string() });
        assert_eq!(settings.request_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_from_cli_uses_date_override() {
        let settings =
            Settings::from_cli(&cli(&["--gemini-api-key", "k", "--date", "2025-05-06"])).unwrap();
        assert_eq!(settings.run_date(), "2025-05-06");
    }

    #[test]
    fn test_negative_interval_rejected() {
        let err = Settings::from_cli(&cli(&["--gemini-api-key", "k", "--request-interval-secs=-1"]))
            .unwrap_err();
        assert!(err.to_string().contains("interval"));
    }

    #[test]
    fn test_oversized_interval_rejected() {
        for value in ["1e20", "NaN", "inf"] {
            let err = Settings::from_cli(&cli(&[
                "--gemini-api-key",
                "k",
                "--request-interval-secs",
                value,
            ]))
            .unwrap_err();
            assert!(matches!(err, NewsError::Config(_)), "{value}: {err}");
        }
    }

    #[test]
    fn test_fractional_interval_accepted() {
        let settings =
            Settings::from_cli(&cli(&["--gemini-api-key", "k", "--request-interval-secs", "0.5"])).unwrap();
        assert_eq!(settings.request_interval, Duration::from_millis(500));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let settings = Settings {
            api_key: "secret-key".to_string(),
            ..Settings::default()
        };
        assert!(!format!("{settings:?}").contains("secret-key"));
    }

    #[test]
    fn test_slug_collision_rejected() {
        let settings = Settings {
            subjects: vec![Subject::new("Health & Science"), Subject::new("health science")],
            ..Settings::default()
        };
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("health-science"));
    }

    #[test]
    fn test_duplicate_language_codes_rejected() {
        let settings = Settings {
            languages: vec![LanguageSpec::new("English", "en"), LanguageSpec::new("Inglés", "en")],
            ..Settings::default()
        };
        assert!(settings.validate().unwrap_err().to_string().contains("en"));
    }

    #[test]
    fn test_file_config_from_yaml() {
        let yaml = r#"
subjects:
  - Politics
  - Climate & Energy
languages:
  - { name: English, code: en }
  - { name: French, code: fr }
"#;
        let file = FileConfig::from_yaml(yaml).unwrap();
        assert_eq!(file.subjects.unwrap()[1], "Climate & Energy");
        assert_eq!(file.languages.unwrap()[1], LanguageSpec::new("French", "fr"));
    }

    #[test]
    fn test_file_config_rejects_unknown_keys() {
        assert!(FileConfig::from_yaml("topics: [Politics]").is_err());
    }

    #[test]
    fn test_from_cli_reads_config_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("subjects.yaml");
        std::fs::write(&path, "subjects: [Sports]\n").unwrap();

        let settings =
            Settings::from_cli(&cli(&["--gemini-api-key", "k", "-c", path.to_str().unwrap()])).unwrap();
        assert_eq!(settings.subjects, vec![Subject::new("Sports")]);
        assert_eq!(settings.languages.len(), 3);
    }
}
