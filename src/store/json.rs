//! Local JSON file store.
//!
//! Mirrors the Firestore layout on disk, one file per subject document:
//! ```text
//! json_output_dir/
//! └── news/
//!     └── 2025-05-06/
//!         └── subjects/
//!             ├── politics.json
//!             └── sports.json
//! ```
//!
//! Writes read the existing file (if any), apply the merge, and write it
//! back through a sibling `.json.tmp` file and a rename. A process-wide lock
//! serializes these read-modify-write cycles. An existing file that does not
//! parse as a JSON object fails the write and is left as it is.

use super::{DocumentStore, document_path};
use crate::error::{NewsError, Result};
use crate::models::SubjectPayload;
use crate::utils::truncate_for_log;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

#[derive(Debug)]
pub struct JsonFileStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn file_path(&self, date: &str, slug: &str) -> PathBuf {
        self.root.join(format!("{}.json", document_path(date, slug)))
    }
}

impl DocumentStore for JsonFileStore {
    #[instrument(level = "info", skip_all, fields(%date, %slug))]
    async fn merge_subject(&self, date: &str, slug: &str, payload: &SubjectPayload) -> Result<()> {
        let path = self.file_path(date, slug);
        let _guard = self.write_lock.lock().await;

        let existing = match fs::read_to_string(&path).await {
            Ok(text) => parse_existing(&text).inspect_err(|e| {
                warn!(path = %path.display(), error = %e, "Existing document is unreadable; leaving it untouched");
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let merged = merge_document(existing, payload, &now)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        // Readers only ever see the old or the new document
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_string_pretty(&Value::Object(merged))?).await?;
        fs::rename(&tmp_path, &path).await?;
        info!(path = %path.display(), languages = payload.content.len(), "Saved subject document");
        Ok(())
    }
}

/// Parse a stored document. Anything but a JSON object is an error, so the
/// languages it may hold are never replaced by an empty document.
fn parse_existing(text: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(text)? {
        Value::Object(map) => Ok(map),
        other => Err(NewsError::Parse(format!(
            "stored document is not a JSON object: {}",
            truncate_for_log(&other.to_string(), 80)
        ))),
    }
}

/// Apply a payload to an existing document with per-language merge semantics.
fn merge_document(mut doc: Map<String, Value>, payload: &SubjectPayload, updated_at: &str) -> Result<Map<String, Value>> {
    doc.insert("category".to_string(), Value::String(payload.category.clone()));
    if let Some(thumb) = &payload.thumb_url {
        doc.insert("thumbUrl".to_string(), Value::String(thumb.clone()));
    }
    doc.insert("updatedAt".to_string(), Value::String(updated_at.to_string()));

    let content = doc
        .entry("content")
        .or_insert_with(|| Value::Object(Map::new()));
    if !content.is_object() {
        *content = Value::Object(Map::new());
    }
    if let Value::Object(languages) = content {
        for (code, generated) in &payload.content {
            languages.insert(code.clone(), serde_json::to_value(generated)?);
        }
    }
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Subject;
    use crate::testing::sample_content;

    fn payload(langs: &[(&str, &str)]) -> SubjectPayload {
        let mut payload = SubjectPayload::new(&Subject::new("Sports"), Some("https://img/1".to_string()));
        for (code, title) in langs {
            payload
                .content
                .insert(code.to_string(), sample_content(title, &["https://s/1"]));
        }
        payload
    }

    #[tokio::test]
    async fn test_merge_preserves_previous_languages() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(tmp.path());

        store
            .merge_subject("2025-06-01", "sports", &payload(&[("en", "Old EN"), ("es", "Old ES")]))
            .await
            .unwrap();
        store
            .merge_subject("2025-06-01", "sports", &payload(&[("en", "New EN")]))
            .await
            .unwrap();

        let path = tmp.path().join("news/2025-06-01/subjects/sports.json");
        let doc: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();

        assert_eq!(doc["category"], "Sports");
        assert_eq!(doc["thumbUrl"], "https://img/1");
        assert!(doc["updatedAt"].is_string());
        assert_eq!(doc["content"]["en"]["styles"]["impartial"]["title"], "New EN");
        assert_eq!(doc["content"]["es"]["styles"]["impartial"]["title"], "Old ES");
        assert_eq!(doc["content"]["en"]["sources"][0], "https://s/1");
    }

    #[tokio::test]
    async fn test_unreadable_document_is_not_overwritten() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(tmp.path());
        store
            .merge_subject("2025-06-01", "sports", &payload(&[("es", "Old ES")]))
            .await
            .unwrap();

        // A run killed mid-write by an older build left half a document behind
        let path = tmp.path().join("news/2025-06-01/subjects/sports.json");
        let full = std::fs::read_to_string(&path).unwrap();
        let cut = &full[..full.len() / 2];
        std::fs::write(&path, cut).unwrap();

        let err = store
            .merge_subject("2025-06-01", "sports", &payload(&[("en", "New EN")]))
            .await
            .unwrap_err();

        assert!(matches!(err, NewsError::Parse(_)));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), cut);
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(tmp.path());
        store
            .merge_subject("2025-06-01", "sports", &payload(&[("en", "EN")]))
            .await
            .unwrap();

        let dir = tmp.path().join("news/2025-06-01/subjects");
        let names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["sports.json"]);
    }

    #[test]
    fn test_parse_existing_rejects_non_objects() {
        assert!(parse_existing(r#"{"category": "Sports"}"#).is_ok());
        assert!(matches!(parse_existing("[1, 2]"), Err(NewsError::Parse(_))));
        assert!(matches!(parse_existing(r#"{"category": "Spo"#), Err(NewsError::Parse(_))));
    }

    #[test]
    fn test_merge_document_replaces_non_object_content() {
        let mut existing = Map::new();
        existing.insert("content".to_string(), Value::String("broken".to_string()));

        let merged = merge_document(existing, &payload(&[("pt", "Título")]), "2025-06-01T00:00:00.000Z").unwrap();

        assert_eq!(merged["content"]["pt"]["styles"]["impartial"]["title"], "Título");
        assert_eq!(merged["updatedAt"], "2025-06-01T00:00:00.000Z");
    }

    #[test]
    fn test_merge_document_keeps_thumb_when_absent() {
        let mut existing = Map::new();
        existing.insert("thumbUrl".to_string(), Value::String("https://old".to_string()));
        let mut update = payload(&[]);
        update.thumb_url = None;

        let merged = merge_document(existing, &update, "t").unwrap();
        assert_eq!(merged["thumbUrl"], "https://old");
    }
}
