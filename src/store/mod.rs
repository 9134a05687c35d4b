//! Document-store backends for subject payloads.
//!
//! # Layout
//!
//! ```text
//! news/
//! └── 2025-05-06/
//!     └── subjects/
//!         ├── politics
//!         ├── economy-business
//!         └── ...
//! ```
//!
//! Each document holds `{category, thumbUrl, updatedAt, content: {<lang>: ...}}`.
//!
//! # Merge semantics
//!
//! A write replaces `category`, `thumbUrl` and only the `content.<lang>`
//! entries present in the payload; languages stored by an earlier run and
//! missing from this one are preserved. `updatedAt` is stamped by the store.
//!
//! # Backends
//!
//! - [`firestore`]: Google Cloud Firestore over REST (production)
//! - [`json`]: JSON files on local disk

pub mod firestore;
pub mod json;

use crate::error::Result;
use crate::models::SubjectPayload;
use std::future::Future;

/// Document path of a subject for a run date.
pub fn document_path(date: &str, slug: &str) -> String {
    format!("news/{date}/subjects/{slug}")
}

/// Merge-write target for subject payloads.
pub trait DocumentStore: Send + Sync {
    fn merge_subject(
        &self,
        date: &str,
        slug: &str,
        payload: &SubjectPayload,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// The backend selected at startup.
#[derive(Debug)]
pub enum Store {
    Firestore(firestore::FirestoreStore),
    Json(json::JsonFileStore),
}

impl DocumentStore for Store {
    async fn merge_subject(&self, date: &str, slug: &str, payload: &SubjectPayload) -> Result<()> {
        match self {
            Store::Firestore(store) => store.merge_subject(date, slug, payload).await,
            Store::Json(store) => store.merge_subject(date, slug, payload).await,
        }
    }
}
