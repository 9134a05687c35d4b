//! Web-search collaborator.
//!
//! The pipeline needs two things from a search provider:
//!
//! 1. **Text search**: ranked `{title, body, href}` records used as raw model context
//! 2. **Image search**: a representative image URL for a headline
//!
//! [`SearchProvider`] is the seam; [`duckduckgo::DuckDuckGo`] is the
//! production implementation.

pub mod duckduckgo;

use crate::error::Result;
use serde::Deserialize;
use std::future::Future;

/// One ranked text-search result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub body: String,
    pub href: String,
}

/// One image-search result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ImageHit {
    pub image: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    pub query: String,
    /// Provider region code, `wt-wt` for worldwide.
    pub region: String,
    pub max_results: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageQuery {
    pub query: String,
    pub max_results: usize,
}

/// A search backend shared by the context and image providers.
///
/// Every call is made with the provider's strictest safe-search filter.
pub trait SearchProvider: Send + Sync {
    /// Ranked text results, at most `max_results`.
    fn text(&self, query: &TextQuery) -> impl Future<Output = Result<Vec<SearchHit>>> + Send;

    /// Image results, at most `max_results`.
    fn images(&self, query: &ImageQuery) -> impl Future<Output = Result<Vec<ImageHit>>> + Send;
}
