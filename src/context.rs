//! Raw news context for one (subject, date).
//!
//! Search failures never propagate from here: an error or an empty result
//! list both yield an empty [`SearchContext`], which tells the content
//! generator to skip the model call.

use crate::models::{SearchContext, Subject};
use crate::search::{SearchHit, SearchProvider, TextQuery};
use std::fmt::Write;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Number of ranked results folded into one context.
pub const MAX_CONTEXT_RESULTS: usize = 7;

#[derive(Debug)]
pub struct SearchContextProvider<S> {
    search: Arc<S>,
    region: String,
}

impl<S: SearchProvider> SearchContextProvider<S> {
    pub fn new(search: Arc<S>, region: impl Into<String>) -> Self {
        Self {
            search,
            region: region.into(),
        }
    }

    #[instrument(level = "info", skip_all, fields(subject = %subject, date = %date))]
    pub async fn fetch(&self, subject: &Subject, date: &str) -> SearchContext {
        let query = TextQuery {
            query: format!("{} news {}", subject.label(), date),
            region: self.region.clone(),
            max_results: MAX_CONTEXT_RESULTS,
        };

        match self.search.text(&query).await {
            Ok(hits) if hits.is_empty() => {
                warn!("Search returned no results");
                SearchContext::default()
            }
            Ok(hits) => {
                let context = build_context(&hits);
                info!(
                    results = context.sources.len(),
                    bytes = context.text.len(),
                    "Built search context"
                );
                context
            }
            Err(e) => {
                error!(error = %e, "Search failed; continuing without context");
                SearchContext::default()
            }
        }
    }
}

/// Fold ranked hits into one context blob plus their URLs, in rank order.
pub fn build_context(hits: &[SearchHit]) -> SearchContext {
    let mut text = String::new();
    let mut sources = Vec::with_capacity(hits.len());

    for (i, hit) in hits.iter().enumerate() {
        writeln!(text, "SOURCE {}: {}", i + 1, hit.title).ok();
        writeln!(text, "SUMMARY: {}", hit.body).ok();
        text.push('\n');
        sources.push(hit.href.clone());
    }

    SearchContext { text, sources }
}
