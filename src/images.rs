//! Thumbnail lookup with a deterministic placeholder fallback.

use crate::search::{ImageQuery, SearchProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, instrument, warn};

/// Pause before every image lookup, to stay under the provider's abuse detection.
pub const DEFAULT_LOOKUP_DELAY: Duration = Duration::from_secs(1);

const PLACEHOLDER_BASE: &str = "https://placehold.co/600x400/1e293b/ffffff/png?text=";

#[derive(Debug)]
pub struct ImageLookupProvider<S> {
    search: Arc<S>,
    delay: Duration,
}

impl<S: SearchProvider> ImageLookupProvider<S> {
    pub fn new(search: Arc<S>) -> Self {
        Self {
            search,
            delay: DEFAULT_LOOKUP_DELAY,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Image URL for `query`, or its placeholder when the lookup fails or finds nothing.
    #[instrument(level = "info", skip_all, fields(%query))]
    pub async fn thumbnail_url(&self, query: &str) -> String {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        let request = ImageQuery {
            query: query.to_string(),
            max_results: 1,
        };

        match self.search.images(&request).await {
            Ok(hits) => match hits.into_iter().next() {
                Some(hit) => {
                    info!(url = %hit.image, "Found thumbnail");
                    hit.image
                }
                None => {
                    warn!("No image found; using placeholder");
                    placeholder_url(query)
                }
            },
            Err(e) => {
                warn!(error = %e, "Image search failed; using placeholder");
                placeholder_url(query)
            }
        }
    }
}

/// Placeholder image URL with `text` percent-encoded into it.
pub fn placeholder_url(text: &str) -> String {
    format!("{PLACEHOLDER_BASE}{}", urlencoding::encode(text))
}
