//! Minimum-interval gate for the model API.
//!
//! One [`RateLimiter`] is built per run and shared (via `Arc`) by every
//! content generation task. The lock covers the whole
//! read-elapsed / sleep / stamp sequence, so concurrent callers are granted
//! slots one at a time and consecutive grants start at least `interval` apart.
//! The lock is released before the caller makes its call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    last_grant: Mutex<Option<Instant>>,
    grants: AtomicU64,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_grant: Mutex::new(None),
            grants: AtomicU64::new(0),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Number of slots granted so far.
    pub fn grants(&self) -> u64 {
        self.grants.load(Ordering::Relaxed)
    }

    /// Wait until a call may start, then record the grant.
    pub async fn acquire(&self) {
        let mut last = self.last_grant.lock().await;

        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                let wait = self.interval - elapsed;
                info!(?wait, "Rate limit: sleeping");
                sleep(wait).await;
            }
        }

        *last = Some(Instant::now());
        let slot = self.grants.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(slot, "Rate limit slot granted");
    }
}
