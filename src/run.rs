//! Run controller: one orchestrated task per subject, all awaited together.

use crate::api::LanguageModel;
use crate::config::Settings;
use crate::context::SearchContextProvider;
use crate::generator::ContentGenerator;
use crate::images::ImageLookupProvider;
use crate::orchestrator::{SubjectOrchestrator, SubjectReport};
use crate::models::Subject;
use crate::rate_limiter::RateLimiter;
use crate::search::SearchProvider;
use crate::store::DocumentStore;
use chrono::Local;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

/// Calendar date the run writes under, `YYYY-MM-DD`.
pub fn today() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

/// Totals for one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub date: String,
    /// Reports in configured subject order, for subjects whose task finished.
    pub reports: Vec<SubjectReport>,
    /// Subjects whose task panicked.
    pub crashed: Vec<Subject>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn persisted(&self) -> usize {
        self.reports.iter().filter(|r| r.persisted).count()
    }

    pub fn generated(&self) -> usize {
        self.reports.iter().map(|r| r.generated).sum()
    }
}

pub struct RunController<M, S, D> {
    orchestrator: Arc<SubjectOrchestrator<M, S, D>>,
    limiter: Arc<RateLimiter>,
    subjects: Vec<Subject>,
}

impl<M, S, D> RunController<M, S, D>
where
    M: LanguageModel + 'static,
    S: SearchProvider + 'static,
    D: DocumentStore + 'static,
{
    /// Wire the pipeline around the given collaborators. The rate limiter is
    /// created here, once per run.
    pub fn new(model: Arc<M>, search: Arc<S>, store: Arc<D>, settings: &Settings) -> Self {
        let limiter = Arc::new(RateLimiter::new(settings.request_interval));
        let context = SearchContextProvider::new(Arc::clone(&search), settings.search_region.clone());
        let generator = ContentGenerator::new(model, context, Arc::clone(&limiter));
        let images = ImageLookupProvider::new(search).with_delay(settings.image_lookup_delay);
        let orchestrator = SubjectOrchestrator::new(generator, images, store, settings.languages.clone());

        Self {
            orchestrator: Arc::new(orchestrator),
            limiter,
            subjects: settings.subjects.clone(),
        }
    }

    /// Model calls a full run makes when every subject finds news.
    pub fn expected_calls(&self) -> usize {
        self.subjects.len() * self.orchestrator.languages().len()
    }

    #[instrument(level = "info", skip_all, fields(%date))]
    pub async fn run(&self, date: &str) -> RunSummary {
        let t0 = Instant::now();
        info!("--- Starting news generation for {date} ---");
        info!(interval = ?self.limiter.interval(), "Rate limit active: one model request per interval");
        info!(
            subjects = self.subjects.len(),
            languages = self.orchestrator.languages().len(),
            total_requests = self.expected_calls(),
            "Planned model requests"
        );

        let mut tasks = JoinSet::new();
        for subject in &self.subjects {
            let orchestrator = Arc::clone(&self.orchestrator);
            let subject = subject.clone();
            let date = date.to_string();
            tasks.spawn(async move { orchestrator.process(&subject, &date).await });
        }

        let mut finished = Vec::with_capacity(self.subjects.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => finished.push(report),
                Err(e) => error!(error = %e, "Subject task crashed"),
            }
        }

        // Back to configured order; anything missing crashed
        let mut reports = Vec::with_capacity(finished.len());
        let mut crashed = Vec::new();
        for subject in &self.subjects {
            match finished.iter().position(|r| &r.subject == subject) {
                Some(i) => reports.push(finished.swap_remove(i)),
                None => crashed.push(subject.clone()),
            }
        }

        let summary = RunSummary {
            date: date.to_string(),
            reports,
            crashed,
            elapsed: t0.elapsed(),
        };

        for report in summary.reports.iter().filter(|r| !r.persisted) {
            warn!(
                subject = %report.subject,
                slug = %report.slug,
                generated = report.generated,
                attempted = report.attempted,
                "Subject was not persisted this run"
            );
        }
        info!(
            subjects = self.subjects.len(),
            persisted = summary.persisted(),
            crashed = summary.crashed.len(),
            generated = summary.generated(),
            attempted = self.expected_calls(),
            model_calls = self.limiter.grants(),
            elapsed_secs = summary.elapsed.as_secs(),
            "--- All done ---"
        );
        summary
    }
}
