//! Per-subject orchestration: fan out languages, pick a thumbnail, merge, persist.

use crate::api::LanguageModel;
use crate::generator::ContentGenerator;
use crate::images::ImageLookupProvider;
use crate::models::{Generation, LanguageSpec, Subject, SubjectPayload};
use crate::search::SearchProvider;
use crate::store::DocumentStore;
use futures::future::join_all;
use itertools::Itertools;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// What happened to one subject this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectReport {
    pub subject: Subject,
    pub slug: String,
    /// Languages that produced content.
    pub generated: usize,
    /// Languages attempted.
    pub attempted: usize,
    pub persisted: bool,
}

pub struct SubjectOrchestrator<M, S, D> {
    generator: ContentGenerator<M, S>,
    images: ImageLookupProvider<S>,
    store: Arc<D>,
    languages: Vec<LanguageSpec>,
}

impl<M, S, D> SubjectOrchestrator<M, S, D>
where
    M: LanguageModel,
    S: SearchProvider,
    D: DocumentStore,
{
    pub fn new(
        generator: ContentGenerator<M, S>,
        images: ImageLookupProvider<S>,
        store: Arc<D>,
        languages: Vec<LanguageSpec>,
    ) -> Self {
        Self {
            generator,
            images,
            store,
            languages,
        }
    }

    pub fn languages(&self) -> &[LanguageSpec] {
        &self.languages
    }

    #[instrument(level = "info", skip_all, fields(subject = %subject, %date))]
    pub async fn process(&self, subject: &Subject, date: &str) -> SubjectReport {
        info!(languages = self.languages.len(), "Starting subject");

        // Every language runs to completion on its own; no early exit
        let results: Vec<Generation> = join_all(
            self.languages
                .iter()
                .map(|language| self.generator.generate(subject, language, date)),
        )
        .await;

        for (language, result) in self.languages.iter().zip(&results) {
            if let Generation::Absent(reason) = result {
                info!(language = %language.code, %reason, "Language produced no content");
            }
        }

        let query = image_query(subject, &results);
        info!(%query, "Searching thumbnail");
        let thumb_url = self.images.thumbnail_url(&query).await;

        let payload = build_payload(subject, thumb_url, &self.languages, results);
        let generated = payload.content.len();
        info!(
            generated,
            attempted = self.languages.len(),
            languages = %payload.content.keys().join(","),
            "Merged subject payload"
        );

        let slug = subject.slug();
        let persisted = match self.store.merge_subject(date, &slug, &payload).await {
            Ok(()) => {
                info!(%slug, "Saved subject");
                true
            }
            Err(e) => {
                error!(%slug, error = %e, "Failed to save subject");
                false
            }
        };

        SubjectReport {
            subject: subject.clone(),
            slug,
            generated,
            attempted: self.languages.len(),
            persisted,
        }
    }
}

/// First non-empty impartial headline in language order, else the subject label.
pub fn image_query(subject: &Subject, results: &[Generation]) -> String {
    results
        .iter()
        .filter_map(Generation::content)
        .find_map(|content| content.headline())
        .unwrap_or(subject.label())
        .to_string()
}

/// Key successful generations by language code; absent ones are left out.
pub fn build_payload(
    subject: &Subject,
    thumb_url: String,
    languages: &[LanguageSpec],
    results: Vec<Generation>,
) -> SubjectPayload {
    let mut payload = SubjectPayload::new(subject, Some(thumb_url));
    for (language, result) in languages.iter().zip(results) {
        if let Some(content) = result.into_content() {
            payload.content.insert(language.code.clone(), content);
        }
    }
    payload
}
