//! In-crate fakes for the collaborator traits, shared by unit tests.

use crate::api::LanguageModel;
use crate::error::{NewsError, Result};
use crate::models::{Durations, GeneratedContent, Style, StyleSummary, Styles, SubjectPayload};
use crate::search::{ImageHit, ImageQuery, SearchHit, SearchProvider, TextQuery};
use crate::store::DocumentStore;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn hit(title: &str, body: &str, href: &str) -> SearchHit {
    SearchHit {
        title: title.to_string(),
        body: body.to_string(),
        href: href.to_string(),
    }
}

fn style_summary(style: Style, title: &str) -> StyleSummary {
    let name = style.as_str();
    StyleSummary {
        title: title.to_string(),
        durations: Durations {
            fast: format!("{name} fast"),
            standard: format!("{name} standard"),
            deep: format!("{name} deep"),
        },
    }
}

pub fn sample_styles(impartial_title: &str) -> Styles {
    Styles {
        impartial: style_summary(Style::Impartial, impartial_title),
        informal: style_summary(Style::Informal, "Informal"),
        analytic: style_summary(Style::Analytic, "Analytic"),
        funny: style_summary(Style::Funny, "Funny"),
    }
}

pub fn sample_content(impartial_title: &str, sources: &[&str]) -> GeneratedContent {
    GeneratedContent {
        styles: sample_styles(impartial_title),
        sources: sources.iter().map(|s| s.to_string()).collect(),
    }
}

/// A complete model answer, as the model would return it.
pub fn sample_response(impartial_title: &str) -> String {
    serde_json::json!({ "styles": sample_styles(impartial_title) }).to_string()
}

#[derive(Debug, Default)]
pub struct FakeSearch {
    hits: Option<Vec<SearchHit>>,
    images: Option<Vec<String>>,
    text_queries: Mutex<Vec<TextQuery>>,
    image_queries: Mutex<Vec<ImageQuery>>,
}

impl FakeSearch {
    pub fn new(hits: Vec<SearchHit>, images: Vec<&str>) -> Self {
        Self {
            hits: Some(hits),
            images: Some(images.into_iter().map(String::from).collect()),
            ..Default::default()
        }
    }

    pub fn with_hits(hits: Vec<SearchHit>) -> Self {
        Self::new(hits, vec![])
    }

    pub fn with_images(images: Vec<&str>) -> Self {
        Self::new(vec![], images)
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn text_queries(&self) -> Vec<TextQuery> {
        self.text_queries.lock().unwrap().clone()
    }

    pub fn image_queries(&self) -> Vec<ImageQuery> {
        self.image_queries.lock().unwrap().clone()
    }
}

impl SearchProvider for FakeSearch {
    async fn text(&self, query: &TextQuery) -> Result<Vec<SearchHit>> {
        self.text_queries.lock().unwrap().push(query.clone());
        self.hits
            .clone()
            .ok_or_else(|| NewsError::Network("search unavailable".to_string()))
    }

    async fn images(&self, query: &ImageQuery) -> Result<Vec<ImageHit>> {
        self.image_queries.lock().unwrap().push(query.clone());
        self.images
            .as_ref()
            .map(|urls| urls.iter().map(|u| ImageHit { image: u.clone() }).collect())
            .ok_or_else(|| NewsError::Network("image search unavailable".to_string()))
    }
}

type Responder = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;

/// A model whose answer is computed from the prompt.
pub struct FakeModel {
    respond: Responder,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeModel {
    pub fn new(respond: impl Fn(&str) -> Result<String> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answers with `text`.
    pub fn replying(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl LanguageModel for FakeModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.respond)(prompt)
    }
}

#[derive(Debug, Clone)]
pub struct StoredWrite {
    pub date: String,
    pub slug: String,
    pub payload: SubjectPayload,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    writes: Mutex<Vec<StoredWrite>>,
    fail: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn writes(&self) -> Vec<StoredWrite> {
        self.writes.lock().unwrap().clone()
    }
}

impl DocumentStore for MemoryStore {
    async fn merge_subject(&self, date: &str, slug: &str, payload: &SubjectPayload) -> Result<()> {
        if self.fail {
            return Err(NewsError::Api {
                status: 503,
                message: "store unavailable".to_string(),
            });
        }
        self.writes.lock().unwrap().push(StoredWrite {
            date: date.to_string(),
            slug: slug.to_string(),
            payload: payload.clone(),
        });
        Ok(())
    }
}
