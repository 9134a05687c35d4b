//! Data models for subjects, search context and generated summaries.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Subject`] and [`LanguageSpec`]: the fixed run matrix
//! - [`SearchContext`]: raw search results handed to the model
//! - [`GeneratedContent`]: one validated model summary plus its sources
//! - [`Generation`]: the explicit outcome of one (subject, language) cell
//! - [`SubjectPayload`]: the merged per-subject document written to the store
//!
//! Serialized field names use camelCase to match the persisted document
//! layout read by the frontend.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A news category processed once per run.
///
/// The label is shown to readers and used in search queries; the [`slug`]
/// is the document id in the store.
///
/// [`slug`]: Subject::slug
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn label(&self) -> &str {
        &self.0
    }

    /// Document id derived from the label.
    ///
    /// ```ignore
    /// assert_eq!(Subject::new("Economy & Business").slug(), "economy-business");
    /// ```
    pub fn slug(&self) -> String {
        crate::utils::subject_slug(&self.0)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A target language: display name for the prompt, short code for the payload key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageSpec {
    /// Name used in the prompt, e.g. `"English"`.
    pub name: String,
    /// Key in the persisted `content` map, e.g. `"en"`.
    pub code: String,
}

impl LanguageSpec {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

/// Raw news gathered for one (subject, date).
///
/// `text` holds one `SOURCE i` / `SUMMARY` entry per result in provider rank
/// order; `sources` holds the result URLs in the same order. An empty text
/// means no news was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchContext {
    pub text: String,
    pub sources: Vec<String>,
}

impl SearchContext {
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Editorial tone the model writes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    Impartial,
    Informal,
    Analytic,
    Funny,
}

impl Style {
    pub const ALL: [Style; 4] = [Style::Impartial, Style::Informal, Style::Analytic, Style::Funny];

    pub fn as_str(self) -> &'static str {
        match self {
            Style::Impartial => "impartial",
            Style::Informal => "informal",
            Style::Analytic => "analytic",
            Style::Funny => "funny",
        }
    }
}

/// Reading-time bucket of one summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationTier {
    Fast,
    Standard,
    Deep,
}

impl DurationTier {
    pub const ALL: [DurationTier; 3] = [DurationTier::Fast, DurationTier::Standard, DurationTier::Deep];

    pub fn as_str(self) -> &'static str {
        match self {
            DurationTier::Fast => "fast",
            DurationTier::Standard => "standard",
            DurationTier::Deep => "deep",
        }
    }
}

/// Summary text for every duration tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Durations {
    pub fast: String,
    pub standard: String,
    pub deep: String,
}

impl Durations {
    pub fn get(&self, tier: DurationTier) -> &str {
        match tier {
            DurationTier::Fast => &self.fast,
            DurationTier::Standard => &self.standard,
            DurationTier::Deep => &self.deep,
        }
    }
}

/// One style's headline and its summaries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSummary {
    /// Style-specific headline. May be empty.
    pub title: String,
    pub durations: Durations,
}

/// Every style the model must return.
///
/// Deserialization fails when a style or a duration tier is missing, which
/// keeps partially structured model output out of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Styles {
    pub impartial: StyleSummary,
    pub informal: StyleSummary,
    pub analytic: StyleSummary,
    pub funny: StyleSummary,
}

impl Styles {
    pub fn get(&self, style: Style) -> &StyleSummary {
        match style {
            Style::Impartial => &self.impartial,
            Style::Informal => &self.informal,
            Style::Analytic => &self.analytic,
            Style::Funny => &self.funny,
        }
    }
}

/// The JSON object the model is asked to return.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelSummary {
    pub styles: Styles,
}

/// A validated model summary for one (subject, language), with its sources attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedContent {
    pub styles: Styles,
    /// Source URLs from the search context, in rank order.
    pub sources: Vec<String>,
}

impl GeneratedContent {
    /// The impartial headline, if the model gave a non-blank one.
    pub fn headline(&self) -> Option<&str> {
        let title = self.styles.impartial.title.trim();
        (!title.is_empty()).then_some(title)
    }
}

/// Why a (subject, language) cell produced nothing this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsenceReason {
    /// The search step returned no news; the model was never called.
    NoContext,
    /// The model call itself failed.
    ModelFailed,
    /// The model answered with text that is not a complete summary.
    Malformed,
}

impl fmt::Display for AbsenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AbsenceReason::NoContext => "no_context",
            AbsenceReason::ModelFailed => "model_failed",
            AbsenceReason::Malformed => "malformed",
        })
    }
}

/// Outcome of one content generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Generation {
    Generated(GeneratedContent),
    Absent(AbsenceReason),
}

impl Generation {
    pub fn content(&self) -> Option<&GeneratedContent> {
        match self {
            Generation::Generated(content) => Some(content),
            Generation::Absent(_) => None,
        }
    }

    pub fn into_content(self) -> Option<GeneratedContent> {
        match self {
            Generation::Generated(content) => Some(content),
            Generation::Absent(_) => None,
        }
    }
}

/// The per-subject document merged into the store.
///
/// The `updatedAt` field is not carried here: stores stamp it at write time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPayload {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    /// Generated content keyed by language code. Failed languages are absent.
    pub content: BTreeMap<String, GeneratedContent>,
}

impl SubjectPayload {
    pub fn new(subject: &Subject, thumb_url: Option<String>) -> Self {
        Self {
            category: subject.label().to_string(),
            thumb_url,
            content: BTreeMap::new(),
        }
    }
}
