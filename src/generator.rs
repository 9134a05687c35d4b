//! Per-(subject, language) content generation.
//!
//! Each call runs the full cell pipeline:
//!
//! 1. **Context**: search for the subject's news of the day; no news means no model call
//! 2. **Prompt**: instruct the model to summarise only the raw data, in the target language,
//!    as JSON matching the style × duration schema
//! 3. **Gate**: wait for a [`RateLimiter`] slot
//! 4. **Call**: one model request, no retry
//! 5. **Parse**: strip code fences, validate the full schema, attach the sources
//!
//! Every failure ends in [`Generation::Absent`]; nothing propagates to
//! sibling languages or subjects.

use crate::api::LanguageModel;
use crate::context::SearchContextProvider;
use crate::error::NewsError;
use crate::models::{
    AbsenceReason, DurationTier, GeneratedContent, Generation, LanguageSpec, ModelSummary,
    SearchContext, Style, Subject,
};
use crate::rate_limiter::RateLimiter;
use crate::search::SearchProvider;
use crate::utils::{looks_truncated, strip_code_fences, truncate_for_log};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub struct ContentGenerator<M, S> {
    model: Arc<M>,
    context: SearchContextProvider<S>,
    limiter: Arc<RateLimiter>,
}

impl<M: LanguageModel, S: SearchProvider> ContentGenerator<M, S> {
    pub fn new(model: Arc<M>, context: SearchContextProvider<S>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            model,
            context,
            limiter,
        }
    }

    #[instrument(level = "info", skip_all, fields(subject = %subject, language = %language.code))]
    pub async fn generate(&self, subject: &Subject, language: &LanguageSpec, date: &str) -> Generation {
        let context = self.context.fetch(subject, date).await;
        if context.is_empty() {
            warn!("No news found; skipping model call");
            return Generation::Absent(AbsenceReason::NoContext);
        }

        let prompt = build_prompt(subject, &language.name, date, &context.text);

        self.limiter.acquire().await;
        let response = match self.model.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Model call failed");
                return Generation::Absent(AbsenceReason::ModelFailed);
            }
        };

        match parse_response(&response, &context) {
            Ok(content) => {
                info!(sources = content.sources.len(), "Generated content");
                Generation::Generated(content)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    response_preview = %truncate_for_log(&response, 300),
                    "Model returned non-conforming JSON; discarding"
                );
                Generation::Absent(AbsenceReason::Malformed)
            }
        }
    }
}

/// Parse and validate a model answer, attaching the context's sources.
pub fn parse_response(response: &str, context: &SearchContext) -> Result<GeneratedContent, NewsError> {
    let body = strip_code_fences(response);
    let summary: ModelSummary = serde_json::from_str(body).map_err(|e| {
        if looks_truncated(&e) {
            NewsError::Parse(format!("response truncated: {e}"))
        } else {
            NewsError::Parse(e.to_string())
        }
    })?;

    for style in Style::ALL {
        let durations = &summary.styles.get(style).durations;
        for tier in DurationTier::ALL {
            if durations.get(tier).trim().is_empty() {
                return Err(NewsError::Parse(format!(
                    "empty {} summary for style {}",
                    tier.as_str(),
                    style.as_str()
                )));
            }
        }
    }

    Ok(GeneratedContent {
        styles: summary.styles,
        sources: context.sources.clone(),
    })
}

/// Instructions for one (subject, language) summary over the day's raw search data.
pub fn build_prompt(subject: &Subject, language: &str, date: &str, context_text: &str) -> String {
    format!(
        r#"You are a news aggregator.
Below is the raw news data collected on {date} about '{subject}'.

=== RAW DATA START ===
{context_text}
=== RAW DATA END ===

RULES:
1. Summarize the specific events in the raw data above and nothing else.
2. No generic filler. Phrases such as "Markets are digesting..." or "The political landscape is shifting..." are not allowed. Every sentence must carry a concrete fact from the raw data.
3. Never open with "Today," or "On {date},". Begin with the event itself.
4. Write every headline and summary in {language}.
5. Reply with a single JSON object and nothing else.

The JSON object must have exactly this shape:
{{
  "styles": {{
    "impartial": {{ "title": "Neutral headline", "durations": {{ "fast": "at most 50 words", "standard": "about 100 words", "deep": "about 250 words" }} }},
    "informal": {{ "title": "Casual headline", "durations": {{ "fast": "...", "standard": "...", "deep": "..." }} }},
    "analytic": {{ "title": "Data-driven headline", "durations": {{ "fast": "...", "standard": "...", "deep": "..." }} }},
    "funny": {{ "title": "Witty headline", "durations": {{ "fast": "...", "standard": "...", "deep": "..." }} }}
  }}
}}
"#,
        subject = subject.label(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeModel, FakeSearch, hit, sample_response};
    use std::time::Duration;

    fn generator(model: FakeModel, search: FakeSearch) -> (ContentGenerator<FakeModel, FakeSearch>, Arc<FakeModel>, Arc<RateLimiter>) {
        let model = Arc::new(model);
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(1)));
        let context = SearchContextProvider::new(Arc::new(search), "wt-wt");
        let generator = ContentGenerator::new(Arc::clone(&model), context, Arc::clone(&limiter));
        (generator, model, limiter)
    }

    fn english() -> LanguageSpec {
        LanguageSpec::new("English", "en")
    }

    #[tokio::test]
    async fn test_empty_context_skips_model_and_limiter() {
        let (generator, model, limiter) = generator(
            FakeModel::replying(sample_response("T")),
            FakeSearch::with_hits(vec![]),
        );

        let result = generator.generate(&Subject::new("Sports"), &english(), "2025-06-01").await;

        assert_eq!(result, Generation::Absent(AbsenceReason::NoContext));
        assert_eq!(model.calls(), 0);
        assert_eq!(limiter.grants(), 0);
    }

    #[tokio::test]
    async fn test_search_failure_skips_model() {
        let (generator, model, _) =
            generator(FakeModel::replying(sample_response("T")), FakeSearch::failing());

        let result = generator.generate(&Subject::new("Sports"), &english(), "2025-06-01").await;

        assert_eq!(result, Generation::Absent(AbsenceReason::NoContext));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_success_attaches_sources_in_order() {
        let hits = vec![
            hit("A", "body a", "https://a.example/1"),
            hit("B", "body b", "https://b.example/2"),
        ];
        let (generator, model, limiter) =
            generator(FakeModel::replying(sample_response("Rates cut")), FakeSearch::with_hits(hits));

        let result = generator.generate(&Subject::new("Economy & Business"), &english(), "2025-06-01").await;

        let content = result.into_content().expect("content generated");
        assert_eq!(content.sources, vec!["https://a.example/1", "https://b.example/2"]);
        assert_eq!(content.headline(), Some("Rates cut"));
        assert_eq!(model.calls(), 1);
        assert_eq!(limiter.grants(), 1);

        let prompt = &model.prompts()[0];
        assert!(prompt.contains("SOURCE 1: A"));
        assert!(prompt.contains("Write every headline and summary in English."));
        assert!(prompt.contains("'Economy & Business'"));
    }

    #[tokio::test]
    async fn test_fenced_response_is_accepted() {
        let fenced = format!("```json\n{}\n```", sample_response("Fenced"));
        let (generator, _, _) = generator(
            FakeModel::replying(fenced),
            FakeSearch::with_hits(vec![hit("A", "b", "https://a.example")]),
        );

        let result = generator.generate(&Subject::new("Sports"), &english(), "2025-06-01").await;
        assert_eq!(result.content().and_then(|c| c.headline()), Some("Fenced"));
    }

    #[tokio::test]
    async fn test_model_error_is_absent() {
        let (generator, _, limiter) = generator(
            FakeModel::new(|_| Err(NewsError::Api { status: 429, message: "quota".to_string() })),
            FakeSearch::with_hits(vec![hit("A", "b", "https://a.example")]),
        );

        let result = generator.generate(&Subject::new("Sports"), &english(), "2025-06-01").await;

        assert_eq!(result, Generation::Absent(AbsenceReason::ModelFailed));
        assert_eq!(limiter.grants(), 1);
    }

    #[tokio::test]
    async fn test_malformed_response_is_absent() {
        let (generator, _, _) = generator(
            FakeModel::replying(r#"{"styles": {"impartial": {"title": "x"}}}"#),
            FakeSearch::with_hits(vec![hit("A", "b", "https://a.example")]),
        );

        let result = generator.generate(&Subject::new("Sports"), &english(), "2025-06-01").await;
        assert_eq!(result, Generation::Absent(AbsenceReason::Malformed));
    }

    #[test]
    fn test_parse_response_rejects_blank_tier() {
        let mut value: serde_json::Value = serde_json::from_str(&sample_response("T")).unwrap();
        value["styles"]["analytic"]["durations"]["deep"] = serde_json::json!("  ");

        let err = parse_response(&value.to_string(), &SearchContext::default()).unwrap_err();
        assert!(err.to_string().contains("deep"));
        assert!(err.to_string().contains("analytic"));
    }

    #[test]
    fn test_parse_response_ignores_unknown_keys() {
        let mut value: serde_json::Value = serde_json::from_str(&sample_response("T")).unwrap();
        value["extra"] = serde_json::json!(true);
        value["styles"]["sarcastic"] = serde_json::json!({ "title": "?" });

        assert!(parse_response(&value.to_string(), &SearchContext::default()).is_ok());
    }

    #[test]
    fn test_parse_response_reports_truncation() {
        let response = sample_response("T");
        let cut = &response[..response.len() / 2];
        let err = parse_response(cut, &SearchContext::default()).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    #[test]
    fn test_prompt_bans_date_openings() {
        let prompt = build_prompt(&Subject::new("Politics"), "Spanish", "2025-06-01", "SOURCE 1: x");
        assert!(prompt.contains(r#"Never open with "Today," or "On 2025-06-01,""#));
        assert!(prompt.contains("in Spanish"));
        assert!(prompt.contains("SOURCE 1: x"));
    }
}
