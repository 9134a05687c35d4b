//! Generative-language model interaction.
//!
//! - [`LanguageModel`]: the seam the content generator calls through
//! - [`GeminiClient`]: Google Gemini `generateContent` over REST
//!
//! Calls are made exactly once; pacing is the caller's job (see
//! [`crate::rate_limiter::RateLimiter`]).

use crate::error::{NewsError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Something that turns a prompt into response text.
///
/// Implementors must be shareable across concurrently running generation
/// tasks.
pub trait LanguageModel: Send + Sync {
    /// Send the prompt and return the model's text. One attempt, no retry.
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Serialize, Debug)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize, Debug)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Deserialize, Debug, Default)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default, rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
    error: Option<GeminiError>,
}

#[derive(Deserialize, Debug)]
struct GeminiCandidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GeminiError {
    message: String,
}

/// Client for the Gemini REST API.
///
/// Requests JSON output (`responseMimeType: application/json`) so the reply
/// can be parsed directly; code fences are still tolerated downstream.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different host (proxies, local mocks).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl LanguageModel for GeminiClient {
    #[instrument(level = "info", skip_all, fields(model = %self.model))]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let t0 = Instant::now();
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let res = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        let elapsed_ms = t0.elapsed().as_millis() as u64;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiResponse>(&body)
                .ok()
                .and_then(|r| r.error)
                .map(|e| e.message)
                .unwrap_or(body);
            warn!(elapsed_ms, status = status.as_u16(), "Gemini call failed");
            return Err(NewsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let text = extract_text(serde_json::from_str(&body)?)?;
        info!(elapsed_ms, bytes = text.len(), "Gemini call succeeded");
        Ok(text)
    }
}

/// Concatenate the text parts of the first candidate.
fn extract_text(response: GeminiResponse) -> Result<String> {
    if let Some(error) = response.error {
        return Err(NewsError::Api {
            status: 200,
            message: error.message,
        });
    }
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(NewsError::Api {
            status: 200,
            message: format!("prompt blocked: {reason}"),
        });
    }

    let candidate = response.candidates.into_iter().next().ok_or_else(|| NewsError::Api {
        status: 200,
        message: "no candidates returned".to_string(),
    })?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(NewsError::Api {
            status: 200,
            message: format!(
                "empty candidate (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ),
        });
    }
    Ok(text)
}
