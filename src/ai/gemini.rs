use core::fmt;
use std::time::Duration;

use leaky_bucket::RateLimiter;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{AiError, AiResult, TextModel};
use crate::constants::{DEFAULT_GEMINI_TIMEOUT_SECS, GEMINI_BURST, GEMINI_REFILL_INTERVAL_SECS};
use crate::util::env::Var;
use crate::var;

/// REST client for the `generateContent` endpoint.
///
/// Calls are throttled through a local leaky bucket before they leave the
/// process; free-tier quota is low enough that a burst of dashboard
/// refreshes would otherwise trip the upstream limiter immediately.
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: &'static str,
    model: &'static str,
    api_key: &'static str,
    timeout_secs: u64,
    limiter: RateLimiter,
}

impl GeminiClient {
    pub async fn new() -> AiResult<Self> {
        let api_key = var!(Var::GeminiApiKey).await?;
        let model = var!(Var::GeminiModel).await?;
        let base_url = var!(Var::GeminiApiBase).await?;
        let timeout_secs = var!(Var::GeminiTimeoutSecs)
            .await?
            .parse::<u64>()
            .unwrap_or(DEFAULT_GEMINI_TIMEOUT_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let limiter = RateLimiter::builder()
            .max(GEMINI_BURST)
            .initial(GEMINI_BURST)
            .refill(1)
            .interval(Duration::from_secs(GEMINI_REFILL_INTERVAL_SECS))
            .build();

        Ok(Self {
            http,
            base_url,
            model,
            api_key,
            timeout_secs,
            limiter,
        })
    }
}

#[async_trait::async_trait]
impl TextModel for GeminiClient {
    #[instrument(skip(self, prompt), fields(model = self.model, prompt_len = prompt.len()))]
    async fn complete(&self, prompt: &str) -> AiResult<String> {
        self.limiter.acquire_one().await;

        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let res = match self
            .http
            .post(&url)
            .json(&GenerateRequest::from_prompt(prompt))
            .send()
            .await
        {
            Ok(res) => res,
            Err(e) if e.is_timeout() => return Err(AiError::Timeout(self.timeout_secs)),
            Err(e) => return Err(e.into()),
        };

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            tracing::error!(code = %status, body, "completion request failed");

            return Err(classify_status(status, self.model, body));
        }

        let reply = res.json::<GenerateResponse>().await?;
        let text = reply.first_text();

        if text.trim().is_empty() {
            tracing::warn!("200/OK completion response with empty candidate text");
            return Err(AiError::EmptyReply);
        }

        Ok(text)
    }
}

/// Maps upstream failure statuses onto the typed error categories. 429
/// and 404 keep their distinct user-facing messages downstream.
fn classify_status(status: http::StatusCode, model: &str, body: String) -> AiError {
    match status {
        http::StatusCode::TOO_MANY_REQUESTS => AiError::RateLimited,
        http::StatusCode::NOT_FOUND => AiError::ModelNotFound(model.to_owned()),
        _ => AiError::FetchErr { status, body },
    }
}

impl fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

impl GenerateRequest {
    fn from_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_owned(),
                }],
            }],
        }
    }
}

// Replies carry plenty of sibling fields (safety ratings, usage counts);
// only the first candidate's text matters here, so everything else is
// defaulted away.
#[derive(Debug, Default, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Longer replies arrive split across several parts of one candidate;
    /// the payload is their concatenation.
    fn first_text(&self) -> String {
        self.candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn request_body_matches_wire_shape() {
        let req = GenerateRequest::from_prompt("how do offsets work?");
        let json = serde_json::to_value(&req).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "how do offsets work?");
    }

    #[test]
    fn response_text_is_read_from_first_candidate() {
        let raw = r#"{
            "candidates": [
                {
                    "content": { "parts": [{ "text": "Plant a tree." }], "role": "model" },
                    "finishReason": "STOP"
                }
            ],
            "modelVersion": "gemini-2.5-flash"
        }"#;

        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.first_text(), "Plant a tree.");
    }

    #[test]
    fn multi_part_candidate_text_is_joined() {
        let raw = r#"{
            "candidates": [
                {
                    "content": {
                        "parts": [
                            { "text": "```json\n[{\"action\": \"Bike\"," },
                            { "text": " \"credits\": 10}]\n```" }
                        ],
                        "role": "model"
                    }
                }
            ]
        }"#;

        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.first_text(),
            "```json\n[{\"action\": \"Bike\", \"credits\": 10}]\n```"
        );
    }

    #[test]
    fn failure_statuses_map_to_typed_errors() {
        assert!(matches!(
            classify_status(http::StatusCode::TOO_MANY_REQUESTS, "gemini-2.5-flash", String::new()),
            AiError::RateLimited
        ));

        assert!(matches!(
            classify_status(http::StatusCode::NOT_FOUND, "gemini-2.5-flash", String::new()),
            AiError::ModelNotFound(model) if model == "gemini-2.5-flash"
        ));

        assert!(matches!(
            classify_status(http::StatusCode::SERVICE_UNAVAILABLE, "gemini-2.5-flash", "overloaded".into()),
            AiError::FetchErr { status, .. } if status == http::StatusCode::SERVICE_UNAVAILABLE
        ));
    }

    #[test]
    fn candidate_free_response_yields_empty_text() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.first_text(), "");

        let parsed: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {}}]}"#).unwrap();
        assert_eq!(parsed.first_text(), "");
    }
}
