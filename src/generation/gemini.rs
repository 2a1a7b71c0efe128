//! REST client for the Gemini `generateContent` endpoint.
//!
//! Configuration is via environment variables (see [`crate::config`]):
//! - `GEMINI_API_KEY` - API key; without it every call fails with `NotConfigured`
//! - `GEMINI_MODEL` - model name (default: `gemini-flash-latest`)
//! - `GEMINI_BASE_URL` - API root (default: `https://generativelanguage.googleapis.com/v1beta`)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{GenerationError, GenerationOptions, GenerationService};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct GeminiClient {
    base_url: String,
    model: String,
    api_key: Option<String>,
    http: Client,
}

impl GeminiClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, GenerationError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key,
            http,
        })
    }

    fn endpoint(&self) -> String {
        let model = self.model.trim_start_matches("models/");
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn build_request_body<'a>(
        &self,
        prompt: &'a str,
        options: &GenerationOptions,
    ) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            safety_settings: options
                .safety
                .categories()
                .into_iter()
                .map(|(category, threshold)| SafetySetting {
                    category,
                    threshold: threshold.as_str(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl GenerationService for GeminiClient {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GenerationError::NotConfigured);
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "generate: called");
        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&self.build_request_body(prompt, options))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS || message.contains("RESOURCE_EXHAUSTED") {
                debug!("generate: rate limited (429)");
                return Err(GenerationError::RateLimited(message));
            }
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
        body.into_text()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    safety_settings: Vec<SafetySetting>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Result<String, GenerationError> {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GenerationError::InvalidResponse(format!(
                "prompt blocked: {reason}"
            )));
        }

        let candidate = self
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| GenerationError::InvalidResponse("no candidates".to_string()))?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(GenerationError::InvalidResponse(format!(
                "empty candidate (finish reason: {reason})"
            )));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::SafetySettings;

    fn client() -> GeminiClient {
        GeminiClient::new("http://localhost/v1beta/", "models/gemini-pro", None).unwrap()
    }

    #[test]
    fn endpoint_normalizes_model_and_base() {
        assert_eq!(
            client().endpoint(),
            "http://localhost/v1beta/models/gemini-pro:generateContent"
        );
    }

    #[test]
    fn request_body_carries_safety_thresholds() {
        let options = GenerationOptions {
            safety: SafetySettings {
                hate_speech: crate::generation::SafetyThreshold::Allow,
                ..Default::default()
            },
        };
        let body = serde_json::to_value(client().build_request_body("hi", &options)).unwrap();

        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        let settings = body["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        assert_eq!(settings[0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
        assert_eq!(settings[1]["category"], "HARM_CATEGORY_HATE_SPEECH");
        assert_eq!(settings[1]["threshold"], "BLOCK_NONE");
    }

    #[test]
    fn response_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": "Hello "}, {"text": "world."}]}}]
        }))
        .unwrap();
        assert_eq!(response.into_text().unwrap(), "Hello world.");
    }

    #[test]
    fn blocked_prompt_is_invalid_response() {
        let response: GenerateResponse = serde_json::from_value(serde_json::json!({
            "promptFeedback": {"blockReason": "SAFETY"}
        }))
        .unwrap();
        assert!(matches!(
            response.into_text(),
            Err(GenerationError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn missing_api_key_is_not_configured() {
        let result = client()
            .generate("prompt", &GenerationOptions::default())
            .await;
        assert!(matches!(result, Err(GenerationError::NotConfigured)));
    }
}
