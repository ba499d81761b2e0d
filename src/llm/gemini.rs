use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{env_or, Config};
use crate::error::{AssistError, Result};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Text generation backed by the Google Gemini `generateContent` REST API.
///
/// Configuration priority (highest → lowest):
///   1. Environment variables (`GEMINI_API_KEY`, `GEMINI_MODEL`, `GEMINI_BASE_URL`)
///   2. `[llm]` section of `config.toml`
///   3. Built-in defaults
pub struct GeminiEngine {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
    top_p: f32,
}

// -- generateContent request/response types ---

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: usize,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        let content = candidate.content?;
        let text: String = content.parts.into_iter().map(|p| p.text).collect();
        Some(text)
    }
}

impl GeminiEngine {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = env_or("GEMINI_API_KEY", &config.llm.gemini_api_key).ok_or_else(|| {
            AssistError::ProviderNotConfigured(
                "Gemini API key required: set GEMINI_API_KEY env var \
                 or gemini_api_key in config"
                    .into(),
            )
        })?;

        let base_url = env_or("GEMINI_BASE_URL", &config.llm.gemini_base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = env_or("GEMINI_MODEL", &config.llm.gemini_model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let timeout_secs = config.llm.timeout_secs;
        let mut builder = Client::builder();
        if timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| AssistError::Config(format!("failed to create HTTP client: {e}")))?;

        info!(
            model = %model,
            base_url = %base_url,
            max_tokens = config.llm.max_tokens,
            temperature = config.llm.temperature,
            timeout_secs,
            "Gemini engine initialized"
        );

        Ok(Self {
            client,
            api_key,
            base_url,
            model,
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            top_p: config.llm.top_p,
        })
    }

    /// Send a prompt to Gemini and return the raw completion text.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let body = GenerateRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                top_p: self.top_p,
                max_output_tokens: self.max_tokens,
            },
        };

        debug!(
            model = %self.model,
            prompt_len = prompt.len(),
            max_tokens = self.max_tokens,
            "invoking Gemini API"
        );

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AssistError::GenerationFailed(format!("Gemini request failed: {e}")))?;

        let status = resp.status();

        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            let error_msg = match serde_json::from_str::<ErrorResponse>(&error_text) {
                Ok(ErrorResponse { error: Some(e) }) => e.message,
                _ => error_text,
            };

            debug!(status = %status, error = %error_msg, "Gemini API error");

            return Err(AssistError::GenerationFailed(format!(
                "Gemini API returned {status}: {error_msg}"
            )));
        }

        let parsed: GenerateResponse = resp.json().await.map_err(|e| {
            AssistError::GenerationFailed(format!("failed to parse Gemini response: {e}"))
        })?;

        if let Some(ref usage) = parsed.usage_metadata {
            debug!(
                prompt_tokens = usage.prompt_token_count,
                completion_tokens = usage.candidates_token_count,
                total_tokens = usage.total_token_count,
                "Gemini usage"
            );
        }
        if let Some(reason) = parsed.candidates.first().and_then(|c| c.finish_reason.as_deref()) {
            debug!(finish_reason = reason, "Gemini finish reason");
        }

        let response = parsed.into_text().unwrap_or_default();

        info!(
            response_len = response.len(),
            model = %self.model,
            "Gemini response received"
        );

        if response.trim().is_empty() {
            return Err(AssistError::GenerationFailed(
                "Gemini returned empty response".into(),
            ));
        }

        Ok(response)
    }
}
