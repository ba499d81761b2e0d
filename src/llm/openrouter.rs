use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{env_or, Config};
use crate::error::{AssistError, Result};

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "google/gemini-2.0-flash-001";

/// Text generation backed by the OpenRouter API.
///
/// OpenRouter exposes an OpenAI-compatible chat completions endpoint that
/// routes to many hosted models via a single API key.
///
/// Configuration priority (highest → lowest):
///   1. Environment variables (`OPENROUTER_API_KEY`, `OPENROUTER_MODEL`, …)
///   2. `[llm]` section of `config.toml`
///   3. Built-in defaults
pub struct OpenRouterEngine {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
    top_p: f32,
    /// Optional site URL sent as `HTTP-Referer` for OpenRouter analytics.
    site_url: Option<String>,
    /// Optional app name sent as `X-Title` for OpenRouter dashboard.
    app_name: Option<String>,
}

// -- OpenAI-compatible request/response types ---

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorBody>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl OpenRouterEngine {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = env_or("OPENROUTER_API_KEY", &config.llm.openrouter_api_key).ok_or_else(
            || {
                AssistError::ProviderNotConfigured(
                    "OpenRouter API key required: set OPENROUTER_API_KEY env var \
                     or openrouter_api_key in config"
                        .into(),
                )
            },
        )?;

        let base_url = env_or("OPENROUTER_BASE_URL", &config.llm.openrouter_base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let model = env_or("OPENROUTER_MODEL", &config.llm.openrouter_model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let site_url = env_or("OPENROUTER_SITE_URL", &config.llm.openrouter_site_url);
        let app_name = env_or("OPENROUTER_APP_NAME", &config.llm.openrouter_app_name);

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
            app_name = ?app_name,
            "OpenRouter engine initialized"
        );

        Ok(Self {
            client,
            api_key,
            base_url,
            model,
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            top_p: config.llm.top_p,
            site_url,
            app_name,
        })
    }

    /// Send a prompt to OpenRouter and return the raw completion text.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Some(prompt.to_string()),
            }],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            top_p: Some(self.top_p),
        };

        debug!(
            model = %self.model,
            prompt_len = prompt.len(),
            max_tokens = self.max_tokens,
            "invoking OpenRouter API"
        );

        let mut req = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key));

        if let Some(ref site_url) = self.site_url {
            req = req.header("HTTP-Referer", site_url.as_str());
        }
        if let Some(ref app_name) = self.app_name {
            req = req.header("X-Title", app_name.as_str());
        }

        let resp = req.json(&body).send().await.map_err(|e| {
            AssistError::GenerationFailed(format!("OpenRouter request failed: {e}"))
        })?;

        let status = resp.status();

        if !status.is_success() {
            let error_text = resp.text().await.unwrap_or_default();
            let error_msg = match serde_json::from_str::<ErrorResponse>(&error_text) {
                Ok(ErrorResponse { error: Some(e) }) => e.message,
                _ => error_text,
            };

            debug!(status = %status, error = %error_msg, "OpenRouter API error");

            return Err(AssistError::GenerationFailed(format!(
                "OpenRouter API returned {status}: {error_msg}"
            )));
        }

        let chat_resp: ChatResponse = resp.json().await.map_err(|e| {
            AssistError::GenerationFailed(format!("failed to parse OpenRouter response: {e}"))
        })?;

        if let Some(ref usage) = chat_resp.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                total_tokens = usage.total_tokens,
                "OpenRouter usage"
            );
        }

        let response = chat_resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        info!(
            response_len = response.len(),
            model = %self.model,
            "OpenRouter response received"
        );

        if response.trim().is_empty() {
            return Err(AssistError::GenerationFailed(
                "OpenRouter returned empty response".into(),
            ));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use crate::context::{GenerationContext, GenerationRequest};
    use crate::llm::LlmEngine;
    use crate::llm::test_support::{count_warnings, serve_once};
    use crate::prompts;
    use crate::task::TaskKind;

    fn engine_for(base_url: &str) -> OpenRouterEngine {
        let mut config = Config::default();
        config.llm.openrouter_api_key = "or-key".to_string();
        let mut engine = OpenRouterEngine::new(&config).unwrap();
        engine.client = Client::builder().no_proxy().build().unwrap();
        engine.base_url = base_url.to_string();
        engine.api_key = "or-key".to_string();
        engine.model = "test/model".to_string();
        engine.site_url = None;
        engine.app_name = Some("classroom-assist".to_string());
        engine
    }

    #[test]
    fn null_content_yields_nothing() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        let content = parsed.choices.into_iter().next().and_then(|c| c.message.content);
        assert!(content.is_none());
    }

    #[tokio::test]
    async fn generate_sends_bearer_and_returns_content() {
        let (base_url, server) = serve_once(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"Here is a plan: Step 1"}}],"usage":{"prompt_tokens":3,"completion_tokens":5,"total_tokens":8}}"#,
        )
        .await;
        let engine = engine_for(&base_url);

        let text = engine.generate("plan a lesson").await.unwrap();
        assert_eq!(text, "Here is a plan: Step 1");

        let request = server.await.unwrap();
        let lower = request.to_ascii_lowercase();
        assert!(request.starts_with("POST /chat/completions"));
        assert!(lower.contains("authorization: bearer or-key"));
        assert!(lower.contains("x-title: classroom-assist"));
        assert!(request.contains("\"model\":\"test/model\""));
    }

    #[tokio::test]
    async fn api_error_message_is_extracted() {
        let (base_url, server) =
            serve_once(401, r#"{"error":{"message":"No auth credentials found"}}"#).await;
        let engine = engine_for(&base_url);

        match engine.generate("x").await {
            Err(AssistError::GenerationFailed(msg)) => {
                assert!(msg.contains("401"));
                assert!(msg.contains("No auth credentials found"));
            }
            other => panic!("expected GenerationFailed, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn failure_is_logged_once_by_the_engine() {
        let (base_url, server) = serve_once(502, r#"{"error":{"message":"Upstream unavailable"}}"#).await;
        let engine = LlmEngine::with_backend("openrouter", Arc::new(engine_for(&base_url)));
        let prompt = prompts::compose(&GenerationRequest::new(
            TaskKind::TestQuestions,
            GenerationContext::new(),
        ));

        let (_guard, warnings) = count_warnings();
        let err = engine.generate(&prompt).await.unwrap_err();
        assert!(matches!(err, AssistError::GenerationFailed(_)));
        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        server.await.unwrap();
    }
}
