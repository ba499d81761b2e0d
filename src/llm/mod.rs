mod gemini;
mod openrouter;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AssistError, Result};
use crate::prompts::ComposedPrompt;

pub use gemini::GeminiEngine;
pub use openrouter::OpenRouterEngine;

/// Keys of the backends compiled into the binary.
pub const BUILTIN_BACKENDS: [&str; 2] = ["gemini", "openrouter"];

// -- Plugin trait -----------------------------------------------------------

/// Trait that all text-generation backends implement.
#[async_trait::async_trait]
pub trait LlmBackend: Send + Sync {
    /// Human-readable name of this backend (e.g. "Gemini API").
    fn name(&self) -> &str;

    /// Send one prompt and return the provider's raw completion text.
    ///
    /// Implementations issue a single non-streaming request and report any
    /// failure as `GenerationFailed`.
    async fn generate(&self, prompt: &ComposedPrompt) -> Result<String>;
}

// -- Plugin registry --------------------------------------------------------

/// Registry of available backends.  Built-in backends are registered when
/// their credentials are present; additional backends can be added via
/// `register()`.
pub struct LlmPluginRegistry {
    backends: HashMap<String, Arc<dyn LlmBackend>>,
}

impl LlmPluginRegistry {
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    pub fn register(&mut self, key: &str, backend: Arc<dyn LlmBackend>) {
        info!(backend = key, name = backend.name(), "LLM plugin registered");
        self.backends.insert(key.to_string(), backend);
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn LlmBackend>> {
        self.backends.get(key).cloned()
    }

    /// Registered keys, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.backends.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for LlmPluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmBackend for GeminiEngine {
    fn name(&self) -> &str { "Gemini API" }
    async fn generate(&self, prompt: &ComposedPrompt) -> Result<String> {
        self.generate(prompt.as_str()).await
    }
}

#[async_trait::async_trait]
impl LlmBackend for OpenRouterEngine {
    fn name(&self) -> &str { "OpenRouter API" }
    async fn generate(&self, prompt: &ComposedPrompt) -> Result<String> {
        self.generate(prompt.as_str()).await
    }
}

// -- LlmEngine --------------------------------------------------------------

enum Provider {
    Ready(Arc<dyn LlmBackend>),
    NotConfigured(String),
}

/// The generation client handed to the content service.
///
/// Built once at startup.  Whether a provider is usable is decided here:
/// when the selected backend has no credential the engine is created in the
/// not-configured state and every `generate` call fails with
/// `ProviderNotConfigured` without any network traffic.
pub struct LlmEngine {
    provider: Provider,
    active_key: String,
    pub plugins: LlmPluginRegistry,
}

impl LlmEngine {
    /// Build the engine from config.
    ///
    /// The backend is selected by `config.llm.backend` (overridable with the
    /// `LLM_BACKEND` environment variable).  Valid values: `"gemini"`,
    /// `"openrouter"`.  An unknown backend is a configuration error.
    pub fn new(config: &Config) -> Result<Self> {
        let backend = crate::config::env_or("LLM_BACKEND", &config.llm.backend)
            .unwrap_or_else(|| crate::config::DEFAULT_BACKEND.to_string());

        let mut plugins = LlmPluginRegistry::new();
        let mut unavailable: HashMap<&'static str, String> = HashMap::new();

        install("gemini", GeminiEngine::new(config), &mut plugins, &mut unavailable)?;
        install("openrouter", OpenRouterEngine::new(config), &mut plugins, &mut unavailable)?;

        if let Some(active) = plugins.get(&backend) {
            info!(backend = %backend, name = active.name(), "LLM backend selected");
            return Ok(Self {
                provider: Provider::Ready(active),
                active_key: backend,
                plugins,
            });
        }

        match unavailable.remove(backend.as_str()) {
            Some(reason) => {
                warn!(backend = %backend, %reason, "content generation disabled");
                Ok(Self {
                    provider: Provider::NotConfigured(reason),
                    active_key: backend,
                    plugins,
                })
            }
            None => Err(AssistError::Config(format!(
                "unknown LLM backend \"{backend}\" (available: {})",
                BUILTIN_BACKENDS.join(", "),
            ))),
        }
    }

    /// Engine whose active backend is the given one.
    #[cfg(test)]
    pub fn with_backend(key: &str, backend: Arc<dyn LlmBackend>) -> Self {
        let mut plugins = LlmPluginRegistry::new();
        plugins.register(key, backend.clone());
        Self {
            provider: Provider::Ready(backend),
            active_key: key.to_string(),
            plugins,
        }
    }

    /// Engine that refuses every request.
    #[cfg(test)]
    pub fn not_configured(key: &str, reason: impl Into<String>) -> Self {
        Self {
            provider: Provider::NotConfigured(reason.into()),
            active_key: key.to_string(),
            plugins: LlmPluginRegistry::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        matches!(self.provider, Provider::Ready(_))
    }

    /// Send the prompt to the active backend and return its raw text.
    ///
    /// Provider failures are logged here once and surface to the caller as
    /// `GenerationFailed`.
    pub async fn generate(&self, prompt: &ComposedPrompt) -> Result<String> {
        let backend = match &self.provider {
            Provider::Ready(b) => b,
            Provider::NotConfigured(reason) => {
                return Err(AssistError::ProviderNotConfigured(reason.clone()));
            }
        };

        debug!(
            backend = %self.active_key,
            task = %prompt.task,
            prompt_len = prompt.len(),
            "requesting completion"
        );

        match backend.generate(prompt).await {
            Ok(text) => Ok(text),
            Err(AssistError::GenerationFailed(cause)) => {
                warn!(backend = %self.active_key, task = %prompt.task, %cause, "generation failed");
                Err(AssistError::GenerationFailed(cause))
            }
            Err(other) => {
                warn!(backend = %self.active_key, task = %prompt.task, error = %other, "generation failed");
                Err(AssistError::GenerationFailed(other.to_string()))
            }
        }
    }

    /// Human-readable description of the active backend.
    pub fn backend_info(&self) -> &str {
        match &self.provider {
            Provider::Ready(b) => b.name(),
            Provider::NotConfigured(_) => "not configured",
        }
    }

    pub fn active_backend(&self) -> &str {
        &self.active_key
    }

    /// Why generation is disabled, if it is.
    pub fn disabled_reason(&self) -> Option<&str> {
        match &self.provider {
            Provider::Ready(_) => None,
            Provider::NotConfigured(reason) => Some(reason),
        }
    }
}

/// Register a freshly built backend.  A missing credential only marks the
/// backend unavailable; any other construction error is returned.
fn install<B: LlmBackend + 'static>(
    key: &'static str,
    built: Result<B>,
    plugins: &mut LlmPluginRegistry,
    unavailable: &mut HashMap<&'static str, String>,
) -> Result<()> {
    match built {
        Ok(engine) => plugins.register(key, Arc::new(engine)),
        Err(AssistError::ProviderNotConfigured(reason)) => {
            debug!(backend = key, %reason, "backend unavailable");
            unavailable.insert(key, reason);
        }
        Err(e) => return Err(e),
    }
    Ok(())
}

// -- Test support -----------------------------------------------------------
