use std::sync::Arc;

use tracing::{debug, info};

use crate::context::{GenerationContext, GenerationRequest};
use crate::error::Result;
use crate::llm::LlmEngine;
use crate::prompts::{self, ComposedPrompt};
use crate::sanitize::sanitize;
use crate::task::{Language, TaskKind};

/// Entry point for content generation: compose → generate → sanitize.
///
/// Holds no per-call state, so one instance can serve concurrent callers.
pub struct ContentService {
    engine: Arc<LlmEngine>,
    default_language: Language,
}

impl ContentService {
    pub fn new(engine: Arc<LlmEngine>, default_language: Language) -> Self {
        Self {
            engine,
            default_language,
        }
    }

    pub fn engine(&self) -> &LlmEngine {
        &self.engine
    }

    pub fn default_language(&self) -> Language {
        self.default_language
    }

    /// Generate sanitized content for a wire task key such as
    /// `test-questions`.
    ///
    /// Unknown keys fail with `UnknownTaskKind` before any network call;
    /// `ProviderNotConfigured` and `GenerationFailed` come back unchanged.
    pub async fn generate(&self, task_kind: &str, context: GenerationContext) -> Result<String> {
        let task: TaskKind = task_kind.parse()?;
        self.generate_task(task, context).await
    }

    pub async fn generate_task(&self, task: TaskKind, context: GenerationContext) -> Result<String> {
        let prompt = self.compose(task, context);
        let raw = self.engine.generate(&prompt).await?;
        let content = sanitize(&raw);

        info!(
            task = %task,
            language = %prompt.language,
            backend = self.engine.active_backend(),
            raw_len = raw.len(),
            content_len = content.len(),
            "content generated"
        );

        Ok(content)
    }

    /// The prompt `generate` would send, without calling the provider.
    pub fn preview(&self, task_kind: &str, mut context: GenerationContext) -> Result<ComposedPrompt> {
        self.prepare(task_kind, &mut context);
        prompts::compose_for(task_kind, &context)
    }

    fn compose(&self, task: TaskKind, mut context: GenerationContext) -> ComposedPrompt {
        self.prepare(task.key(), &mut context);
        prompts::compose(&GenerationRequest::new(task, context))
    }

    fn prepare(&self, task_kind: &str, context: &mut GenerationContext) {
        if context.is_empty() {
            debug!(task = task_kind, "no context fields supplied, template fields will be blank");
        }
        context.inject_language(self.default_language);
    }
}
