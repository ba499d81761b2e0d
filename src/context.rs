use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{AssistError, Result};
use crate::task::{Language, TaskKind};

/// Key under which the response language travels inside a context.
pub const LANGUAGE_KEY: &str = "language";

/// Free-form, task-dependent fields supplied by the caller (subject, grade,
/// topic, studentName, ...).
///
/// The context dump appended to every prompt is key-sorted so prompts are
/// deterministic for a given context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationContext {
    fields: Map<String, Value>,
}

impl GenerationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a context from JSON text.  The top-level value must be an object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::try_from(value)
    }

    /// Builder-style insert.
    #[cfg(test)]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Look up a field by dotted path, e.g. `scores.average`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        let mut current = self.fields.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Render a field for template substitution.  Missing and `null` fields
    /// render as the empty string.
    pub fn render(&self, path: &str) -> String {
        self.get(path).map(render_value).unwrap_or_default()
    }

    /// The language requested in the context, if it names a supported one.
    pub fn language(&self) -> Option<Language> {
        self.get(LANGUAGE_KEY)
            .and_then(Value::as_str)
            .and_then(Language::from_code)
    }

    /// Store `language` unless the caller already supplied one.
    pub fn inject_language(&mut self, language: Language) {
        if !self.contains(LANGUAGE_KEY) {
            self.insert(LANGUAGE_KEY, language.code());
        }
    }

    /// Pretty-printed, key-sorted JSON dump of the whole context.
    pub fn to_pretty_json(&self) -> String {
        let sorted: BTreeMap<&String, &Value> = self.fields.iter().collect();
        serde_json::to_string_pretty(&sorted).unwrap_or_else(|_| "{}".to_string())
    }
}

impl TryFrom<Value> for GenerationContext {
    type Error = AssistError;

    fn try_from(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(AssistError::InvalidContext(format!(
                "expected a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(_) => value.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// -- GenerationRequest ------------------------------------------------------

/// A task kind, its context and the resolved response language.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub task: TaskKind,
    pub context: GenerationContext,
    pub language: Language,
}

impl GenerationRequest {
    /// Resolve the language from the context, falling back to the default
    /// language when it is absent or unrecognised.
    pub fn new(task: TaskKind, context: GenerationContext) -> Self {
        let language = context.language().unwrap_or_default();
        Self {
            task,
            context,
            language,
        }
    }
}
