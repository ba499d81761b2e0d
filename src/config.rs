use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{AssistError, Result};
use crate::task::Language;

pub const DEFAULT_BACKEND: &str = "gemini";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Default response language (`th`, `en` or `zh`) used when a request
    /// does not name one.  Can be overridden with `CLASSROOM_ASSIST_LANGUAGE`.
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default)]
    pub llm: LlmConfig,
}

// -- LLM ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Which backend generates content: `"gemini"` (default) or `"openrouter"`.
    /// Can be overridden with `LLM_BACKEND`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Google AI Studio key.  Prefer `GEMINI_API_KEY` over storing it here.
    #[serde(default)]
    pub gemini_api_key: String,

    /// Gemini model name (default: `gemini-2.0-flash`).
    #[serde(default)]
    pub gemini_model: String,

    /// Override the Gemini API base URL.
    #[serde(default)]
    pub gemini_base_url: String,

    #[serde(default)]
    pub openrouter_api_key: String,

    #[serde(default)]
    pub openrouter_model: String,

    #[serde(default)]
    pub openrouter_base_url: String,

    #[serde(default)]
    pub openrouter_site_url: String,

    #[serde(default)]
    pub openrouter_app_name: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds.  `0` leaves the transport default in place.
    #[serde(default)]
    pub timeout_secs: u64,
}

// -- Defaults ------------------------------------------------------------

fn default_language() -> String {
    Language::default().code().to_string()
}
fn default_backend() -> String {
    DEFAULT_BACKEND.to_string()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_top_p() -> f32 {
    0.95
}
fn default_max_tokens() -> usize {
    2048
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            gemini_api_key: String::new(),
            gemini_model: String::new(),
            gemini_base_url: String::new(),
            openrouter_api_key: String::new(),
            openrouter_model: String::new(),
            openrouter_base_url: String::new(),
            openrouter_site_url: String::new(),
            openrouter_app_name: String::new(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            timeout_secs: 0,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: default_language(),
            llm: LlmConfig::default(),
        }
    }
}

// -- Config impl ---------------------------------------------------------

impl Config {
    /// Load config from the given path, or the default XDG config location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_config_path(),
        };

        let config = if config_path.exists() {
            info!("loading config from {}", config_path.display());
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str(&contents)
                .map_err(|e| AssistError::Config(format!("parse error: {e}")))?
        } else {
            info!("no config file found, using defaults");
            Config::default()
        };

        Ok(config)
    }

    /// Returns the default config file path: `$XDG_CONFIG_HOME/classroom-assist/config.toml`
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("classroom-assist")
            .join("config.toml")
    }

    /// The default response language, honouring `CLASSROOM_ASSIST_LANGUAGE`.
    /// Unrecognised codes fall back to the first supported language.
    pub fn default_language(&self) -> Language {
        env_or("CLASSROOM_ASSIST_LANGUAGE", &self.language)
            .map(|code| Language::from_code_or_default(&code))
            .unwrap_or_default()
    }

    /// Generate the default config file contents.
    pub fn default_config_contents() -> &'static str {
        include_str!("../config.example.toml")
    }
}

/// Read `var` from the environment, falling back to `fallback`.  Empty values
/// on either side count as unset.
pub fn env_or(var: &str, fallback: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| {
            if fallback.trim().is_empty() {
                None
            } else {
                Some(fallback.to_string())
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let c = Config::default();
        assert_eq!(c.language, "th");
        assert_eq!(c.llm.backend, "gemini");
    }

    #[test]
    fn default_llm_config() {
        let llm = LlmConfig::default();
        assert!(llm.gemini_api_key.is_empty());
        assert!(llm.openrouter_api_key.is_empty());
        assert_eq!(llm.timeout_secs, 0);
        assert!((llm.temperature - 0.7).abs() < 0.001);
        assert!((llm.top_p - 0.95).abs() < 0.001);
        assert_eq!(llm.max_tokens, 2048);
    }

    #[test]
    fn parse_minimal_toml() {
        let c: Config = toml::from_str(r#"language = "en""#).unwrap();
        assert_eq!(c.language, "en");
        assert_eq!(c.llm.backend, "gemini");
        assert_eq!(c.llm.max_tokens, 2048);
    }

    #[test]
    fn parse_llm_section() {
        let toml_str = r#"
        [llm]
        backend = "openrouter"
        openrouter_model = "anthropic/claude-sonnet-4"
        temperature = 0.2
        timeout_secs = 45
        "#;
        let c: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(c.llm.backend, "openrouter");
        assert_eq!(c.llm.openrouter_model, "anthropic/claude-sonnet-4");
        assert!((c.llm.temperature - 0.2).abs() < 0.001);
        assert_eq!(c.llm.timeout_secs, 45);
        assert_eq!(c.language, "th");
    }

    #[test]
    fn load_nonexistent_returns_defaults() {
        let c = Config::load(Some(Path::new("/tmp/nonexistent-classroom-assist-test.toml"))).unwrap();
        assert_eq!(c.llm.backend, "gemini");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "language = \"zh\"\n[llm]\nmax_tokens = 512\n").unwrap();
        let c = Config::load(Some(&path)).unwrap();
        assert_eq!(c.language, "zh");
        assert_eq!(c.llm.max_tokens, 512);
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is not valid %%% toml").unwrap();
        let result = Config::load(Some(&path));
        assert!(matches!(result, Err(AssistError::Config(_))));
    }

    #[test]
    fn default_config_path_has_app_name() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("classroom-assist"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn default_config_contents_parses() {
        let contents = Config::default_config_contents();
        assert!(!contents.is_empty());
        let c: Config = toml::from_str(contents).unwrap();
        assert_eq!(c.llm.backend, "gemini");
    }

    #[test]
    fn env_or_prefers_environment_and_skips_empty() {
        assert_eq!(
            env_or("CLASSROOM_ASSIST_TEST_UNSET_VAR", "fallback").as_deref(),
            Some("fallback")
        );
        assert_eq!(env_or("CLASSROOM_ASSIST_TEST_UNSET_VAR", "  "), None);
        assert_eq!(
            env_or("CLASSROOM_ASSIST_TEST_UNSET_VAR", "").as_deref(),
            None
        );
    }

    #[test]
    fn default_language_falls_back() {
        if std::env::var("CLASSROOM_ASSIST_LANGUAGE").is_ok() {
            return;
        }
        let mut c = Config::default();
        c.language = "en".to_string();
        assert_eq!(c.default_language(), Language::En);
        c.language = "fr".to_string();
        assert_eq!(c.default_language(), Language::Th);
        c.language = String::new();
        assert_eq!(c.default_language(), Language::Th);
    }
}
