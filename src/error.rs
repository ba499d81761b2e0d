use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("config error: {0}")]
    Config(String),

    #[error("unknown task kind: {0}")]
    UnknownTaskKind(String),

    #[error("content generation is not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("content generation failed: {0}")]
    GenerationFailed(String),

    #[error("invalid context: {0}")]
    InvalidContext(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AssistError>;
