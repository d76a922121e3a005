use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParleyError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Interactive input unavailable: {0}")]
    Input(String),

    #[error("Interrupted by user")]
    Aborted,

    #[error("{0}")]
    Other(String),
}

impl ParleyError {
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ParleyError>;
