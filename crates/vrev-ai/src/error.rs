//! Inference error types.

use thiserror::Error;

pub type AiResult<T> = Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Inference service not configured: {0}")]
    NotConfigured(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Gemini API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("No content in Gemini response")]
    EmptyResponse,

    #[error("Failed to parse model output: {0}")]
    Parse(String),

    #[error("Invalid analysis: {0}")]
    InvalidAnalysis(String),

    #[error("Request timed out")]
    Timeout,
}

impl AiError {
    pub fn not_configured(msg: impl Into<String>) -> Self {
        Self::NotConfigured(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn invalid_analysis(msg: impl Into<String>) -> Self {
        Self::InvalidAnalysis(msg.into())
    }

    /// Label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AiError::NotConfigured(_) => "not_configured",
            AiError::Request(_) => "request",
            AiError::Status { .. } => "status",
            AiError::EmptyResponse => "empty",
            AiError::Parse(_) => "parse",
            AiError::InvalidAnalysis(_) => "invalid",
            AiError::Timeout => "timeout",
        }
    }
}
