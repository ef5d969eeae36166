//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Frame count {0} is not one of the allowed values")]
    InvalidFrameCount(u32),

    #[error("Analysis in progress")]
    Busy,

    #[error("No video loaded")]
    NoVideo,

    #[error("Analysis queue closed")]
    QueueClosed,

    #[error("Analysis timed out after {0} seconds")]
    Timeout(u64),

    #[error("Media error: {0}")]
    Media(#[from] vrev_media::MediaError),

    #[error("AI error: {0}")]
    Ai(#[from] vrev_ai::AiError),
}

impl PipelineError {
    /// Whether the caller asked for something the current state forbids.
    pub fn is_conflict(&self) -> bool {
        matches!(self, PipelineError::Busy)
    }
}
