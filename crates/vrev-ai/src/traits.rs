//! Capability seams used by the pipeline.

use async_trait::async_trait;
use vrev_models::{AnalysisRecord, StoryboardShot};

use crate::error::AiResult;

/// Turns one PNG frame into a structured scene analysis.
#[async_trait]
pub trait FrameAnalyzer: Send + Sync {
    async fn analyze_frame(&self, png: &[u8]) -> AiResult<AnalysisRecord>;
}

/// Turns an ordered shot list into a narrative storyboard script.
#[async_trait]
pub trait StoryboardSynthesizer: Send + Sync {
    async fn synthesize(&self, shots: &[StoryboardShot]) -> AiResult<String>;
}
