//! Pipeline state for the active video.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Batch pipeline state.
///
/// `Idle -> Analyzing -> Complete`, with `Analyzing -> Idle` when extraction
/// fails. A new batch may start from `Idle` or `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// No batch running
    #[default]
    Idle,
    /// Batch extracting or analyzing frames
    Analyzing,
    /// Every frame of the last batch resolved
    Complete,
}

impl PipelineState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "idle",
            PipelineState::Analyzing => "analyzing",
            PipelineState::Complete => "complete",
        }
    }

    /// Whether a batch run is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(self, PipelineState::Analyzing)
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
