//! Shared data models for the vrev backend.
//!
//! This crate provides Serde-serializable types for:
//! - Scene analysis records and storyboard shots
//! - Result items and their lifecycle status
//! - Pipeline state for the active video
//! - Session events streamed to observers
//! - Localized user-facing messages

pub mod analysis;
pub mod events;
pub mod messages;
pub mod result;
pub mod state;
pub mod timestamp;
pub mod video;

// Re-export common types
pub use analysis::{AnalysisRecord, PaletteError, StoryboardShot};
pub use events::{SessionEvent, SessionSnapshot};
pub use result::{ItemOrigin, ItemStatus, ResultId, ResultItem};
pub use state::PipelineState;
pub use timestamp::format_time;
pub use video::{VideoDescriptor, VideoId};
