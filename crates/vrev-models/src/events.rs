//! Session events pushed to observers.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{PipelineState, ResultItem, VideoDescriptor};

/// Full view of the session at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Active video, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoDescriptor>,

    /// Batch pipeline state
    pub state: PipelineState,

    /// Frames sampled per batch run
    pub frame_count: u32,

    /// Result collection in display order
    pub items: Vec<ResultItem>,

    /// Storyboard text of the last batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storyboard: Option<String>,

    /// Storyboard synthesis in progress
    pub storyboard_pending: bool,

    /// Last blocking notification (run failure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
}

/// Incremental session event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Full state, sent first on every subscription
    Snapshot { snapshot: SessionSnapshot },

    /// A new video became active
    VideoLoaded { video: VideoDescriptor },

    /// The active video was removed
    VideoCleared,

    /// Frame count selection changed
    FrameCountChanged {
        #[serde(rename = "frameCount")]
        frame_count: u32,
    },

    /// Pipeline state transition
    StateChanged { state: PipelineState },

    /// Collection replaced (new batch placeholders)
    ItemsReset { items: Vec<ResultItem> },

    /// Item prepended (ad-hoc capture)
    ItemAdded { item: ResultItem },

    /// Item updated in place
    ItemUpdated { item: ResultItem },

    /// Storyboard synthesis started
    StoryboardStarted,

    /// Storyboard text available
    StoryboardReady { text: String },

    /// Storyboard text cleared or synthesis failed
    StoryboardCleared,

    /// Blocking user-facing notification
    Notification {
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl SessionEvent {
    /// Create a notification event.
    pub fn notification(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    /// Event type label (for logs and metrics).
    pub fn kind(&self) -> &'static str {
        match self {
            SessionEvent::Snapshot { .. } => "snapshot",
            SessionEvent::VideoLoaded { .. } => "video_loaded",
            SessionEvent::VideoCleared => "video_cleared",
            SessionEvent::FrameCountChanged { .. } => "frame_count_changed",
            SessionEvent::StateChanged { .. } => "state_changed",
            SessionEvent::ItemsReset { .. } => "items_reset",
            SessionEvent::ItemAdded { .. } => "item_added",
            SessionEvent::ItemUpdated { .. } => "item_updated",
            SessionEvent::StoryboardStarted => "storyboard_started",
            SessionEvent::StoryboardReady { .. } => "storyboard_ready",
            SessionEvent::StoryboardCleared => "storyboard_cleared",
            SessionEvent::Notification { .. } => "notification",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_tagging() {
        let json = serde_json::to_value(SessionEvent::StateChanged {
            state: PipelineState::Complete,
        })
        .unwrap();
        assert_eq!(json["type"], "state_changed");
        assert_eq!(json["state"], "complete");

        let json = serde_json::to_value(SessionEvent::FrameCountChanged { frame_count: 12 }).unwrap();
        assert_eq!(json["frameCount"], 12);
    }

    #[test]
    fn test_notification_kind() {
        let event = SessionEvent::notification("x");
        assert_eq!(event.kind(), "notification");
        assert_eq!(SessionEvent::VideoCleared.kind(), "video_cleared");
    }
}
