//! Result items observed by clients.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::analysis::AnalysisRecord;

/// Unique identifier for a result item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ResultId(pub String);

impl ResultId {
    /// Generate a new random result ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ResultId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle status of a result item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting for a thumbnail and/or analysis
    #[default]
    Loading,
    /// Analysis available
    Ready,
    /// Analysis failed
    Failed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Loading => "loading",
            ItemStatus::Ready => "ready",
            ItemStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Ready | ItemStatus::Failed)
    }
}

/// Where a result item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ItemOrigin {
    /// Sampled by a batch run
    #[default]
    Batch,
    /// Captured from the playback position
    Capture,
}

/// One analyzed (or pending) frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    /// Item ID
    pub id: ResultId,

    /// Frame time in seconds
    pub timestamp: f64,

    /// PNG bytes, serialized as a `data:` URL (empty string while absent)
    #[serde(with = "png_data_url")]
    #[schemars(with = "String")]
    pub thumbnail: Vec<u8>,

    /// Lifecycle status
    pub status: ItemStatus,

    /// Origin of the item
    #[serde(default)]
    pub origin: ItemOrigin,

    /// Analysis once ready
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AnalysisRecord>,

    /// Localized error once failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResultItem {
    /// Batch placeholder: loading, no thumbnail yet.
    pub fn placeholder(timestamp: f64) -> Self {
        Self {
            id: ResultId::new(),
            timestamp,
            thumbnail: Vec::new(),
            status: ItemStatus::Loading,
            origin: ItemOrigin::Batch,
            data: None,
            error: None,
        }
    }

    /// Ad-hoc capture: loading, thumbnail already known.
    pub fn captured(timestamp: f64, thumbnail: Vec<u8>) -> Self {
        Self {
            id: ResultId::new(),
            timestamp,
            thumbnail,
            status: ItemStatus::Loading,
            origin: ItemOrigin::Capture,
            data: None,
            error: None,
        }
    }

    /// Copy with the thumbnail replaced.
    pub fn with_thumbnail(&self, thumbnail: Vec<u8>) -> Self {
        Self {
            thumbnail,
            ..self.clone()
        }
    }

    /// Copy marked ready with analysis data.
    pub fn ready(&self, data: AnalysisRecord) -> Self {
        Self {
            status: ItemStatus::Ready,
            data: Some(data),
            error: None,
            ..self.clone()
        }
    }

    /// Copy marked failed with a localized message.
    pub fn failed(&self, message: impl Into<String>) -> Self {
        Self {
            status: ItemStatus::Failed,
            data: None,
            error: Some(message.into()),
            ..self.clone()
        }
    }

    pub fn has_thumbnail(&self) -> bool {
        !self.thumbnail.is_empty()
    }
}

/// Serde adapter: PNG bytes <-> `data:image/png;base64,...`.
pub mod png_data_url {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const PREFIX: &str = "data:image/png;base64,";

    /// Encode PNG bytes as a data URL; empty input yields an empty string.
    pub fn encode(bytes: &[u8]) -> String {
        if bytes.is_empty() {
            String::new()
        } else {
            format!("{}{}", PREFIX, STANDARD.encode(bytes))
        }
    }

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.is_empty() {
            return Ok(Vec::new());
        }
        let payload = s.strip_prefix(PREFIX).unwrap_or(&s);
        STANDARD.decode(payload).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AnalysisRecord {
        AnalysisRecord {
            visual_description: "a".to_string(),
            ai_prompt: "b".to_string(),
            character_prompt: None,
            technical_breakdown: "c".to_string(),
            color_palette: vec!["#000000".into(), "#111111".into(), "#222222".into()],
        }
    }

    #[test]
    fn test_placeholder_is_loading_without_thumbnail() {
        let item = ResultItem::placeholder(2.0);
        assert_eq!(item.status, ItemStatus::Loading);
        assert_eq!(item.origin, ItemOrigin::Batch);
        assert!(!item.has_thumbnail());
    }

    #[test]
    fn test_transitions_keep_identity() {
        let item = ResultItem::placeholder(2.0).with_thumbnail(vec![1, 2, 3]);
        let ready = item.ready(record());
        assert_eq!(ready.id, item.id);
        assert_eq!(ready.status, ItemStatus::Ready);
        assert_eq!(ready.thumbnail, vec![1, 2, 3]);

        let failed = item.failed("boom");
        assert_eq!(failed.id, item.id);
        assert_eq!(failed.error.as_deref(), Some("boom"));
        assert!(failed.data.is_none());
        assert!(failed.status.is_terminal());
    }

    #[test]
    fn test_thumbnail_serializes_as_data_url() {
        let item = ResultItem::captured(1.5, vec![0x89, b'P', b'N', b'G']);
        let json = serde_json::to_value(&item).unwrap();
        let thumb = json["thumbnail"].as_str().unwrap();
        assert!(thumb.starts_with(png_data_url::PREFIX));
        assert_eq!(json["origin"], "capture");

        let back: ResultItem = serde_json::from_value(json).unwrap();
        assert_eq!(back.thumbnail, item.thumbnail);
    }

    #[test]
    fn test_empty_thumbnail_serializes_as_empty_string() {
        let json = serde_json::to_value(ResultItem::placeholder(0.0)).unwrap();
        assert_eq!(json["thumbnail"], "");
        assert!(json.get("data").is_none());
        assert!(json.get("error").is_none());
    }
}
