//! Scene analysis records produced by the inference service.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum number of colors in a palette.
pub const MIN_PALETTE_COLORS: usize = 3;

/// Maximum number of colors in a palette.
pub const MAX_PALETTE_COLORS: usize = 5;

/// Structured analysis of a single frame.
///
/// Field names follow the camelCase wire format of the inference service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    /// Visual description of subject, action and environment
    pub visual_description: String,

    /// Text-to-image prompt for generative art tools
    pub ai_prompt: String,

    /// Character prompt; absent when no human subject is present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_prompt: Option<String>,

    /// How the shot was made: lighting, lens, effects
    pub technical_breakdown: String,

    /// 3-5 hex colors (`#RRGGBB`)
    pub color_palette: Vec<String>,
}

impl AnalysisRecord {
    /// Normalize optional fields.
    ///
    /// The service sometimes returns an empty or whitespace-only character
    /// prompt instead of omitting it.
    pub fn normalized(mut self) -> Self {
        if self
            .character_prompt
            .as_deref()
            .is_some_and(|p| p.trim().is_empty())
        {
            self.character_prompt = None;
        }
        self
    }

    /// Check the palette shape: 3-5 entries, each `#RRGGBB`.
    pub fn validate_palette(&self) -> Result<(), PaletteError> {
        let len = self.color_palette.len();
        if !(MIN_PALETTE_COLORS..=MAX_PALETTE_COLORS).contains(&len) {
            return Err(PaletteError::BadLength(len));
        }
        if let Some(bad) = self.color_palette.iter().find(|c| !is_hex_color(c)) {
            return Err(PaletteError::BadColor(bad.clone()));
        }
        Ok(())
    }

    /// Project the record onto the fields the storyboard step needs.
    pub fn to_shot(&self, timestamp: f64) -> StoryboardShot {
        StoryboardShot {
            timestamp,
            visual_description: self.visual_description.clone(),
            technical_breakdown: self.technical_breakdown.clone(),
        }
    }
}

/// Palette validation error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaletteError {
    #[error("palette must contain 3-5 colors, got {0}")]
    BadLength(usize),

    #[error("invalid hex color: {0}")]
    BadColor(String),
}

/// Check a `#RRGGBB` color string.
pub fn is_hex_color(s: &str) -> bool {
    s.len() == 7
        && s.starts_with('#')
        && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// One entry of the storyboard request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoryboardShot {
    /// Frame time in seconds
    pub timestamp: f64,
    pub visual_description: String,
    pub technical_breakdown: String,
}
