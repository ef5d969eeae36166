//! Remote inference for frame analysis and storyboard synthesis.
//!
//! This crate provides:
//! - The [`FrameAnalyzer`] and [`StoryboardSynthesizer`] capability traits
//! - A Gemini REST implementation of both
//! - Prompt text and the structured-output schema

pub mod config;
pub mod error;
pub mod gemini;
pub mod prompts;
pub mod traits;

pub use config::GeminiConfig;
pub use error::{AiError, AiResult};
pub use gemini::GeminiClient;
pub use traits::{FrameAnalyzer, StoryboardSynthesizer};
