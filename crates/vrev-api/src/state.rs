//! Application state.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use vrev_ai::{FrameAnalyzer, GeminiClient, StoryboardSynthesizer};
use vrev_pipeline::{AnalysisSession, Pipeline, PipelineConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub pipeline: Pipeline,
    pub pipeline_config: PipelineConfig,
    /// Whether the inference credential is present
    pub inference_configured: bool,
}

impl AppState {
    /// Create new application state backed by the Gemini client.
    pub async fn new(
        config: ApiConfig,
        pipeline_config: PipelineConfig,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let gemini = Arc::new(GeminiClient::from_env()?);
        let inference_configured = gemini.is_configured();
        if inference_configured {
            info!(model = %gemini.config().model, "Gemini client configured");
        } else {
            warn!("GEMINI_API_KEY not set; analysis requests will fail");
        }

        tokio::fs::create_dir_all(&pipeline_config.work_dir).await?;

        Ok(Self::with_services(
            config,
            pipeline_config,
            gemini.clone(),
            gemini,
            inference_configured,
        ))
    }

    /// Build state around arbitrary analyzer/synthesizer implementations.
    pub fn with_services(
        config: ApiConfig,
        pipeline_config: PipelineConfig,
        analyzer: Arc<dyn FrameAnalyzer>,
        synthesizer: Arc<dyn StoryboardSynthesizer>,
        inference_configured: bool,
    ) -> Self {
        let session = AnalysisSession::new(&pipeline_config);
        // The worker lives as long as a queue sender does.
        let (pipeline, _worker) = Pipeline::new(&pipeline_config, session, analyzer, synthesizer);
        Self {
            config,
            pipeline,
            pipeline_config,
            inference_configured,
        }
    }

    pub fn work_dir(&self) -> &PathBuf {
        &self.pipeline_config.work_dir
    }
}
