//! Gemini REST client for frame analysis and storyboard synthesis.
//!
//! Frames are sent inline as base64 PNG with a structured-output schema.
//! Storyboards are requested as plain text. No model fallback and no
//! retries: one request per call, bounded by the configured timeout.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Instant;
use tracing::{debug, info, warn};
use vrev_models::{AnalysisRecord, StoryboardShot};

use crate::config::GeminiConfig;
use crate::error::{AiError, AiResult};
use crate::prompts::{analysis_schema, build_storyboard_prompt, strip_code_fence, FRAME_ANALYSIS_PROMPT};
use crate::traits::{FrameAnalyzer, StoryboardSynthesizer};

/// Gemini API client.
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn png(bytes: &[u8]) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: "image/png".to_string(),
                data: STANDARD.encode(bytes),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    temperature: f32,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// A missing API key is not an error here; every call then fails with
    /// [`AiError::NotConfigured`].
    pub fn new(config: GeminiConfig) -> AiResult<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> AiResult<Self> {
        Self::new(GeminiConfig::from_env())
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    async fn generate(&self, operation: &'static str, request: &GeminiRequest) -> AiResult<String> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AiError::not_configured("GEMINI_API_KEY not set"))?;

        let started = Instant::now();
        debug!(model = %self.config.model, operation, "Calling Gemini API");

        let result = self.send(api_key, request).await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("vrev_gemini_requests_total", "operation" => operation, "outcome" => outcome)
            .increment(1);
        metrics::histogram!("vrev_gemini_request_duration_seconds", "operation" => operation)
            .record(started.elapsed().as_secs_f64());

        if let Err(e) = &result {
            warn!(model = %self.config.model, operation, error = %e, "Gemini call failed");
        }
        result
    }

    async fn send(&self, api_key: &str, request: &GeminiRequest) -> AiResult<String> {
        let response = self
            .client
            .post(self.config.endpoint())
            .query(&[("key", api_key)])
            .json(request)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Status { status, body });
        }

        let parsed: GeminiResponse = response.json().await.map_err(map_transport_error)?;
        parsed.text().ok_or(AiError::EmptyResponse)
    }
}

fn map_transport_error(e: reqwest::Error) -> AiError {
    if e.is_timeout() {
        AiError::Timeout
    } else {
        AiError::Request(e)
    }
}

/// Parse and validate the structured frame analysis.
pub fn parse_analysis(text: &str) -> AiResult<AnalysisRecord> {
    let record: AnalysisRecord = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| AiError::parse(format!("analysis JSON: {}", e)))?;
    let record = record.normalized();
    record
        .validate_palette()
        .map_err(|e| AiError::invalid_analysis(e.to_string()))?;
    Ok(record)
}

#[async_trait]
impl FrameAnalyzer for GeminiClient {
    async fn analyze_frame(&self, png: &[u8]) -> AiResult<AnalysisRecord> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part::png(png), Part::text(FRAME_ANALYSIS_PROMPT)],
            }],
            generation_config: GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(analysis_schema()),
                temperature: self.config.temperature,
            },
        };

        let text = self.generate("analyze_frame", &request).await?;
        parse_analysis(&text)
    }
}

#[async_trait]
impl StoryboardSynthesizer for GeminiClient {
    async fn synthesize(&self, shots: &[StoryboardShot]) -> AiResult<String> {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part::text(build_storyboard_prompt(shots))],
            }],
            generation_config: GenerationConfig {
                response_mime_type: None,
                response_schema: None,
                temperature: self.config.temperature,
            },
        };

        let text = self.generate("storyboard", &request).await?;
        info!(shots = shots.len(), chars = text.chars().count(), "Storyboard generated");
        Ok(text.trim().to_string())
    }
}
