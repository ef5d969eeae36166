//! Batch analysis and ad-hoc capture handlers.
//!
//! Both only schedule work; results arrive through the session stream.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Serialize)]
pub struct StartAnalysisResponse {
    /// False when the request was a no-op
    pub started: bool,
}

/// Start a batch run over the active video.
pub async fn start_analysis(
    State(state): State<AppState>,
) -> (StatusCode, Json<StartAnalysisResponse>) {
    let started = state.pipeline.start_batch().await.is_some();
    if !started {
        debug!("Analysis request ignored");
    }
    (StatusCode::ACCEPTED, Json(StartAnalysisResponse { started }))
}

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    /// Playback position in seconds
    pub position: f64,
}

#[derive(Serialize)]
pub struct CaptureResponse {
    pub captured: bool,
}

/// Capture and analyze the frame at the given playback position.
pub async fn capture_frame(
    State(state): State<AppState>,
    Json(request): Json<CaptureRequest>,
) -> ApiResult<(StatusCode, Json<CaptureResponse>)> {
    if !request.position.is_finite() || request.position < 0.0 {
        return Err(ApiError::bad_request("position must be a non-negative number"));
    }
    let captured = state.pipeline.capture(request.position).await.is_some();
    Ok((StatusCode::ACCEPTED, Json(CaptureResponse { captured })))
}
