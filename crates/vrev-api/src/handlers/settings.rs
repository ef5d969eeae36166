//! Frame count settings handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsResponse {
    pub frame_count: u32,
    pub allowed_frame_counts: Vec<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameCountRequest {
    pub frame_count: u32,
}

async fn settings_response(state: &AppState) -> SettingsResponse {
    SettingsResponse {
        frame_count: state.pipeline.session().snapshot().await.frame_count,
        allowed_frame_counts: state.pipeline_config.allowed_frame_counts.clone(),
    }
}

/// Current frame count and the selectable values.
pub async fn get_settings(State(state): State<AppState>) -> Json<SettingsResponse> {
    Json(settings_response(&state).await)
}

/// Change the frame count. Rejected while a batch run is analyzing.
pub async fn update_frame_count(
    State(state): State<AppState>,
    Json(request): Json<FrameCountRequest>,
) -> ApiResult<Json<SettingsResponse>> {
    state
        .pipeline
        .session()
        .set_frame_count(request.frame_count)
        .await?;
    info!(frame_count = request.frame_count, "Frame count updated");
    Ok(Json(settings_response(&state).await))
}
