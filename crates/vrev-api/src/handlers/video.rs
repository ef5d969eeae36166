//! Video upload and removal handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use tracing::{info, warn};
use vrev_media::probe_video;
use vrev_models::{VideoDescriptor, VideoId};
use vrev_pipeline::ActiveVideo;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::security::validate_upload;
use crate::state::AppState;
use crate::upload::UploadedVideo;

/// Make the uploaded blob the active video.
///
/// The body is the raw video. Any previous video, its results and any
/// in-flight run are discarded.
pub async fn upload_video(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<VideoDescriptor>> {
    let meta = match validate_upload(&headers) {
        Ok(meta) if !body.is_empty() => meta,
        Ok(_) => {
            metrics::record_upload(false, 0);
            return Err(ApiError::not_a_video());
        }
        Err(e) => {
            metrics::record_upload(false, body.len());
            return Err(e);
        }
    };

    let upload = UploadedVideo::store(
        state.work_dir(),
        &meta.extension,
        &body,
        state.pipeline_config.seek_timeout,
    )
    .await?;

    let info = match probe_video(upload.path()).await {
        Ok(info) => info,
        Err(e) => {
            warn!(file_name = %meta.file_name, "Rejected upload: {}", e);
            metrics::record_upload(false, body.len());
            return Err(e.into());
        }
    };
    metrics::record_upload(true, body.len());

    let descriptor = VideoDescriptor {
        video_id: VideoId::new(),
        file_name: meta.file_name,
        duration: info.duration,
        width: info.width,
        height: info.height,
    };
    info!(
        video_id = %descriptor.video_id,
        file_name = %descriptor.file_name,
        duration = descriptor.duration,
        "Video loaded"
    );

    state
        .pipeline
        .session()
        .load_video(ActiveVideo {
            descriptor: descriptor.clone(),
            source: Arc::new(upload),
        })
        .await;

    Ok(Json(descriptor))
}

#[derive(Serialize)]
pub struct RemoveVideoResponse {
    /// False when no video was loaded
    pub removed: bool,
}

/// Remove the active video and its results.
pub async fn remove_video(State(state): State<AppState>) -> Json<RemoveVideoResponse> {
    let removed = state.pipeline.session().clear_video().await;
    if removed {
        info!("Video removed");
    }
    Json(RemoveVideoResponse { removed })
}
