//! Session snapshot handler.

use axum::extract::State;
use axum::Json;
use vrev_models::SessionSnapshot;

use crate::state::AppState;

/// Current session state, for clients that do not hold a WebSocket.
pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.pipeline.session().snapshot().await)
}
