//! Session event stream over WebSocket.
//!
//! Every connection first receives a `snapshot` event, then the incremental
//! events in the order the session emitted them. A subscriber that falls
//! behind the broadcast buffer is resynced with a fresh snapshot instead of
//! being disconnected.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::time::interval;
use tracing::{debug, info, warn};
use vrev_models::SessionEvent;

use crate::metrics;
use crate::state::AppState;

const ENDPOINT: &str = "session";

/// Global counter for active WebSocket connections.
static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

/// Configuration for WebSocket backpressure.
const WS_SEND_BUFFER_SIZE: usize = 32;
const WS_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Send a session event with backpressure handling.
async fn send_event(tx: &mpsc::Sender<Message>, event: &SessionEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize session event: {}", e);
            return false;
        }
    };
    let sent = match tx.try_send(Message::Text(json)) {
        Ok(_) => true,
        Err(mpsc::error::TrySendError::Full(msg)) => {
            debug!("WebSocket send buffer full, applying backpressure");
            tx.send(msg).await.is_ok()
        }
        Err(mpsc::error::TrySendError::Closed(_)) => false,
    };
    if sent {
        metrics::record_ws_message_sent(ENDPOINT, event.kind());
    }
    sent
}

/// WebSocket session endpoint.
pub async fn ws_session(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
    metrics::set_ws_active_connections(count);
    metrics::record_ws_connection(ENDPOINT);

    ws.on_upgrade(|socket| async move {
        handle_session_socket(socket, state).await;
        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

async fn handle_session_socket(socket: WebSocket, state: AppState) {
    let (ws_sender, mut receiver) = socket.split();

    let (tx, mut rx) = mpsc::channel::<Message>(WS_SEND_BUFFER_SIZE);
    let send_task = tokio::spawn(async move {
        let mut ws_sender = ws_sender;
        while let Some(msg) = rx.recv().await {
            if ws_sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let session = state.pipeline.session().clone();
    let (snapshot, mut events) = session.subscribe().await;
    info!(items = snapshot.items.len(), "Session observer connected");

    if !send_event(&tx, &SessionEvent::Snapshot { snapshot }).await {
        drop(tx);
        let _ = send_task.await;
        return;
    }

    let mut heartbeat = interval(WS_HEARTBEAT_INTERVAL);
    let mut last_activity = Instant::now();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        last_activity = Instant::now();
                        if !send_event(&tx, &event).await {
                            debug!("WebSocket send failed, client disconnected");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        metrics::record_ws_resync(skipped);
                        // Resubscribe so the snapshot and the next event line up.
                        let (snapshot, resubscribed) = session.subscribe().await;
                        events = resubscribed;
                        if !send_event(&tx, &SessionEvent::Snapshot { snapshot }).await {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            _ = heartbeat.tick() => {
                if last_activity.elapsed() > WS_HEARTBEAT_INTERVAL / 2
                    && tx.send(Message::Ping(vec![])).await.is_err()
                {
                    warn!("Heartbeat failed, client disconnected");
                    break;
                }
            }
            client_msg = receiver.next() => {
                match client_msg {
                    Some(Ok(Message::Pong(_))) => {
                        last_activity = Instant::now();
                    }
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => {
                        info!("Session observer disconnected");
                        break;
                    }
                    // Observers are read-only.
                    _ => {}
                }
            }
        }
    }

    drop(tx);
    let _ = send_task.await;
}
