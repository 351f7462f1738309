//! WebSocket upgrade handler

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::http::routes::serve_static;
use crate::relay::{PlayerId, RelayHandle};
use crate::util::rate_limit::UpdateRateLimiter;
use crate::ws::protocol::{decode_client_msg, ClientMsg, ServerMsg};

/// How long a closing peer gets to finish the close handshake
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle of a single connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Upgrade accepted, not yet registered
    Connecting,
    /// Registered with the relay
    Open,
    /// Transport closed or errored, record removed
    Closed,
}

/// WebSocket upgrade handler.
///
/// A plain GET on the upgrade path falls through to the static responder so
/// the bundle and the socket can share `/`.
pub async fn ws_handler(
    State(state): State<AppState>,
    upgrade: Option<WebSocketUpgrade>,
    request: Request,
) -> Response {
    match upgrade {
        Some(ws) => ws.on_upgrade(move |socket| handle_socket(socket, state)),
        None => serve_static(&state.config.static_dir, request).await,
    }
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    debug!(state = ?ConnectionState::Connecting, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    let player_id = match state.relay.connect(outbound_tx).await {
        Ok(id) => id,
        Err(e) => {
            error!(error = %e, "Failed to register connection");
            return;
        }
    };
    info!(player_id = %player_id, state = ?ConnectionState::Open, "WebSocket connection open");

    let limiter = UpdateRateLimiter::new(state.config.update_rate_limit);
    run_session(&player_id, &state.relay, &limiter, ws_sink, ws_stream, outbound_rx).await;

    if let Err(e) = state.relay.disconnect(player_id.clone()).await {
        warn!(player_id = %player_id, error = %e, "Failed to unregister connection");
    }

    info!(player_id = %player_id, state = ?ConnectionState::Closed, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    player_id: &PlayerId,
    relay: &RelayHandle,
    limiter: &UpdateRateLimiter,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    mut outbound_rx: mpsc::UnboundedReceiver<ServerMsg>,
) {
    // Spawn writer task: relay fan-out -> WebSocket
    let writer_player_id = player_id.clone();
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbound_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %writer_player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    // Reader loop: WebSocket -> relay
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                let msg = match decode_client_msg(&text) {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                        continue;
                    }
                };

                if matches!(msg, ClientMsg::Update(_)) && !limiter.check() {
                    warn!(player_id = %player_id, "Rate limited update message");
                    continue;
                }

                if relay.message(player_id.clone(), msg).await.is_err() {
                    debug!(player_id = %player_id, "Relay stopped");
                    break;
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                // polling on flushes the queued Close reply; the stream ends after it
                let drain = async { while ws_stream.next().await.is_some() {} };
                if tokio::time::timeout(CLOSE_HANDSHAKE_TIMEOUT, drain).await.is_err() {
                    debug!(player_id = %player_id, "Close handshake timed out");
                }
                break;
            }
            Err(e) => {
                warn!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
