// WebSocket live status stream

use axum::{
    extract::{
        Path, Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::time::{Duration, timeout};

use super::AppState;
use crate::models::SessionKey;
use crate::reporter::StatusStream;

pub(super) const WS_PING_INTERVAL: Duration = Duration::from_secs(30);
pub(super) const WS_SEND_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
pub(super) struct StatusQuery {
    interval_ms: Option<u64>,
    duration_secs: Option<u64>,
}

/// GET /ws/status/{session}: validates the request, then streams StatusEvents as JSON text.
pub(super) async fn ws_status(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let stream = match state
        .commands
        .request_status_stream(
            SessionKey::from(session),
            query.interval_ms.map(Duration::from_millis),
            query.duration_secs.map(Duration::from_secs),
        )
        .await
    {
        Ok(s) => s,
        Err(e) => return e.into_response(),
    };
    ws.on_upgrade(move |socket| async move {
        if let Err(e) = stream_status(socket, stream).await {
            tracing::info!("Status stream error: {}", e);
        }
    })
}

/// Forwards events until the stream ends, the client goes away or sends "stop".
async fn stream_status(socket: WebSocket, mut stream: StatusStream) -> anyhow::Result<()> {
    tracing::info!(session = %stream.session_key(), "Client connected to status stream");
    let (mut sender, mut receiver) = socket.split();
    let mut ping_interval = tokio::time::interval_at(
        tokio::time::Instant::now() + WS_PING_INTERVAL,
        WS_PING_INTERVAL,
    );
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            event = stream.next() => {
                match event {
                    Some(event) => {
                        let json = serde_json::to_string(&event)?;
                        let r = timeout(WS_SEND_TIMEOUT, sender.send(Message::Text(json.into()))).await;
                        if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = timeout(WS_SEND_TIMEOUT, sender.send(Message::Close(None))).await;
                        break;
                    }
                }
            }
            _ = ping_interval.tick() => {
                let r = timeout(WS_SEND_TIMEOUT, sender.send(Message::Ping(Bytes::new()))).await;
                if r.is_err() || r.unwrap_or(Ok(())).is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => break,
                    Some(Ok(Message::Text(text))) if text.as_str().trim() == "stop" => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
    stream.cancel();
    Ok(())
}
