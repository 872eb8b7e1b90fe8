// HTTP handlers: version, top-N, terminate, stop stream

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use super::AppState;
use crate::commands::TopReport;
use crate::error::{CommandError, HostError, SnapshotError, TerminateError};
use crate::models::SessionKey;
use crate::version::{NAME, VERSION};

#[derive(Debug, Deserialize)]
pub(super) struct TopQuery {
    n: Option<usize>,
}

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// POST /api/sessions/{session}/top?n=: ranks processes and records the session snapshot.
pub(super) async fn top_handler(
    State(state): State<AppState>,
    Path(session): Path<String>,
    Query(query): Query<TopQuery>,
) -> Result<Json<TopReport>, CommandError> {
    let report = state
        .commands
        .request_top_n(SessionKey::from(session), query.n)
        .await?;
    Ok(Json(report))
}

/// POST /api/sessions/{session}/terminate/{index}: index is 1-based into the latest top list.
pub(super) async fn terminate_handler(
    State(state): State<AppState>,
    Path((session, index)): Path<(String, usize)>,
) -> Result<impl IntoResponse, CommandError> {
    let outcome = state
        .commands
        .request_terminate(&SessionKey::from(session), index)
        .await?;
    let p = &outcome.process;
    let message = if outcome.forced {
        format!("Force-killed {} (PID {}).", p.name, p.pid)
    } else {
        format!("Terminated {} (PID {}).", p.name, p.pid)
    };
    Ok(Json(serde_json::json!({
        "pid": p.pid,
        "name": p.name,
        "forced": outcome.forced,
        "message": message,
    })))
}

/// DELETE /api/sessions/{session}/status: stops the session's live stream.
pub(super) async fn stop_status_handler(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> impl IntoResponse {
    let stopped = state
        .commands
        .stop_status_stream(&SessionKey::from(session))
        .await;
    Json(serde_json::json!({ "stopped": stopped }))
}

pub(crate) fn status_for(err: &CommandError) -> StatusCode {
    match err {
        CommandError::Sampling(_) => StatusCode::SERVICE_UNAVAILABLE,
        CommandError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        CommandError::Terminate(e) => match e {
            TerminateError::Snapshot(SnapshotError::Stale { .. }) => StatusCode::GONE,
            TerminateError::Snapshot(SnapshotError::IndexOutOfRange { .. }) => {
                StatusCode::BAD_REQUEST
            }
            TerminateError::Protected { .. } => StatusCode::FORBIDDEN,
            TerminateError::PidReused { .. } => StatusCode::CONFLICT,
            TerminateError::Host(HostError::NotFound { .. }) => StatusCode::NOT_FOUND,
            TerminateError::Host(HostError::PermissionDenied { .. }) => StatusCode::FORBIDDEN,
            TerminateError::Host(HostError::Unsupported) => StatusCode::NOT_IMPLEMENTED,
            TerminateError::Host(HostError::Io { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

impl IntoResponse for CommandError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}
