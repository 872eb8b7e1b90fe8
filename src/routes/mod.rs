// HTTP + WebSocket command surface

mod http;
mod ws;

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::commands::CommandService;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) commands: Arc<CommandService>,
}

pub fn app(commands: Arc<CommandService>) -> Router {
    let state = AppState { commands };
    Router::new()
        .route("/", get(|| async { "hostguard: watching host CPU" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/sessions/{session}/top", post(http::top_handler)) // POST top-N
        .route(
            "/api/sessions/{session}/terminate/{index}",
            post(http::terminate_handler),
        ) // POST terminate by index
        .route(
            "/api/sessions/{session}/status",
            delete(http::stop_status_handler),
        ) // DELETE running status stream
        .route("/ws/status/{session}", get(ws::ws_status)) // WS live status
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
