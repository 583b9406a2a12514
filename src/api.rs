use crate::error::LogError;
use crate::kv::{GetArgs, KvServer, PutArgs};
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;

pub fn create_router(server: Arc<KvServer>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(get_status))
        .route("/kv/get", post(handle_get))
        .route("/kv/put", post(handle_put))
        .with_state(server)
}

async fn health_check(State(server): State<Arc<KvServer>>) -> impl IntoResponse {
    if server.is_dead() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "dead" })),
        )
    } else {
        (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
    }
}

async fn get_status(State(server): State<Arc<KvServer>>) -> impl IntoResponse {
    Json(server.status().await)
}

async fn handle_get(
    State(server): State<Arc<KvServer>>,
    Json(args): Json<GetArgs>,
) -> impl IntoResponse {
    if server.is_dead() {
        return unavailable();
    }
    match server.get(args).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => error_response(e),
    }
}

async fn handle_put(
    State(server): State<Arc<KvServer>>,
    Json(args): Json<PutArgs>,
) -> impl IntoResponse {
    if server.is_dead() {
        return unavailable();
    }
    match server.put(args).await {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(e) => error_response(e),
    }
}

fn unavailable() -> axum::response::Response {
    error_response(LogError::Shutdown)
}

fn error_response(e: LogError) -> axum::response::Response {
    let status = match e {
        LogError::Shutdown => StatusCode::SERVICE_UNAVAILABLE,
        LogError::Forgotten(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(serde_json::json!({ "error": e.to_string() }))).into_response()
}
