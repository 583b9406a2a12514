use crate::error::RpcError;
use crate::paxos::{AcceptArgs, DecideArgs, Paxos, PrepareArgs, Value};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;

pub fn create_paxos_router<V: Value>(px: Arc<Paxos<V>>) -> Router {
    Router::new()
        .route("/paxos/prepare", post(handle_prepare::<V>))
        .route("/paxos/accept", post(handle_accept::<V>))
        .route("/paxos/decide", post(handle_decide::<V>))
        .with_state(px)
}

async fn handle_prepare<V: Value>(
    State(px): State<Arc<Paxos<V>>>,
    Json(args): Json<PrepareArgs>,
) -> Response {
    respond(px.handle_prepare(&args))
}

async fn handle_accept<V: Value>(
    State(px): State<Arc<Paxos<V>>>,
    Json(args): Json<AcceptArgs<V>>,
) -> Response {
    respond(px.handle_accept(&args))
}

async fn handle_decide<V: Value>(
    State(px): State<Arc<Paxos<V>>>,
    Json(args): Json<DecideArgs<V>>,
) -> Response {
    respond(px.handle_decide(&args))
}

fn respond<T: Serialize>(result: Result<T, RpcError>) -> Response {
    match result {
        Ok(reply) => (StatusCode::OK, Json(reply)).into_response(),
        Err(RpcError::Shutdown) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "error": "peer is shut down" })),
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
