// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The agent's HTTP surface.
//!
//! `GET /health` and `GET /.well-known/agent-configuration` are always open;
//! `POST /query` honors optional API-key auth and an in-flight cap.

use crate::runtime::{AgentRuntime, QueryError, QueryRequest};
use crate::trace::TraceParent;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Clone)]
struct AppState {
    runtime: Arc<AgentRuntime>,
    shutdown: CancellationToken,
}

/// Build the router for one agent runtime.
pub fn router(runtime: Arc<AgentRuntime>, shutdown: CancellationToken) -> Router {
    let state = AppState { runtime, shutdown };
    Router::new()
        .route("/health", get(health))
        .route("/.well-known/agent-configuration", get(agent_configuration))
        .route("/query", post(query))
        .with_state(state)
}

/// Bind and serve until the shutdown token fires, then drain briefly.
pub async fn serve(
    runtime: Arc<AgentRuntime>,
    listener: tokio::net::TcpListener,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(addr = %addr, agent = %runtime.name(), "listening");

    let app = router(runtime, shutdown.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
        })
        .await
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy", "agent": state.runtime.name() }))
}

async fn agent_configuration(State(state): State<AppState>) -> Json<crate::card::AgentCard> {
    Json(state.runtime.card().clone())
}

fn error_body(status: StatusCode, kind: &str, message: &str) -> Response {
    (
        status,
        Json(json!({ "error": { "kind": kind, "message": message } })),
    )
        .into_response()
}

async fn query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    body: Result<Json<QueryRequest>, axum::extract::rejection::JsonRejection>,
) -> Response {
    // auth runs before the body is parsed
    let provided = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| params.get("api_key").map(String::as_str));
    if !state.runtime.auth_ok(provided) {
        return error_body(
            StatusCode::UNAUTHORIZED,
            "auth",
            "missing or invalid API key",
        );
    }

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            use axum::extract::rejection::JsonRejection;
            let (status, kind) = match &rejection {
                JsonRejection::JsonSyntaxError(_) => (StatusCode::BAD_REQUEST, "bad_json"),
                JsonRejection::JsonDataError(_) => (StatusCode::UNPROCESSABLE_ENTITY, "validation"),
                _ => (StatusCode::BAD_REQUEST, "bad_request"),
            };
            return error_body(status, kind, &rejection.body_text());
        }
    };

    let Ok(permit) = state.runtime.inflight.clone().try_acquire_owned() else {
        return error_body(
            StatusCode::TOO_MANY_REQUESTS,
            "overloaded",
            "too many in-flight queries",
        );
    };

    let traceparent = headers
        .get("traceparent")
        .and_then(|v| v.to_str().ok())
        .and_then(TraceParent::parse);

    let result = state
        .runtime
        .handle_query(request, traceparent, state.shutdown.clone())
        .await;
    drop(permit);

    match result {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            let status = match &e {
                QueryError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
                QueryError::BadInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
                QueryError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
                QueryError::Backend(_) | QueryError::BackendFailed(_) => StatusCode::BAD_GATEWAY,
            };
            tracing::warn!(kind = e.kind(), error = %e, "query failed");
            error_body(status, e.kind(), &e.to_string())
        }
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
