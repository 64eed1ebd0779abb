// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the HTTP surface

use super::*;
use crate::runtime::tests::test_env;
use axum::body::Body;
use axum::http::{header, Request};
use tower::ServiceExt;

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn test_router(env: crate::AgentEnv) -> Router {
    let runtime = AgentRuntime::initialize(env).await;
    router(runtime, CancellationToken::new())
}

fn post_query(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/query")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_is_open_and_names_the_agent() {
    let app = test_router(test_env(9200)).await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["agent"], "probe");
}

#[tokio::test]
async fn agent_configuration_serves_the_card() {
    let app = test_router(test_env(9201)).await;
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/.well-known/agent-configuration")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let first = body_json(response).await;
    assert_eq!(first["name"], "probe");
    assert!(first["skills"].as_array().is_some_and(|s| !s.is_empty()));

    // identical on re-query within one process lifetime
    let again = body_json(
        app.oneshot(
            Request::builder()
                .uri("/.well-known/agent-configuration")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(again, first);
}

#[tokio::test]
async fn query_round_trips_with_a_minted_session() {
    let app = test_router(test_env(9202)).await;
    let response = app.oneshot(post_query(r#"{"query":"hello"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert!(json["response"].as_str().is_some_and(|s| !s.is_empty()));
    assert_eq!(json["session_id"].as_str().unwrap().len(), 32);
}

#[tokio::test]
async fn invalid_json_body_is_400() {
    let app = test_router(test_env(9203)).await;
    let response = app.oneshot(post_query("{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_query_field_is_422() {
    let app = test_router(test_env(9204)).await;
    let response = app.oneshot(post_query(r#"{"session_id":"abc"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn blank_query_is_422_with_kind() {
    let app = test_router(test_env(9205)).await;
    let response = app.oneshot(post_query(r#"{"query":"   "}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_json(response).await;
    assert_eq!(json["error"]["kind"], "bad_input");
}

mod auth {
    use super::*;

    async fn authed_router(port: u16) -> Router {
        let mut env = test_env(port);
        env.auth_required = true;
        env.api_key = Some("sekrit".to_string());
        test_router(env).await
    }

    #[tokio::test]
    async fn query_without_key_is_401() {
        let app = authed_router(9210).await;
        let response = app.oneshot(post_query(r#"{"query":"hello"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["error"]["kind"], "auth");
    }

    #[tokio::test]
    async fn header_key_is_accepted() {
        let app = authed_router(9211).await;
        let request = Request::builder()
            .method("POST")
            .uri("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", "sekrit")
            .body(Body::from(r#"{"query":"hello"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn query_param_key_is_accepted() {
        let app = authed_router(9212).await;
        let request = Request::builder()
            .method("POST")
            .uri("/query?api_key=sekrit")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"query":"hello"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn wrong_key_is_401() {
        let app = authed_router(9213).await;
        let request = Request::builder()
            .method("POST")
            .uri("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", "wrong")
            .body(Body::from(r#"{"query":"hello"}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_stays_open_with_auth_enabled() {
        let app = authed_router(9214).await;
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn saturated_inflight_cap_returns_429() {
    let runtime = AgentRuntime::initialize(test_env(9220)).await;
    // hold every permit so the handler's try_acquire fails
    let _held = runtime
        .inflight
        .clone()
        .acquire_many_owned(runtime.inflight.available_permits() as u32)
        .await
        .unwrap();

    let app = router(runtime, CancellationToken::new());
    let response = app.oneshot(post_query(r#"{"query":"hello"}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(response).await;
    assert_eq!(json["error"]["kind"], "overloaded");
}
