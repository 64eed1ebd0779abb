// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the A2A transport tools against a live agent

use super::*;
use crate::peers::PeerRegistry;
use crate::runtime::tests::test_env;
use crate::runtime::AgentRuntime;
use crate::server::router;
use crate::tools::guard::UrlGuard;
use crate::tools::{ToolCtx, ToolRegistry};
use crate::trace::Tracer;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Serve a local-backend agent on an ephemeral port; returns its base URL.
async fn spawn_agent(name: &str) -> String {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let mut env = test_env(port);
    env.name = name.to_string();
    let runtime = AgentRuntime::initialize(env).await;
    let app = router(runtime, CancellationToken::new());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://127.0.0.1:{}", port)
}

fn ctx() -> ToolCtx {
    ToolCtx {
        http: reqwest::Client::new(),
        guard: Arc::new(UrlGuard::new(
            vec!["localhost".to_string(), "127.0.0.1".to_string()],
            1024,
            65535,
        )),
        peers: Arc::new(PeerRegistry::new()),
        tracer: Arc::new(Tracer::disabled()),
        trace_id: crate::trace::new_trace_id(),
        parent_span_id: crate::trace::new_span_id(),
        http_timeout: Duration::from_secs(5),
        discovery_timeout: Duration::from_secs(5),
        api_key: None,
    }
}

#[tokio::test]
async fn query_agent_returns_the_peer_response() {
    let url = spawn_agent("downstream").await;
    let registry = ToolRegistry::with_a2a_tools();

    let outcome = registry
        .invoke(
            "query_agent",
            json!({ "agent_url": url, "query": "hello over a2a" }),
            ctx(),
        )
        .await;
    assert!(!outcome.is_error, "got: {}", outcome.text);
    assert!(outcome.text.contains("hello over a2a"));
}

#[tokio::test]
async fn query_agent_propagates_session_continuity() {
    let url = spawn_agent("memory").await;
    let registry = ToolRegistry::with_a2a_tools();

    registry
        .invoke(
            "query_agent",
            json!({ "agent_url": url, "query": "My name is Alice", "session_id": "hop-1" }),
            ctx(),
        )
        .await;
    let outcome = registry
        .invoke(
            "query_agent",
            json!({ "agent_url": url, "query": "What is my name?", "session_id": "hop-1" }),
            ctx(),
        )
        .await;
    assert!(outcome.text.contains("Alice"), "got: {}", outcome.text);
}

#[tokio::test]
async fn discover_agent_summarizes_the_card() {
    let url = spawn_agent("weather").await;
    let registry = ToolRegistry::with_a2a_tools();

    let outcome = registry
        .invoke("discover_agent", json!({ "agent_url": url }), ctx())
        .await;
    assert!(!outcome.is_error, "got: {}", outcome.text);
    assert!(outcome.text.contains("weather"));
    assert!(outcome.text.contains(&url));
}

#[tokio::test]
async fn blocked_hosts_never_get_a_request() {
    let registry = ToolRegistry::with_a2a_tools();
    let outcome = registry
        .invoke(
            "query_agent",
            json!({ "agent_url": "http://10.0.0.5:9000", "query": "x" }),
            ctx(),
        )
        .await;
    assert!(outcome.is_error);
    assert!(outcome.text.contains("target rejected"), "got: {}", outcome.text);
    assert!(outcome.text.contains("10.0.0.5"));
}

#[tokio::test]
async fn out_of_range_port_is_rejected() {
    let registry = ToolRegistry::with_a2a_tools();
    let outcome = registry
        .invoke(
            "query_agent",
            json!({ "agent_url": "http://127.0.0.1:80", "query": "x" }),
            ctx(),
        )
        .await;
    assert!(outcome.is_error);
    assert!(outcome.text.contains("port"), "got: {}", outcome.text);
}

#[tokio::test]
async fn missing_arguments_are_tool_errors() {
    let registry = ToolRegistry::with_a2a_tools();
    let outcome = registry.invoke("query_agent", json!({ "query": "x" }), ctx()).await;
    assert!(outcome.is_error);
    assert!(outcome.text.contains("agent_url"));
}

#[tokio::test]
async fn unknown_tool_is_an_error_outcome() {
    let registry = ToolRegistry::with_a2a_tools();
    let outcome = registry.invoke("fly_to_moon", json!({}), ctx()).await;
    assert!(outcome.is_error);
    assert!(outcome.text.contains("unknown tool"));
}

#[tokio::test]
async fn trace_context_reaches_the_downstream_agent() {
    // downstream writes spans; our call carries an explicit trace id that
    // must appear in its exported records
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let dir = tempfile::TempDir::new().unwrap();
    let mut env = test_env(port);
    env.name = "traced".to_string();
    env.otel_enabled = true;
    env.trace_dir = dir.path().display().to_string();
    let runtime = AgentRuntime::initialize(env).await;
    let app = router(runtime, CancellationToken::new());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let url = format!("http://127.0.0.1:{}", port);

    let call_ctx = ctx();
    let trace_id = call_ctx.trace_id.clone();
    let registry = ToolRegistry::with_a2a_tools();
    let outcome = registry
        .invoke(
            "query_agent",
            json!({ "agent_url": url, "query": "hello" }),
            call_ctx,
        )
        .await;
    assert!(!outcome.is_error, "got: {}", outcome.text);

    let text = std::fs::read_to_string(
        dir.path().join("job-test").join("spans.jsonl"),
    )
    .unwrap();
    assert!(text.contains(&trace_id), "downstream spans lost the trace id");
}
