// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the offline backend

use super::*;
use crate::peers::PeerRegistry;
use crate::tools::guard::UrlGuard;
use crate::trace::Tracer;
use std::time::Duration;

fn test_ctx() -> ToolCtx {
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
        http_timeout: Duration::from_millis(500),
        discovery_timeout: Duration::from_millis(500),
        api_key: None,
    }
}

fn history(turns: &[(Role, &str)]) -> Vec<SessionMessage> {
    turns
        .iter()
        .enumerate()
        .map(|(i, (role, text))| SessionMessage {
            role: *role,
            text: text.to_string(),
            timestamp_ms: i as u64,
        })
        .collect()
}

async fn drain(mut rx: mpsc::Receiver<BackendMessage>) -> Vec<BackendMessage> {
    let mut out = Vec::new();
    while let Some(message) = rx.recv().await {
        out.push(message);
    }
    out
}

async fn run(history_turns: &[(Role, &str)]) -> Vec<BackendMessage> {
    let backend = LocalBackend::new();
    let rx = backend
        .query(
            QueryInput {
                system_prompt: "You are a test agent.".to_string(),
                history: history(history_turns),
            },
            Arc::new(ToolRegistry::with_a2a_tools()),
            test_ctx(),
            CancellationToken::new(),
        )
        .await
        .unwrap();
    drain(rx).await
}

fn final_text(messages: &[BackendMessage]) -> String {
    match messages.last() {
        Some(BackendMessage::Done { final_text }) => final_text.clone(),
        other => panic!("expected Done, got {:?}", other),
    }
}

#[tokio::test]
async fn echoes_plain_queries() {
    let messages = run(&[(Role::User, "hello there")]).await;
    assert_eq!(final_text(&messages), "You said: hello there");
}

#[tokio::test]
async fn remembers_names_from_history() {
    let messages = run(&[
        (Role::User, "My name is Alice"),
        (Role::Assistant, "Hello Alice"),
        (Role::User, "What is my name?"),
    ])
    .await;
    assert!(final_text(&messages).contains("Alice"));
}

#[tokio::test]
async fn fresh_session_does_not_know_names() {
    let messages = run(&[(Role::User, "What is my name?")]).await;
    let text = final_text(&messages);
    assert!(!text.contains("Alice"));
    assert!(text.contains("don't know"));
}

#[tokio::test]
async fn ask_directive_invokes_query_agent_tool() {
    // target is allowed but nothing listens; the tool error must flow back
    // as a ToolResult, never a failure of the whole query
    let messages =
        run(&[(Role::User, "ask http://127.0.0.1:19999 what is the forecast")]).await;

    assert!(matches!(
        &messages[0],
        BackendMessage::ToolInvocation { name, .. } if name == "query_agent"
    ));
    match &messages[1] {
        BackendMessage::ToolResult { name, is_error, .. } => {
            assert_eq!(name, "query_agent");
            assert!(is_error);
        }
        other => panic!("expected ToolResult, got {:?}", other),
    }
    // outer query still completes
    assert!(matches!(messages.last(), Some(BackendMessage::Done { .. })));
}

#[tokio::test]
async fn blocked_target_is_a_tool_error_not_a_query_failure() {
    let messages = run(&[(Role::User, "ask http://10.0.0.5:9000 anything")]).await;
    match &messages[1] {
        BackendMessage::ToolResult { result, is_error, .. } => {
            assert!(is_error);
            assert!(result.contains("target rejected"), "got: {}", result);
        }
        other => panic!("expected ToolResult, got {:?}", other),
    }
    assert!(matches!(messages.last(), Some(BackendMessage::Done { .. })));
}
