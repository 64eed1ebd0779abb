// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for backend selection and dispatch

use super::*;
use std::time::Duration;

fn env_with_backend(backend_type: &str, api_key: Option<&str>) -> AgentEnv {
    AgentEnv {
        port: 9001,
        name: "test".to_string(),
        agent_id: "test".to_string(),
        job_id: "job-1".to_string(),
        agent_type: "assistant".to_string(),
        connected_agents: vec![],
        allowed_hosts: vec![],
        min_port: 1024,
        max_port: 65535,
        backend_type: backend_type.to_string(),
        model: None,
        backend_base_url: None,
        backend_api_key: api_key.map(str::to_string),
        api_key: None,
        auth_required: false,
        http_timeout: Duration::from_secs(30),
        discovery_timeout: Duration::from_secs(10),
        max_inflight: 16,
        log_max_content_length: 500,
        otel_enabled: false,
        otel_service_name: None,
        otel_endpoint: None,
        otel_protocol: None,
        trace_dir: "traces".to_string(),
        max_sessions: 100,
        session_ttl: Duration::from_secs(3600),
        max_history: 50,
    }
}

#[yare::parameterized(
    anthropic = { "anthropic", BackendKind::Anthropic },
    claude_alias = { "claude", BackendKind::Anthropic },
    openai = { "openai", BackendKind::OpenAi },
    gemini_alias = { "gemini", BackendKind::OpenAi },
    local = { "local", BackendKind::Local },
    case_insensitive = { "ANTHROPIC", BackendKind::Anthropic },
)]
fn backend_type_selects_kind(value: &str, expected: BackendKind) {
    let config = BackendConfig::from_env(&env_with_backend(value, Some("k")));
    assert_eq!(config.kind(), expected);
}

#[test]
fn unknown_backend_falls_back_to_local() {
    let config = BackendConfig::from_env(&env_with_backend("hal9000", None));
    assert_eq!(config.kind(), BackendKind::Local);
}

#[yare::parameterized(
    anthropic = { "anthropic", "anthropic" },
    openai = { "openai", "openai" },
    local = { "local", "local" },
)]
fn fresh_client_dispatches_to_the_configured_backend(value: &str, expected_kind: &str) {
    // regression guard: the dispatcher must route by configuration, never
    // hard-code one implementation
    let config = BackendConfig::from_env(&env_with_backend(value, Some("k")));
    let client = config.fresh().unwrap();
    assert_eq!(client.kind(), expected_kind);
}

#[test]
fn each_fresh_call_builds_a_new_client() {
    let config = BackendConfig::from_env(&env_with_backend("anthropic", Some("k")));
    let a = config.fresh().unwrap();
    let b = config.fresh().unwrap();
    let a_ptr = std::ptr::addr_of!(*a) as *const () as usize;
    let b_ptr = std::ptr::addr_of!(*b) as *const () as usize;
    assert_ne!(a_ptr, b_ptr, "fresh() must never hand back a shared client");
}

#[yare::parameterized(
    anthropic = { "anthropic" },
    openai = { "openai" },
)]
fn hosted_backends_require_an_api_key(value: &str) {
    let config = BackendConfig::from_env(&env_with_backend(value, None));
    assert!(matches!(config.fresh(), Err(BackendError::MissingApiKey { .. })));
}

#[test]
fn model_override_is_respected() {
    let mut env = env_with_backend("anthropic", Some("k"));
    env.model = Some("claude-haiku-4-5".to_string());
    let config = BackendConfig::from_env(&env);
    assert_eq!(config.model(), "claude-haiku-4-5");
}

#[test]
fn default_models_per_kind() {
    assert_eq!(
        BackendConfig::from_env(&env_with_backend("anthropic", Some("k"))).model(),
        "claude-sonnet-4-5"
    );
    assert_eq!(BackendConfig::from_env(&env_with_backend("local", None)).model(), "offline");
}
