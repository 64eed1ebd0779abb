// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for agent environment parsing

use super::*;
use muster_core::envvars;
use serial_test::serial;

fn clear_agent_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("AGENT_") || key == "CONNECTED_AGENTS" {
            std::env::remove_var(key);
        }
    }
}

#[test]
#[serial]
fn port_is_required() {
    clear_agent_env();
    assert!(matches!(AgentEnv::from_env(), Err(EnvError::Missing(_))));
}

#[test]
#[serial]
fn minimal_env_gets_defaults() {
    clear_agent_env();
    std::env::set_var(envvars::AGENT_PORT, "9001");
    let env = AgentEnv::from_env().unwrap();

    assert_eq!(env.port, 9001);
    assert_eq!(env.agent_id, "agent");
    assert_eq!(env.name, "agent");
    assert_eq!(env.backend_type, "local");
    assert_eq!(env.http_timeout, Duration::from_secs(30));
    assert_eq!(env.discovery_timeout, Duration::from_secs(10));
    assert_eq!(env.max_sessions, 1000);
    assert_eq!(env.max_history, 100);
    assert!(!env.auth_required);
    assert!(env.connected_agents.is_empty());
    assert_eq!(env.self_url(), "http://127.0.0.1:9001");
    clear_agent_env();
}

#[test]
#[serial]
fn lists_split_on_commas_and_trim() {
    clear_agent_env();
    std::env::set_var(envvars::AGENT_PORT, "9001");
    std::env::set_var(
        "CONNECTED_AGENTS",
        "http://127.0.0.1:9002, http://127.0.0.1:9003 ,",
    );
    std::env::set_var(envvars::AGENT_ALLOWED_HOSTS, "localhost,127.0.0.1");
    let env = AgentEnv::from_env().unwrap();

    assert_eq!(
        env.connected_agents,
        ["http://127.0.0.1:9002", "http://127.0.0.1:9003"]
    );
    assert_eq!(env.allowed_hosts, ["localhost", "127.0.0.1"]);
    clear_agent_env();
}

#[test]
#[serial]
fn timeouts_accept_suffixed_durations() {
    clear_agent_env();
    std::env::set_var(envvars::AGENT_PORT, "9001");
    std::env::set_var(envvars::AGENT_HTTP_TIMEOUT, "90s");
    std::env::set_var(envvars::AGENT_SESSION_TTL, "5m");
    let env = AgentEnv::from_env().unwrap();

    assert_eq!(env.http_timeout, Duration::from_secs(90));
    assert_eq!(env.session_ttl, Duration::from_secs(300));
    clear_agent_env();
}

#[test]
#[serial]
fn auth_flag_parses_truthy_values() {
    clear_agent_env();
    std::env::set_var(envvars::AGENT_PORT, "9001");
    std::env::set_var(envvars::AGENT_AUTH_REQUIRED, "true");
    assert!(AgentEnv::from_env().unwrap().auth_required);
    std::env::set_var(envvars::AGENT_AUTH_REQUIRED, "0");
    assert!(!AgentEnv::from_env().unwrap().auth_required);
    clear_agent_env();
}
