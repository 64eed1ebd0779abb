// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the agent process.
//!
//! The orchestrator composes these variables (`muster_core::envvars`); this
//! module reads them back with defaults matching the documented contract.

use muster_core::{envvars, parse_duration};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{name} is not valid: {message}")]
    Invalid { name: &'static str, message: String },
}

/// Fully parsed agent configuration.
#[derive(Debug, Clone)]
pub struct AgentEnv {
    pub port: u16,
    pub name: String,
    pub agent_id: String,
    pub job_id: String,
    pub agent_type: String,

    pub connected_agents: Vec<String>,
    pub allowed_hosts: Vec<String>,
    pub min_port: u16,
    pub max_port: u16,

    pub backend_type: String,
    pub model: Option<String>,
    pub backend_base_url: Option<String>,
    pub backend_api_key: Option<String>,

    pub api_key: Option<String>,
    pub auth_required: bool,

    pub http_timeout: Duration,
    pub discovery_timeout: Duration,
    pub max_inflight: usize,

    pub log_max_content_length: usize,

    pub otel_enabled: bool,
    pub otel_service_name: Option<String>,
    /// Accepted for forward compatibility; spans currently export to files.
    pub otel_endpoint: Option<String>,
    pub otel_protocol: Option<String>,
    pub trace_dir: String,

    pub max_sessions: usize,
    pub session_ttl: Duration,
    pub max_history: usize,
}

impl AgentEnv {
    pub fn from_env() -> Result<Self, EnvError> {
        let port = require(envvars::AGENT_PORT)?
            .parse()
            .map_err(|e| EnvError::Invalid { name: envvars::AGENT_PORT, message: format!("{}", e) })?;
        let agent_id = var(envvars::AGENT_ID).unwrap_or_else(|| "agent".to_string());
        let name = var(envvars::AGENT_NAME).unwrap_or_else(|| agent_id.clone());

        Ok(AgentEnv {
            port,
            agent_id,
            name,
            job_id: var(envvars::AGENT_JOB_ID).unwrap_or_default(),
            agent_type: var(envvars::AGENT_TYPE).unwrap_or_else(|| "assistant".to_string()),
            connected_agents: list(envvars::CONNECTED_AGENTS),
            allowed_hosts: list(envvars::AGENT_ALLOWED_HOSTS),
            min_port: parse_or(envvars::AGENT_MIN_PORT, 1024),
            max_port: parse_or(envvars::AGENT_MAX_PORT, 65535),
            backend_type: var(envvars::AGENT_BACKEND_TYPE).unwrap_or_else(|| "local".to_string()),
            model: var(envvars::AGENT_MODEL),
            backend_base_url: var(envvars::AGENT_BACKEND_BASE_URL),
            backend_api_key: var(envvars::AGENT_BACKEND_API_KEY),
            api_key: var(envvars::AGENT_API_KEY),
            auth_required: bool_var(envvars::AGENT_AUTH_REQUIRED),
            http_timeout: duration_or(envvars::AGENT_HTTP_TIMEOUT, Duration::from_secs(30)),
            discovery_timeout: duration_or(
                envvars::AGENT_DISCOVERY_TIMEOUT,
                Duration::from_secs(10),
            ),
            max_inflight: parse_or(envvars::AGENT_MAX_INFLIGHT, 16),
            log_max_content_length: parse_or(envvars::AGENT_LOG_MAX_CONTENT_LENGTH, 500),
            otel_enabled: bool_var(envvars::AGENT_OTEL_ENABLED),
            otel_service_name: var(envvars::AGENT_OTEL_SERVICE_NAME),
            otel_endpoint: var(envvars::AGENT_OTEL_ENDPOINT),
            otel_protocol: var(envvars::AGENT_OTEL_PROTOCOL),
            trace_dir: var(envvars::AGENT_TRACE_DIR).unwrap_or_else(|| "traces".to_string()),
            max_sessions: parse_or(envvars::AGENT_MAX_SESSIONS, 1000),
            session_ttl: duration_or(envvars::AGENT_SESSION_TTL, Duration::from_secs(3600)),
            max_history: parse_or(envvars::AGENT_MAX_HISTORY, 100),
        })
    }

    /// Base URL peers use to reach this agent.
    pub fn self_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn require(name: &'static str) -> Result<String, EnvError> {
    var(name).ok_or(EnvError::Missing(name))
}

fn list(name: &str) -> Vec<String> {
    var(name)
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    var(name).and_then(|s| s.parse().ok()).unwrap_or(default)
}

fn bool_var(name: &str) -> bool {
    matches!(var(name).as_deref(), Some("1" | "true" | "yes" | "on"))
}

/// Seconds (bare number) or suffixed duration string.
fn duration_or(name: &str, default: Duration) -> Duration {
    var(name).and_then(|s| parse_duration(&s).ok()).unwrap_or(default)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
