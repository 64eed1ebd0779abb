// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment variable contract between the orchestrator and agent processes.
//!
//! The orchestrator composes these for every launched agent; `muster-agent`
//! reads them back at startup. Keeping the names in one place prevents the
//! two sides from drifting.

/// TCP port the agent's HTTP server binds.
pub const AGENT_PORT: &str = "AGENT_PORT";
/// Display name used in logs, health responses, and the agent card.
pub const AGENT_NAME: &str = "AGENT_NAME";
/// The agent's id within the job.
pub const AGENT_ID: &str = "AGENT_ID";
/// Id of the deployed job this agent belongs to.
pub const AGENT_JOB_ID: &str = "AGENT_JOB_ID";
/// Registered agent class selecting base prompt and domain tools.
pub const AGENT_TYPE: &str = "AGENT_TYPE";

/// Comma-joined base URLs of the agents this one may talk to.
pub const CONNECTED_AGENTS: &str = "CONNECTED_AGENTS";
/// Comma-joined hosts permitted as outbound A2A targets.
pub const AGENT_ALLOWED_HOSTS: &str = "AGENT_ALLOWED_HOSTS";
/// Lower bound of the permitted outbound port range.
pub const AGENT_MIN_PORT: &str = "AGENT_MIN_PORT";
/// Upper bound of the permitted outbound port range.
pub const AGENT_MAX_PORT: &str = "AGENT_MAX_PORT";

/// Backend variant: `anthropic`, `openai`, or `local`.
pub const AGENT_BACKEND_TYPE: &str = "AGENT_BACKEND_TYPE";
/// Model id passed to the selected backend.
pub const AGENT_MODEL: &str = "AGENT_MODEL";
/// Provider base URL override (openai-compatible gateways, test servers).
pub const AGENT_BACKEND_BASE_URL: &str = "AGENT_BACKEND_BASE_URL";
/// Provider API key for the LLM backend.
pub const AGENT_BACKEND_API_KEY: &str = "AGENT_BACKEND_API_KEY";

/// API key required by `/query` when auth is enabled.
pub const AGENT_API_KEY: &str = "AGENT_API_KEY";
/// Set to `true` to require `X-API-Key` on non-open endpoints.
pub const AGENT_AUTH_REQUIRED: &str = "AGENT_AUTH_REQUIRED";

/// Wall-clock budget for one query or outbound A2A call.
pub const AGENT_HTTP_TIMEOUT: &str = "AGENT_HTTP_TIMEOUT";
/// Budget for one discovery fetch.
pub const AGENT_DISCOVERY_TIMEOUT: &str = "AGENT_DISCOVERY_TIMEOUT";
/// Maximum concurrent in-flight queries before the server returns 429.
pub const AGENT_MAX_INFLIGHT: &str = "AGENT_MAX_INFLIGHT";

pub const AGENT_LOG_LEVEL: &str = "AGENT_LOG_LEVEL";
pub const AGENT_LOG_JSON: &str = "AGENT_LOG_JSON";
pub const AGENT_LOG_MAX_CONTENT_LENGTH: &str = "AGENT_LOG_MAX_CONTENT_LENGTH";

pub const AGENT_OTEL_ENABLED: &str = "AGENT_OTEL_ENABLED";
pub const AGENT_OTEL_ENDPOINT: &str = "AGENT_OTEL_ENDPOINT";
pub const AGENT_OTEL_PROTOCOL: &str = "AGENT_OTEL_PROTOCOL";
pub const AGENT_OTEL_SERVICE_NAME: &str = "AGENT_OTEL_SERVICE_NAME";
/// Directory the span exporter writes `traces/<job_id>/spans.jsonl` under.
pub const AGENT_TRACE_DIR: &str = "AGENT_TRACE_DIR";

pub const AGENT_MAX_SESSIONS: &str = "AGENT_MAX_SESSIONS";
pub const AGENT_SESSION_TTL: &str = "AGENT_SESSION_TTL";
pub const AGENT_MAX_HISTORY: &str = "AGENT_MAX_HISTORY";
