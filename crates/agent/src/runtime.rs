// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The per-query pipeline.
//!
//! Session load, fresh backend client, streamed message handling with span
//! recording, session persistence. Queries are independent: no shared
//! mutable state beyond the session store, and a wall-clock budget bounds
//! the whole exchange.

use crate::backend::{BackendConfig, BackendError, BackendMessage, QueryInput};
use crate::card::AgentCard;
use crate::classes::{self, AgentClass};
use crate::env::AgentEnv;
use crate::peers::PeerRegistry;
use crate::session::{Role, SessionStore};
use crate::tools::guard::UrlGuard;
use crate::tools::{ToolCtx, ToolRegistry};
use crate::trace::{ActiveSpan, SpanStatus, TraceParent, Tracer};
use muster_core::SystemClock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub context: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query exceeded the {0:?} budget")]
    Timeout(Duration),
    #[error("query was cancelled")]
    Cancelled,
    #[error("{0}")]
    BadInput(String),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("backend failed: {0}")]
    BackendFailed(String),
}

impl QueryError {
    /// Machine-readable kind for the error body.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Timeout(_) => "timeout",
            QueryError::Cancelled => "cancelled",
            QueryError::BadInput(_) => "bad_input",
            QueryError::Backend(_) | QueryError::BackendFailed(_) => "backend",
        }
    }
}

/// Everything one agent process holds after startup.
pub struct AgentRuntime {
    env: AgentEnv,
    class: AgentClass,
    card: AgentCard,
    system_prompt: String,
    pub sessions: SessionStore<SystemClock>,
    peers: Arc<PeerRegistry>,
    tools: Arc<ToolRegistry>,
    tracer: Arc<Tracer>,
    backend: BackendConfig,
    http: reqwest::Client,
    guard: Arc<UrlGuard>,
    /// In-flight query cap; excess requests get 429.
    pub inflight: Arc<Semaphore>,
}

impl AgentRuntime {
    /// Build the runtime: tool registry, backend config, peer discovery,
    /// and system-prompt synthesis.
    pub async fn initialize(env: AgentEnv) -> Arc<Self> {
        let class = classes::lookup(&env.agent_type);
        let mut tools = ToolRegistry::with_a2a_tools();
        (class.register_tools)(&mut tools);

        let service_name = env
            .otel_service_name
            .clone()
            .unwrap_or_else(|| env.name.clone());
        let tracer = Arc::new(Tracer::new(
            env.otel_enabled,
            &service_name,
            &env.trace_dir,
            &env.job_id,
        ));

        let http = reqwest::Client::new();
        let peers = Arc::new(PeerRegistry::new());
        if !env.connected_agents.is_empty() {
            peers
                .discover_all(&http, &env.connected_agents, env.discovery_timeout)
                .await;
        }
        let system_prompt = peers.render_prompt(class.base_prompt);

        let card = AgentCard {
            name: env.name.clone(),
            description: class.description.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            url: env.self_url(),
            capabilities: Default::default(),
            skills: (class.skills)(),
        };

        if env.auth_required && env.api_key.is_none() {
            tracing::warn!("AGENT_AUTH_REQUIRED is set without AGENT_API_KEY; all queries will be rejected");
        }
        if let Some(endpoint) = &env.otel_endpoint {
            tracing::info!(endpoint = %endpoint, "OTLP export is not wired; spans go to the trace directory");
        }

        let guard = Arc::new(UrlGuard::new(
            env.allowed_hosts.clone(),
            env.min_port,
            env.max_port,
        ));
        let sessions = SessionStore::new(
            SystemClock,
            env.max_sessions,
            env.session_ttl,
            env.max_history,
        );
        let inflight = Arc::new(Semaphore::new(env.max_inflight.max(1)));

        Arc::new(AgentRuntime {
            backend: BackendConfig::from_env(&env),
            env,
            class,
            card,
            system_prompt,
            sessions,
            peers,
            tools: Arc::new(tools),
            tracer,
            http,
            guard,
            inflight,
        })
    }

    pub fn name(&self) -> &str {
        &self.env.name
    }

    pub fn port(&self) -> u16 {
        self.env.port
    }

    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn class_name(&self) -> &str {
        self.class.type_name
    }

    /// Constant-time API key check; open when auth is disabled.
    pub fn auth_ok(&self, provided: Option<&str>) -> bool {
        if !self.env.auth_required {
            return true;
        }
        let (Some(expected), Some(provided)) = (self.env.api_key.as_deref(), provided) else {
            return false;
        };
        expected.as_bytes().ct_eq(provided.as_bytes()).into()
    }

    fn clip<'a>(&self, text: &'a str) -> &'a str {
        muster_core::short(text, self.env.log_max_content_length)
    }

    /// Run one query end to end.
    ///
    /// `shutdown` aborts the query when the server drains; dropping the
    /// returned future (client disconnect) cancels the backend task through
    /// the drop guard.
    pub async fn handle_query(
        &self,
        request: QueryRequest,
        traceparent: Option<TraceParent>,
        shutdown: CancellationToken,
    ) -> Result<QueryResponse, QueryError> {
        if request.query.trim().is_empty() {
            return Err(QueryError::BadInput("query must not be empty".to_string()));
        }

        let session_id = self.sessions.get_or_create(request.session_id.as_deref());
        self.sessions.append(&session_id, Role::User, &request.query);

        let (trace_id, inbound_parent) = match &traceparent {
            Some(tp) => (tp.trace_id.clone(), Some(tp.parent_span_id.clone())),
            None => (crate::trace::new_trace_id(), None),
        };
        let mut root = self.tracer.start_span(
            "query",
            "query",
            Some(&trace_id),
            inbound_parent.as_deref(),
        );
        root.set_attr("agent.name", self.env.name.as_str());
        root.set_attr("session.id", session_id.as_str());
        root.set_attr("query.length", request.query.len() as u64);

        tracing::info!(
            session = %session_id,
            trace = %trace_id,
            query = %self.clip(&request.query),
            "query received"
        );

        let cancel = shutdown.child_token();
        let _guard = cancel.clone().drop_guard();

        let result = self
            .drive_backend(&request, &session_id, &trace_id, &root, cancel.clone())
            .await;

        match &result {
            Ok(response) => {
                self.sessions.append(&session_id, Role::Assistant, &response.response);
                self.tracer.finish(root, SpanStatus::Ok);
            }
            Err(e) => {
                root.set_attr("error", e.to_string());
                self.tracer.finish(root, SpanStatus::Error);
            }
        }
        result
    }

    async fn drive_backend(
        &self,
        request: &QueryRequest,
        session_id: &str,
        trace_id: &str,
        root: &ActiveSpan,
        cancel: CancellationToken,
    ) -> Result<QueryResponse, QueryError> {
        let ctx = ToolCtx {
            http: self.http.clone(),
            guard: self.guard.clone(),
            peers: self.peers.clone(),
            tracer: self.tracer.clone(),
            trace_id: trace_id.to_string(),
            parent_span_id: root.span_id().to_string(),
            http_timeout: self.env.http_timeout,
            discovery_timeout: self.env.discovery_timeout,
            api_key: self.env.api_key.clone(),
        };

        // fresh client per query: no state survives a call
        let backend = self.backend.fresh()?;
        let history = self.sessions.history(session_id);

        let mut llm = self.tracer.start_span(
            "llm",
            "backend",
            Some(trace_id),
            Some(root.span_id()),
        );
        llm.set_attr("backend.kind", backend.kind());
        llm.set_attr("backend.model", self.backend.model());

        let mut rx = backend
            .query(
                QueryInput {
                    system_prompt: self.system_prompt.clone(),
                    history,
                },
                self.tools.clone(),
                ctx,
                cancel.clone(),
            )
            .await?;

        let deadline = tokio::time::Instant::now() + self.env.http_timeout;
        let mut tool_spans: Vec<ActiveSpan> = Vec::new();
        let outcome = loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => break Err(QueryError::Cancelled),
                message = tokio::time::timeout_at(deadline, rx.recv()) => match message {
                    Err(_) => break Err(QueryError::Timeout(self.env.http_timeout)),
                    Ok(None) => {
                        break Err(QueryError::BackendFailed(
                            "backend stream ended without a terminal message".to_string(),
                        ))
                    }
                    Ok(Some(message)) => message,
                },
            };

            match message {
                BackendMessage::AssistantText { text } => {
                    tracing::debug!(text = %self.clip(&text), "assistant text");
                    llm.add_event("assistant_text");
                }
                BackendMessage::ToolInvocation { name, input } => {
                    let mut span = self.tracer.start_span(
                        "tool",
                        &name,
                        Some(trace_id),
                        Some(llm.span_id()),
                    );
                    span.set_attr("tool.name", name.as_str());
                    span.set_attr(
                        "tool.input_length",
                        input.to_string().len() as u64,
                    );
                    tool_spans.push(span);
                }
                BackendMessage::ToolResult { name, result, is_error, .. } => {
                    tracing::info!(
                        tool = %name,
                        is_error,
                        result = %self.clip(&result),
                        "tool finished"
                    );
                    if let Some(mut span) = tool_spans.pop() {
                        span.set_attr("tool.result_length", result.len() as u64);
                        span.set_attr("tool.is_error", is_error);
                        let status = if is_error { SpanStatus::Error } else { SpanStatus::Ok };
                        self.tracer.finish(span, status);
                    }
                }
                BackendMessage::SystemInfo { message } => {
                    llm.set_attr("llm.system_info", message.as_str());
                }
                BackendMessage::Done { final_text } => {
                    break Ok(QueryResponse {
                        response: final_text,
                        session_id: session_id.to_string(),
                    });
                }
                BackendMessage::Failed { error } => {
                    break Err(QueryError::BackendFailed(error));
                }
            }
        };

        // close any tool span left open by an aborted exchange
        for span in tool_spans.drain(..) {
            self.tracer.finish(span, SpanStatus::Error);
        }
        match &outcome {
            Ok(_) => self.tracer.finish(llm, SpanStatus::Ok),
            Err(e) => {
                llm.set_attr("error", e.to_string());
                self.tracer.finish(llm, SpanStatus::Error);
            }
        }
        outcome.map(|response| {
            tracing::info!(
                session = %session_id,
                response = %self.clip(&response.response),
                "query answered"
            );
            response
        })
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
pub(crate) mod tests;
