// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process tools exposed to the backend.
//!
//! Tools never raise into the LLM flow: every failure becomes a
//! [`ToolOutcome`] with `is_error=true` that the model can react to.

pub mod a2a;
pub mod guard;

use crate::peers::PeerRegistry;
use crate::trace::Tracer;
use futures_util::future::BoxFuture;
use guard::UrlGuard;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Result of one tool execution, fed back to the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutcome {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutcome {
    pub fn ok(text: impl Into<String>) -> Self {
        ToolOutcome { text: text.into(), is_error: false }
    }

    pub fn error(text: impl Into<String>) -> Self {
        ToolOutcome { text: text.into(), is_error: true }
    }
}

/// Declarative description handed to the backend's tool API.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the tool input.
    pub schema: Value,
}

/// Per-query context threaded into every tool call.
#[derive(Clone)]
pub struct ToolCtx {
    pub http: reqwest::Client,
    pub guard: Arc<UrlGuard>,
    pub peers: Arc<PeerRegistry>,
    pub tracer: Arc<Tracer>,
    pub trace_id: String,
    pub parent_span_id: String,
    pub http_timeout: Duration,
    pub discovery_timeout: Duration,
    /// Key forwarded as `X-API-Key` on outbound A2A calls.
    pub api_key: Option<String>,
}

type ToolHandler = Arc<dyn Fn(Value, ToolCtx) -> BoxFuture<'static, ToolOutcome> + Send + Sync>;

/// Registered tools, iterated in registration-stable (sorted) order.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, (ToolSpec, ToolHandler)>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        spec: ToolSpec,
        handler: impl Fn(Value, ToolCtx) -> BoxFuture<'static, ToolOutcome> + Send + Sync + 'static,
    ) {
        self.tools.insert(spec.name.clone(), (spec, Arc::new(handler)));
    }

    /// The allowed-tool list sent to the backend.
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|(spec, _)| spec.clone()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a tool; unknown names come back as error outcomes.
    pub async fn invoke(&self, name: &str, input: Value, ctx: ToolCtx) -> ToolOutcome {
        match self.tools.get(name) {
            Some((_, handler)) => handler(input, ctx).await,
            None => ToolOutcome::error(format!("unknown tool '{}'", name)),
        }
    }

    /// The standard registry every agent gets: the A2A transport tools.
    pub fn with_a2a_tools() -> Self {
        let mut registry = Self::new();
        a2a::register(&mut registry);
        registry
    }
}
