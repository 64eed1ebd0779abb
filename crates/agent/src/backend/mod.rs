// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM backend abstraction.
//!
//! A [`BackendConfig`] is built once at startup (key and model resolution);
//! every query constructs a **fresh** backend client from it. Reusing a
//! client across queries is forbidden: provider-side connection state leaked
//! between calls in the original system and produced truncated responses.

pub mod anthropic;
pub mod local;
pub mod openai;

use crate::env::AgentEnv;
use crate::session::SessionMessage;
use crate::tools::{ToolCtx, ToolRegistry};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend '{kind}' requires an API key (set AGENT_BACKEND_API_KEY)")]
    MissingApiKey { kind: &'static str },
    #[error("provider returned HTTP {status}: {message}")]
    Provider { status: u16, message: String },
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider response violated the tool-call protocol: {0}")]
    Protocol(String),
    #[error("query cancelled")]
    Cancelled,
}

/// One element of a backend's streamed response.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendMessage {
    AssistantText { text: String },
    ToolInvocation { name: String, input: Value },
    ToolResult { name: String, input: Value, result: String, is_error: bool },
    SystemInfo { message: String },
    Done { final_text: String },
    Failed { error: String },
}

/// Everything a backend needs for one invocation.
pub struct QueryInput {
    pub system_prompt: String,
    /// Conversation history, most recent user message last.
    pub history: Vec<SessionMessage>,
}

/// A single-use backend client. Dropped after one query.
#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Run the full agentic loop (model calls plus tool execution) and
    /// stream messages as they happen. The final message is always `Done`
    /// or `Failed`.
    async fn query(
        &self,
        input: QueryInput,
        tools: Arc<ToolRegistry>,
        ctx: ToolCtx,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<BackendMessage>, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Anthropic,
    OpenAi,
    Local,
}

muster_core::simple_display! {
    BackendKind {
        Anthropic => "anthropic",
        OpenAi => "openai",
        Local => "local",
    }
}

/// Cached per-process backend configuration; resolves auth and model once.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    kind: BackendKind,
    model: String,
    base_url: Option<String>,
    api_key: Option<String>,
}

impl BackendConfig {
    pub fn from_env(env: &AgentEnv) -> Self {
        let kind = match env.backend_type.to_ascii_lowercase().as_str() {
            "anthropic" | "claude" => BackendKind::Anthropic,
            "openai" | "gemini" | "openai-compatible" => BackendKind::OpenAi,
            "local" => BackendKind::Local,
            other => {
                tracing::warn!(backend = other, "unknown backend type, falling back to 'local'");
                BackendKind::Local
            }
        };
        let model = env.model.clone().unwrap_or_else(|| default_model(kind).to_string());
        BackendConfig {
            kind,
            model,
            base_url: env.backend_base_url.clone(),
            api_key: env.backend_api_key.clone(),
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Construct the single-use client for one query.
    ///
    /// Dispatch is strictly by the configured kind; each query gets its own
    /// HTTP client so no provider connection state survives a call.
    pub fn fresh(&self) -> Result<Box<dyn Backend>, BackendError> {
        match self.kind {
            BackendKind::Local => Ok(Box::new(local::LocalBackend::new())),
            BackendKind::Anthropic => {
                let key = self
                    .api_key
                    .clone()
                    .ok_or(BackendError::MissingApiKey { kind: "anthropic" })?;
                Ok(Box::new(anthropic::AnthropicBackend::new(
                    key,
                    self.model.clone(),
                    self.base_url.clone(),
                )))
            }
            BackendKind::OpenAi => {
                let key = self
                    .api_key
                    .clone()
                    .ok_or(BackendError::MissingApiKey { kind: "openai" })?;
                Ok(Box::new(openai::OpenAiBackend::new(
                    key,
                    self.model.clone(),
                    self.base_url.clone(),
                )))
            }
        }
    }
}

fn default_model(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Anthropic => "claude-sonnet-4-5",
        BackendKind::OpenAi => "gpt-4o-mini",
        BackendKind::Local => "offline",
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
