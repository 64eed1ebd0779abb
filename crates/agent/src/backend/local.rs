// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic offline backend.
//!
//! No network, no model: answers from simple rules over the conversation
//! history, honoring an explicit delegation syntax so smoke deployments and
//! tests can exercise the full tool path:
//!
//! - `ask <url> <question>` invokes the `query_agent` tool against `<url>`
//! - `describe <url>` invokes `discover_agent`
//! - "what is my name" style questions answer from a remembered
//!   "my name is X" turn in the session history
//! - anything else echoes

use super::{Backend, BackendError, BackendMessage, QueryInput};
use crate::session::{Role, SessionMessage};
use crate::tools::{ToolCtx, ToolRegistry};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

pub struct LocalBackend;

impl LocalBackend {
    pub fn new() -> Self {
        LocalBackend
    }
}

impl Default for LocalBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the remembered name from a "my name is X" turn.
fn remembered_name(history: &[SessionMessage]) -> Option<String> {
    for message in history.iter().rev() {
        if message.role != Role::User {
            continue;
        }
        let lower = message.text.to_lowercase();
        if let Some(idx) = lower.find("my name is ") {
            let rest = &message.text[idx + "my name is ".len()..];
            let name: String = rest
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
                .collect();
            if !name.is_empty() {
                return Some(name);
            }
        }
    }
    None
}

/// `ask <url> <question>` or `describe <url>`.
fn parse_directive(query: &str) -> Option<(&'static str, serde_json::Value)> {
    let trimmed = query.trim();
    if let Some(rest) = trimmed.strip_prefix("ask ") {
        let mut parts = rest.splitn(2, ' ');
        let url = parts.next()?.trim();
        let question = parts.next().unwrap_or("").trim();
        if url.starts_with("http") && !question.is_empty() {
            return Some(("query_agent", json!({ "agent_url": url, "query": question })));
        }
    }
    if let Some(rest) = trimmed.strip_prefix("describe ") {
        let url = rest.trim();
        if url.starts_with("http") {
            return Some(("discover_agent", json!({ "agent_url": url })));
        }
    }
    None
}

#[async_trait]
impl Backend for LocalBackend {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn query(
        &self,
        input: QueryInput,
        tools: Arc<ToolRegistry>,
        ctx: ToolCtx,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<BackendMessage>, BackendError> {
        let (tx, rx) = mpsc::channel(16);
        tokio::spawn(async move {
            let query = input
                .history
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.text.clone())
                .unwrap_or_default();

            let final_text = if let Some((tool, args)) = parse_directive(&query) {
                if tx
                    .send(BackendMessage::ToolInvocation { name: tool.to_string(), input: args.clone() })
                    .await
                    .is_err()
                {
                    return;
                }
                let outcome = tokio::select! {
                    _ = cancel.cancelled() => return,
                    outcome = tools.invoke(tool, args.clone(), ctx) => outcome,
                };
                let _ = tx
                    .send(BackendMessage::ToolResult {
                        name: tool.to_string(),
                        input: args,
                        result: outcome.text.clone(),
                        is_error: outcome.is_error,
                    })
                    .await;
                if outcome.is_error {
                    format!("The connected agent could not help: {}", outcome.text)
                } else {
                    outcome.text
                }
            } else if query.to_lowercase().contains("what is my name")
                || query.to_lowercase().contains("what's my name")
            {
                match remembered_name(&input.history) {
                    Some(name) => format!("Your name is {}.", name),
                    None => "I don't know your name yet.".to_string(),
                }
            } else {
                format!("You said: {}", query)
            };

            if tx
                .send(BackendMessage::AssistantText { text: final_text.clone() })
                .await
                .is_err()
            {
                return;
            }
            let _ = tx.send(BackendMessage::Done { final_text }).await;
        });
        Ok(rx)
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
