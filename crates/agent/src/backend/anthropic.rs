// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Anthropic messages-API backend with native tool use.

use super::{Backend, BackendError, BackendMessage, QueryInput};
use crate::session::Role;
use crate::tools::{ToolCtx, ToolRegistry};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
/// Upper bound on model round-trips within one query.
const MAX_TURNS: usize = 16;

pub struct AnthropicBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicBackend {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Self {
        AnthropicBackend {
            client: reqwest::Client::new(),
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn tool_defs(tools: &ToolRegistry) -> Vec<Value> {
        tools
            .specs()
            .iter()
            .map(|spec| {
                json!({
                    "name": spec.name,
                    "description": spec.description,
                    "input_schema": spec.schema,
                })
            })
            .collect()
    }

    async fn call(
        &self,
        system: &str,
        messages: &[Value],
        tool_defs: &[Value],
    ) -> Result<Value, BackendError> {
        let mut body = json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "system": system,
            "messages": messages,
        });
        if !tool_defs.is_empty() {
            body["tools"] = Value::Array(tool_defs.to_vec());
        }

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Provider {
                status: status.as_u16(),
                message: muster_core::short(&message, 500).to_string(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Backend for AnthropicBackend {
    fn kind(&self) -> &'static str {
        "anthropic"
    }

    async fn query(
        &self,
        input: QueryInput,
        tools: Arc<ToolRegistry>,
        ctx: ToolCtx,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<BackendMessage>, BackendError> {
        let (tx, rx) = mpsc::channel(16);

        let mut messages: Vec<Value> = input
            .history
            .iter()
            .map(|m| {
                json!({
                    "role": match m.role { Role::User => "user", Role::Assistant => "assistant" },
                    "content": m.text,
                })
            })
            .collect();
        let tool_defs = Self::tool_defs(&tools);
        let system = input.system_prompt;

        let this = AnthropicBackend {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
        };
        tokio::spawn(async move {
            let mut final_text = String::new();
            for _turn in 0..MAX_TURNS {
                let response = tokio::select! {
                    _ = cancel.cancelled() => return,
                    r = this.call(&system, &messages, &tool_defs) => r,
                };
                let response = match response {
                    Ok(response) => response,
                    Err(e) => {
                        let _ = tx.send(BackendMessage::Failed { error: e.to_string() }).await;
                        return;
                    }
                };

                if let Some(usage) = response.get("usage") {
                    let _ = tx
                        .send(BackendMessage::SystemInfo { message: format!("usage {}", usage) })
                        .await;
                }

                let content = response
                    .get("content")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let stop_reason =
                    response.get("stop_reason").and_then(Value::as_str).unwrap_or("end_turn");

                let mut tool_results: Vec<Value> = Vec::new();
                for block in &content {
                    match block.get("type").and_then(Value::as_str) {
                        Some("text") => {
                            let text =
                                block.get("text").and_then(Value::as_str).unwrap_or_default();
                            final_text = text.to_string();
                            let _ = tx
                                .send(BackendMessage::AssistantText { text: text.to_string() })
                                .await;
                        }
                        Some("tool_use") => {
                            let name = block
                                .get("name")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string();
                            let tool_input =
                                block.get("input").cloned().unwrap_or(Value::Null);
                            let tool_use_id = block
                                .get("id")
                                .and_then(Value::as_str)
                                .unwrap_or_default()
                                .to_string();
                            let _ = tx
                                .send(BackendMessage::ToolInvocation {
                                    name: name.clone(),
                                    input: tool_input.clone(),
                                })
                                .await;

                            let outcome = tokio::select! {
                                _ = cancel.cancelled() => return,
                                o = tools.invoke(&name, tool_input.clone(), ctx.clone()) => o,
                            };
                            let _ = tx
                                .send(BackendMessage::ToolResult {
                                    name,
                                    input: tool_input,
                                    result: outcome.text.clone(),
                                    is_error: outcome.is_error,
                                })
                                .await;
                            tool_results.push(json!({
                                "type": "tool_result",
                                "tool_use_id": tool_use_id,
                                "content": outcome.text,
                                "is_error": outcome.is_error,
                            }));
                        }
                        _ => {}
                    }
                }

                if stop_reason == "tool_use" && !tool_results.is_empty() {
                    messages.push(json!({ "role": "assistant", "content": content }));
                    messages.push(json!({ "role": "user", "content": tool_results }));
                    continue;
                }

                let _ = tx.send(BackendMessage::Done { final_text }).await;
                return;
            }
            let _ = tx
                .send(BackendMessage::Failed {
                    error: format!("tool loop exceeded {} turns", MAX_TURNS),
                })
                .await;
        });
        Ok(rx)
    }
}
