// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenAI-compatible chat-completions backend.
//!
//! Also serves gemini-style and self-hosted gateways that speak the same
//! wire format; point `AGENT_BACKEND_BASE_URL` at the compatible endpoint.

use super::{Backend, BackendError, BackendMessage, QueryInput};
use crate::session::Role;
use crate::tools::{ToolCtx, ToolRegistry};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_TURNS: usize = 16;

pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Self {
        OpenAiBackend {
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
                    "type": "function",
                    "function": {
                        "name": spec.name,
                        "description": spec.description,
                        "parameters": spec.schema,
                    }
                })
            })
            .collect()
    }

    async fn call(&self, messages: &[Value], tool_defs: &[Value]) -> Result<Value, BackendError> {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
        });
        if !tool_defs.is_empty() {
            body["tools"] = Value::Array(tool_defs.to_vec());
        }

        let response = self
            .client
            .post(format!(
                "{}/chat/completions",
                self.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.api_key)
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
impl Backend for OpenAiBackend {
    fn kind(&self) -> &'static str {
        "openai"
    }

    async fn query(
        &self,
        input: QueryInput,
        tools: Arc<ToolRegistry>,
        ctx: ToolCtx,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<BackendMessage>, BackendError> {
        let (tx, rx) = mpsc::channel(16);

        let mut messages: Vec<Value> =
            vec![json!({ "role": "system", "content": input.system_prompt })];
        messages.extend(input.history.iter().map(|m| {
            json!({
                "role": match m.role { Role::User => "user", Role::Assistant => "assistant" },
                "content": m.text,
            })
        }));
        let tool_defs = Self::tool_defs(&tools);

        let this = OpenAiBackend {
            client: self.client.clone(),
            api_key: self.api_key.clone(),
            model: self.model.clone(),
            base_url: self.base_url.clone(),
        };
        tokio::spawn(async move {
            for _turn in 0..MAX_TURNS {
                let response = tokio::select! {
                    _ = cancel.cancelled() => return,
                    r = this.call(&messages, &tool_defs) => r,
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

                let Some(message) = response
                    .get("choices")
                    .and_then(Value::as_array)
                    .and_then(|choices| choices.first())
                    .and_then(|choice| choice.get("message"))
                    .cloned()
                else {
                    let _ = tx
                        .send(BackendMessage::Failed {
                            error: "response carried no choices".to_string(),
                        })
                        .await;
                    return;
                };

                let tool_calls = message
                    .get("tool_calls")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                if tool_calls.is_empty() {
                    let text = message
                        .get("content")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    if !text.is_empty() {
                        let _ = tx
                            .send(BackendMessage::AssistantText { text: text.clone() })
                            .await;
                    }
                    let _ = tx.send(BackendMessage::Done { final_text: text }).await;
                    return;
                }

                messages.push(message.clone());
                for call in &tool_calls {
                    let call_id = call
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let name = call
                        .get("function")
                        .and_then(|f| f.get("name"))
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let args: Value = call
                        .get("function")
                        .and_then(|f| f.get("arguments"))
                        .and_then(Value::as_str)
                        .and_then(|raw| serde_json::from_str(raw).ok())
                        .unwrap_or(Value::Null);

                    let _ = tx
                        .send(BackendMessage::ToolInvocation {
                            name: name.clone(),
                            input: args.clone(),
                        })
                        .await;
                    let outcome = tokio::select! {
                        _ = cancel.cancelled() => return,
                        o = tools.invoke(&name, args.clone(), ctx.clone()) => o,
                    };
                    let _ = tx
                        .send(BackendMessage::ToolResult {
                            name,
                            input: args,
                            result: outcome.text.clone(),
                            is_error: outcome.is_error,
                        })
                        .await;
                    messages.push(json!({
                        "role": "tool",
                        "tool_call_id": call_id,
                        "content": outcome.text,
                    }));
                }
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
