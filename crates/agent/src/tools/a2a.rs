// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A2A transport tools: `query_agent` and `discover_agent`.
//!
//! Both validate the target URL against the outbound guard, record an `a2a`
//! span, and propagate trace context downstream via `traceparent`.

use super::{ToolCtx, ToolOutcome, ToolRegistry, ToolSpec};
use crate::card::AgentCard;
use crate::trace::{SpanStatus, TraceParent};
use serde_json::{json, Value};

/// Header carrying the caller's API key across agent hops.
pub const API_KEY_HEADER: &str = "X-API-Key";

pub fn register(registry: &mut ToolRegistry) {
    registry.register(
        ToolSpec {
            name: "query_agent".to_string(),
            description: "Send a natural-language query to a connected agent and return its \
                          response. Use the agent URLs listed in your system prompt."
                .to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "agent_url": {"type": "string", "description": "Base URL of the target agent"},
                    "query": {"type": "string", "description": "The question to ask"},
                    "session_id": {"type": "string", "description": "Optional session to continue"}
                },
                "required": ["agent_url", "query"]
            }),
        },
        |input, ctx| Box::pin(query_agent(input, ctx)),
    );
    registry.register(
        ToolSpec {
            name: "discover_agent".to_string(),
            description: "Fetch a connected agent's capability card (name, description, skills)."
                .to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "agent_url": {"type": "string", "description": "Base URL of the target agent"}
                },
                "required": ["agent_url"]
            }),
        },
        |input, ctx| Box::pin(discover_agent(input, ctx)),
    );
}

fn str_arg<'a>(input: &'a Value, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

async fn query_agent(input: Value, ctx: ToolCtx) -> ToolOutcome {
    let Some(agent_url) = str_arg(&input, "agent_url") else {
        return ToolOutcome::error("query_agent requires an 'agent_url' argument");
    };
    let Some(query) = str_arg(&input, "query") else {
        return ToolOutcome::error("query_agent requires a 'query' argument");
    };
    let session_id = str_arg(&input, "session_id");

    let mut span = ctx.tracer.start_span(
        "a2a",
        "query_agent",
        Some(&ctx.trace_id),
        Some(&ctx.parent_span_id),
    );
    span.set_attr("target.url", agent_url);

    let url = match ctx.guard.validate(agent_url) {
        Ok(url) => url,
        Err(e) => {
            span.set_attr("status", "blocked");
            ctx.tracer.finish(span, SpanStatus::Error);
            return ToolOutcome::error(format!("target rejected: {}", e));
        }
    };
    if let Some(card) = ctx.peers.by_url(agent_url) {
        span.set_attr("target.name", card.name.as_str());
    }

    let endpoint = format!("{}/query", url.as_str().trim_end_matches('/'));
    let mut body = json!({ "query": query });
    if let Some(session_id) = session_id {
        body["session_id"] = Value::String(session_id.to_string());
    }

    let mut request = ctx
        .http
        .post(&endpoint)
        .timeout(ctx.http_timeout)
        .header(
            "traceparent",
            TraceParent::format(&ctx.trace_id, span.span_id()),
        )
        .json(&body);
    if let Some(key) = &ctx.api_key {
        request = request.header(API_KEY_HEADER, key);
    }
    span.set_attr("trace.propagated", true);

    let started = std::time::Instant::now();
    let outcome = match request.send().await {
        Ok(response) if response.status().is_success() => {
            match response.json::<Value>().await {
                Ok(json) => match json.get("response").and_then(Value::as_str) {
                    Some(text) => ToolOutcome::ok(text),
                    None => ToolOutcome::error("agent response had no 'response' field"),
                },
                Err(e) => ToolOutcome::error(format!("invalid JSON from agent: {}", e)),
            }
        }
        Ok(response) => {
            ToolOutcome::error(format!("agent returned HTTP {}", response.status().as_u16()))
        }
        Err(e) if e.is_timeout() => {
            ToolOutcome::error(format!("agent did not answer within {:?}", ctx.http_timeout))
        }
        Err(e) => ToolOutcome::error(format!("request failed: {}", e)),
    };

    span.set_attr("duration_ms", started.elapsed().as_millis() as u64);
    span.set_attr("status", if outcome.is_error { "error" } else { "ok" });
    let status = if outcome.is_error { SpanStatus::Error } else { SpanStatus::Ok };
    ctx.tracer.finish(span, status);
    outcome
}

async fn discover_agent(input: Value, ctx: ToolCtx) -> ToolOutcome {
    let Some(agent_url) = str_arg(&input, "agent_url") else {
        return ToolOutcome::error("discover_agent requires an 'agent_url' argument");
    };

    let mut span = ctx.tracer.start_span(
        "a2a",
        "discover_agent",
        Some(&ctx.trace_id),
        Some(&ctx.parent_span_id),
    );
    span.set_attr("target.url", agent_url);

    let url = match ctx.guard.validate(agent_url) {
        Ok(url) => url,
        Err(e) => {
            span.set_attr("status", "blocked");
            ctx.tracer.finish(span, SpanStatus::Error);
            return ToolOutcome::error(format!("target rejected: {}", e));
        }
    };

    let endpoint = format!(
        "{}/.well-known/agent-configuration",
        url.as_str().trim_end_matches('/')
    );
    let started = std::time::Instant::now();
    let outcome = match ctx
        .http
        .get(&endpoint)
        .timeout(ctx.discovery_timeout)
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => {
            match response.json::<AgentCard>().await {
                Ok(card) => {
                    span.set_attr("target.name", card.name.as_str());
                    ToolOutcome::ok(card.summary())
                }
                Err(e) => ToolOutcome::error(format!("invalid agent card: {}", e)),
            }
        }
        Ok(response) => {
            ToolOutcome::error(format!("agent returned HTTP {}", response.status().as_u16()))
        }
        Err(e) => ToolOutcome::error(format!("discovery failed: {}", e)),
    };

    span.set_attr("duration_ms", started.elapsed().as_millis() as u64);
    span.set_attr("status", if outcome.is_error { "error" } else { "ok" });
    let status = if outcome.is_error { SpanStatus::Error } else { SpanStatus::Ok };
    ctx.tracer.finish(span, status);
    outcome
}

#[cfg(test)]
#[path = "a2a_tests.rs"]
mod tests;
