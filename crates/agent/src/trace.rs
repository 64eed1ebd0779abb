// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Span recording and cross-agent trace propagation.
//!
//! Spans serialize one JSON object per line into
//! `<trace_dir>/<job_id>/spans.jsonl`; each line is written with a single
//! append so concurrent agents on one filesystem interleave whole records.
//! Trace context crosses agent hops as a W3C `traceparent` header, so a
//! multi-agent query reconstructs by joining on `trace_id`.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// 16-byte trace id as 32 lowercase hex chars.
pub fn new_trace_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// 8-byte span id as 16 lowercase hex chars.
pub fn new_span_id() -> String {
    let id = uuid::Uuid::new_v4();
    let bytes = id.as_bytes();
    let mut out = String::with_capacity(16);
    for b in &bytes[..8] {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Parsed W3C `traceparent` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceParent {
    pub trace_id: String,
    pub parent_span_id: String,
}

impl TraceParent {
    /// `00-<32 hex>-<16 hex>-<flags>`; other versions are accepted as long
    /// as the id fields are well-formed.
    pub fn parse(header: &str) -> Option<Self> {
        let mut parts = header.trim().split('-');
        let _version = parts.next()?;
        let trace_id = parts.next()?;
        let span_id = parts.next()?;
        if trace_id.len() != 32 || !trace_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        if span_id.len() != 16 || !span_id.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        if trace_id.chars().all(|c| c == '0') {
            return None;
        }
        Some(TraceParent {
            trace_id: trace_id.to_ascii_lowercase(),
            parent_span_id: span_id.to_ascii_lowercase(),
        })
    }

    pub fn format(trace_id: &str, span_id: &str) -> String {
        format!("00-{}-{}-01", trace_id, span_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Ok,
    Error,
}

/// One exported span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    pub trace_id: String,
    pub span_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    pub name: String,
    pub kind: String,
    pub start_time_ns: u64,
    pub end_time_ns: u64,
    pub status: SpanStatus,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SpanEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    pub time_ns: u64,
}

/// A span that has started but not yet been exported.
#[derive(Debug)]
pub struct ActiveSpan {
    record: SpanRecord,
    started: Instant,
}

impl ActiveSpan {
    pub fn trace_id(&self) -> &str {
        &self.record.trace_id
    }

    pub fn span_id(&self) -> &str {
        &self.record.span_id
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<Value>) {
        self.record.attributes.insert(key.to_string(), value.into());
    }

    pub fn add_event(&mut self, name: &str) {
        self.record.events.push(SpanEvent { name: name.to_string(), time_ns: epoch_ns() });
    }
}

fn epoch_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Span factory and exporter for one agent process.
pub struct Tracer {
    enabled: bool,
    service_name: String,
    out_path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl Tracer {
    /// Export into `<trace_dir>/<job_id>/spans.jsonl`; `enabled=false` keeps
    /// span construction working but drops every record.
    pub fn new(enabled: bool, service_name: &str, trace_dir: &str, job_id: &str) -> Self {
        let out_path = if enabled && !job_id.is_empty() {
            Some(PathBuf::from(trace_dir).join(job_id).join("spans.jsonl"))
        } else {
            None
        };
        Tracer {
            enabled,
            service_name: service_name.to_string(),
            out_path,
            write_lock: Mutex::new(()),
        }
    }

    pub fn disabled() -> Self {
        Self::new(false, "", "", "")
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Begin a span; a missing `trace_id` starts a fresh trace.
    pub fn start_span(
        &self,
        kind: &str,
        name: &str,
        trace_id: Option<&str>,
        parent_span_id: Option<&str>,
    ) -> ActiveSpan {
        let mut attributes = BTreeMap::new();
        if !self.service_name.is_empty() {
            attributes.insert(
                "service.name".to_string(),
                Value::String(self.service_name.clone()),
            );
        }
        ActiveSpan {
            record: SpanRecord {
                trace_id: trace_id.map(str::to_string).unwrap_or_else(new_trace_id),
                span_id: new_span_id(),
                parent_span_id: parent_span_id.map(str::to_string),
                name: name.to_string(),
                kind: kind.to_string(),
                start_time_ns: epoch_ns(),
                end_time_ns: 0,
                status: SpanStatus::Ok,
                attributes,
                events: Vec::new(),
            },
            started: Instant::now(),
        }
    }

    /// Close and export the span.
    pub fn finish(&self, mut span: ActiveSpan, status: SpanStatus) {
        span.record.status = status;
        span.record.end_time_ns =
            span.record.start_time_ns + span.started.elapsed().as_nanos() as u64;
        self.export(&span.record);
    }

    fn export(&self, record: &SpanRecord) {
        let Some(path) = &self.out_path else {
            return;
        };
        let Ok(mut line) = serde_json::to_string(record) else {
            return;
        };
        line.push('\n');

        let _guard = self.write_lock.lock();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let result = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| f.write_all(line.as_bytes()));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "span export failed");
        }
    }
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
