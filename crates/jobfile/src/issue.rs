// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation findings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One concrete problem found in a job definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Dotted path into the document, e.g. `agents[1].config.port`.
    pub path: String,
    pub kind: IssueKind,
    pub message: String,
    pub severity: Severity,
}

impl Issue {
    pub fn error(path: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Issue { path: path.into(), kind, message: message.into(), severity: Severity::Error }
    }

    pub fn warning(path: impl Into<String>, kind: IssueKind, message: impl Into<String>) -> Self {
        Issue { path: path.into(), kind, message: message.into(), severity: Severity::Warning }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} [{}]: {}", self.severity, self.path, self.kind, self.message)
    }
}

/// Classified validation rule families; each maps to one rule in the loader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Schema,
    NoAgents,
    DuplicateAgent,
    PortConflict,
    PortRange,
    UnknownReference,
    Cycle,
    LevelMembership,
    Ssh,
    UnsupportedTarget,
    UnknownKey,
    Unreferenced,
    EntryPoint,
}

muster_core::simple_display! {
    IssueKind {
        Schema => "schema",
        NoAgents => "no_agents",
        DuplicateAgent => "duplicate_agent",
        PortConflict => "port_conflict",
        PortRange => "port_range",
        UnknownReference => "unknown_reference",
        Cycle => "cycle",
        LevelMembership => "level_membership",
        Ssh => "ssh",
        UnsupportedTarget => "unsupported_target",
        UnknownKey => "unknown_key",
        Unreferenced => "unreferenced",
        EntryPoint => "entry_point",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

muster_core::simple_display! {
    Severity {
        Error => "error",
        Warning => "warning",
    }
}
