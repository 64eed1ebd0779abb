// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discovery payload served at `/.well-known/agent-configuration`.

use serde::{Deserialize, Serialize};

/// Self-description one agent publishes to its peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub version: String,
    pub url: String,
    #[serde(default)]
    pub capabilities: Capabilities,
    #[serde(default)]
    pub skills: Vec<Skill>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
}

/// One advertised capability of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

impl AgentCard {
    /// One-line summary used in tool results and prompt synthesis.
    pub fn summary(&self) -> String {
        let skills: Vec<&str> = self.skills.iter().map(|s| s.name.as_str()).collect();
        if skills.is_empty() {
            format!("{} ({}): {}", self.name, self.url, self.description)
        } else {
            format!(
                "{} ({}): {} [skills: {}]",
                self.name,
                self.url,
                self.description,
                skills.join(", ")
            )
        }
    }
}
