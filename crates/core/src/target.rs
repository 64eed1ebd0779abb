// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Where an agent process runs.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_ssh_port() -> u16 {
    22
}

fn default_interpreter() -> String {
    "python3".to_string()
}

/// Launch target for a single agent.
///
/// Only `Localhost` and `Remote` are executable; `Container` and `Kubernetes`
/// parse so job files stay forward-compatible, but validation rejects them
/// until a runner exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Target {
    Localhost,
    Remote {
        host: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ssh_key: Option<PathBuf>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        password: Option<String>,
        #[serde(default = "default_ssh_port")]
        port: u16,
        /// Interpreter used when launching module-style agents remotely.
        #[serde(default = "default_interpreter")]
        python: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        workdir: Option<String>,
    },
    Container {
        image: String,
    },
    Kubernetes {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        namespace: Option<String>,
    },
}

impl Default for Target {
    fn default() -> Self {
        Target::Localhost
    }
}

impl Target {
    /// Host as it appears in the agent's base URL.
    pub fn url_host(&self) -> &str {
        match self {
            Target::Localhost => "127.0.0.1",
            Target::Remote { host, .. } => host,
            Target::Container { .. } | Target::Kubernetes { .. } => "",
        }
    }

    /// Key used for port-conflict grouping: agents sharing this key share a
    /// port namespace.
    pub fn host_key(&self) -> &str {
        match self {
            Target::Localhost => "localhost",
            Target::Remote { host, .. } => host,
            Target::Container { .. } => "container",
            Target::Kubernetes { .. } => "kubernetes",
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Target::Remote { .. })
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, Target::Localhost | Target::Remote { .. })
    }
}

crate::simple_display! {
    Target {
        Localhost => "localhost",
        Remote { .. } => "remote",
        Container { .. } => "container",
        Kubernetes { .. } => "kubernetes",
    }
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
