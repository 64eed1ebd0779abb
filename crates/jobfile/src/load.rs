// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job file parsing and serialization.

use crate::issue::{Issue, IssueKind};
use crate::substitute::substitute_env;
use crate::validate::validate;
use indexmap::IndexMap;
use muster_core::{
    AgentConfig, DeploymentOptions, ExecutionOptions, JobDefinition, Topology,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading a job file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("unresolved environment variables: {}", .0.join(", "))]
    UnresolvedVars(Vec<String>),
    #[error("job definition is invalid ({} error(s))", .issues.iter().filter(|i| i.is_fatal()).count())]
    Invalid { issues: Vec<Issue> },
}

impl LoadError {
    /// All issues carried by this error, empty for IO/parse failures.
    pub fn issues(&self) -> &[Issue] {
        match self {
            LoadError::Invalid { issues } => issues,
            _ => &[],
        }
    }
}

/// On-disk document shape: a `job` metadata block beside the agent list.
#[derive(Serialize, Deserialize)]
struct RawJobFile {
    job: RawJobMeta,
    agents: Vec<AgentConfig>,
    topology: Topology,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    deployment: Option<DeploymentOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    execution: Option<ExecutionOptions>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    environment: IndexMap<String, String>,
    #[serde(flatten, skip_serializing_if = "IndexMap::is_empty")]
    unknown: IndexMap<String, serde_yaml::Value>,
}

#[derive(Serialize, Deserialize)]
struct RawJobMeta {
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tags: Vec<String>,
    #[serde(flatten, skip_serializing_if = "IndexMap::is_empty")]
    unknown: IndexMap<String, serde_yaml::Value>,
}

/// Load and validate a job file, applying `${VAR}` substitution.
///
/// Non-fatal issues are logged; any error-severity issue fails the load with
/// the complete issue list.
pub fn load(path: &Path) -> Result<JobDefinition, LoadError> {
    let text = std::fs::read_to_string(path)
        .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
    let (def, warnings) = load_str(&text)?;
    for warning in &warnings {
        tracing::warn!(job = %def.name, "{}", warning);
    }
    Ok(def)
}

/// Load from text, returning the definition plus non-fatal warnings.
pub fn load_str(text: &str) -> Result<(JobDefinition, Vec<Issue>), LoadError> {
    let substituted = substitute_env(text).map_err(LoadError::UnresolvedVars)?;
    let raw: RawJobFile = serde_yaml::from_str(&substituted)?;

    let mut issues: Vec<Issue> = Vec::new();
    for key in raw.unknown.keys() {
        issues.push(Issue::warning(
            key.clone(),
            IssueKind::UnknownKey,
            format!("unknown top-level key '{}'", key),
        ));
    }
    for key in raw.job.unknown.keys() {
        issues.push(Issue::warning(
            format!("job.{}", key),
            IssueKind::UnknownKey,
            format!("unknown key '{}' in job block", key),
        ));
    }

    let def = JobDefinition {
        name: raw.job.name,
        version: raw.job.version,
        description: raw.job.description,
        tags: raw.job.tags,
        agents: raw.agents,
        topology: raw.topology,
        deployment: raw.deployment.unwrap_or_default(),
        execution: raw.execution.unwrap_or_default(),
        environment: raw.environment,
    };

    issues.extend(validate(&def));
    if issues.iter().any(Issue::is_fatal) {
        return Err(LoadError::Invalid { issues });
    }
    Ok((def, issues))
}

/// Serialize a definition back to job-file YAML.
///
/// `load(dump(def))` yields a definition equal to `def` for any definition
/// that loads cleanly.
pub fn dump(def: &JobDefinition) -> Result<String, LoadError> {
    let raw = RawJobFile {
        job: RawJobMeta {
            name: def.name.clone(),
            version: def.version.clone(),
            description: def.description.clone(),
            tags: def.tags.clone(),
            unknown: IndexMap::new(),
        },
        agents: def.agents.clone(),
        topology: def.topology.clone(),
        deployment: Some(def.deployment.clone()),
        execution: Some(def.execution.clone()),
        environment: def.environment.clone(),
        unknown: IndexMap::new(),
    };
    Ok(serde_yaml::to_string(&raw)?)
}

#[cfg(test)]
#[path = "load_tests.rs"]
mod tests;
