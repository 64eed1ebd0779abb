// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definition model.
//!
//! A [`JobDefinition`] is immutable after load; `muster-jobfile` produces one
//! from YAML and `muster-engine` consumes it. Serde shapes here mirror the
//! job-file schema directly so the loader stays a thin mapping.

use crate::id::AgentName;
use crate::target::Target;
use crate::topology::Topology;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// A validated, immutable description of a multi-agent job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub agents: Vec<AgentConfig>,
    pub topology: Topology,
    #[serde(default)]
    pub deployment: DeploymentOptions,
    #[serde(default)]
    pub execution: ExecutionOptions,
    /// Global environment overlay; values may reference host env via `${VAR}`.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
}

impl JobDefinition {
    pub fn agent(&self, id: &AgentName) -> Option<&AgentConfig> {
        self.agents.iter().find(|a| &a.id == id)
    }
}

/// One agent entry in the job's `agents` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: AgentName,
    /// Logical class name; must match a registered agent class.
    #[serde(rename = "type")]
    pub agent_type: String,
    /// Load-path alias from the original dynamic loader; accepted and
    /// validated but not used to locate code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    pub config: AgentSettings,
    #[serde(default)]
    pub target: Target,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub environment: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "ResourceHints::is_empty")]
    pub resources: ResourceHints,
}

impl AgentConfig {
    pub fn display_name(&self) -> &str {
        self.id.as_str()
    }
}

/// The `config` block of an agent: a required port plus agent-specific keys.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentSettings {
    pub port: u16,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

impl AgentSettings {
    pub fn with_port(port: u16) -> Self {
        AgentSettings { port, extra: IndexMap::new() }
    }
}

/// Advisory resource hints; recorded but not enforced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

impl ResourceHints {
    pub fn is_empty(&self) -> bool {
        self.cpu.is_none() && self.memory.is_none()
    }
}

/// Launch scheduling across the resolved stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStrategy {
    /// One agent at a time, even within a stage.
    Sequential,
    /// All agents of a stage at once (stage order still applies).
    Parallel,
    /// Stage-parallel with health gates between stages.
    #[default]
    Staged,
}

crate::simple_display! {
    DeployStrategy {
        Sequential => "sequential",
        Parallel => "parallel",
        Staged => "staged",
    }
}

fn default_deploy_timeout() -> Duration {
    Duration::from_secs(60)
}

/// The `deployment` block of a job file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentOptions {
    pub strategy: DeployStrategy,
    /// Overall budget for the whole deployment.
    #[serde(with = "crate::duration::serde_duration")]
    pub timeout: Duration,
    pub health_check: HealthCheckConfig,
    pub ssh: SshDefaults,
    pub network: NetworkOptions,
}

impl Default for DeploymentOptions {
    fn default() -> Self {
        DeploymentOptions {
            strategy: DeployStrategy::default(),
            timeout: default_deploy_timeout(),
            health_check: HealthCheckConfig::default(),
            ssh: SshDefaults::default(),
            network: NetworkOptions::default(),
        }
    }
}

/// Health probing and restart policy, shared by the deploy gate and the
/// runtime monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Delay between probes.
    #[serde(with = "crate::duration::serde_duration")]
    pub interval: Duration,
    /// Budget for a single probe.
    #[serde(with = "crate::duration::serde_duration")]
    pub timeout: Duration,
    /// Consecutive failures tolerated before a state change.
    pub retries: u32,
    pub restart: RestartPolicy,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        HealthCheckConfig {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(5),
            retries: 30,
            restart: RestartPolicy::default(),
        }
    }
}

/// What the health monitor does when an agent goes unreachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestartPolicy {
    pub enabled: bool,
    pub max_restarts: u32,
    /// Base backoff; doubles per consecutive restart of the same agent.
    #[serde(with = "crate::duration::serde_duration")]
    pub backoff: Duration,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        RestartPolicy { enabled: true, max_restarts: 3, backoff: Duration::from_secs(1) }
    }
}

/// Job-level SSH defaults, overridable per remote target.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SshDefaults {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<PathBuf>,
    /// Accept previously-unseen host keys (`accept-new`). Unknown hosts are
    /// rejected unless this is set.
    pub accept_unknown_hosts: bool,
}

/// Outbound A2A constraints propagated into every agent's environment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkOptions {
    pub min_port: u16,
    pub max_port: u16,
    /// Extra hosts allowed beyond those derived from the plan.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_hosts: Vec<String>,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        NetworkOptions { min_port: 1024, max_port: 65535, allowed_hosts: Vec::new() }
    }
}

/// The `execution` block: optional default entry point for client queries.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<AgentName>,
}

/// Lifecycle state of a deployed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployState {
    Deploying,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl DeployState {
    pub fn is_terminal(self) -> bool {
        matches!(self, DeployState::Stopped | DeployState::Failed)
    }
}

crate::simple_display! {
    DeployState {
        Deploying => "deploying",
        Running => "running",
        Stopping => "stopping",
        Stopped => "stopped",
        Failed => "failed",
    }
}

crate::builder! {
    pub struct AgentConfigBuilder => AgentConfig {
        into {
            id: AgentName = "agent",
            agent_type: String = "assistant",
        }
        set {
            config: AgentSettings = AgentSettings::with_port(9000),
            target: Target = Target::Localhost,
            environment: IndexMap<String, String> = IndexMap::new(),
            resources: ResourceHints = ResourceHints::default(),
        }
        option {
            module: String = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
