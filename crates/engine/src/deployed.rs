// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live state of a deployed job.

use muster_core::{AgentName, DeployState, DeploymentPlan, JobDefinition, JobId};
use muster_runner::{RunHandle, StartSpec};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Which runner started an agent (and must stop or restart it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunnerKind {
    Local,
    Ssh,
}

muster_core::simple_display! {
    RunnerKind {
        Local => "local",
        Ssh => "ssh",
    }
}

/// Last observed status of one agent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Starting,
    Healthy,
    Unreachable,
    Restarting,
    Failed,
    Stopped,
}

muster_core::simple_display! {
    AgentStatus {
        Starting => "starting",
        Healthy => "healthy",
        Unreachable => "unreachable",
        Restarting => "restarting",
        Failed => "failed",
        Stopped => "stopped",
    }
}

/// Everything the orchestrator and monitor hold about one running agent.
#[derive(Debug, Clone)]
pub struct AgentRuntimeHandle {
    pub agent_id: AgentName,
    pub url: String,
    pub runner: RunnerKind,
    pub run: RunHandle,
    /// Spec used to start the process; reused verbatim for restarts.
    pub spec: StartSpec,
    pub last_status: AgentStatus,
    pub restart_count: u32,
    pub exit_code: Option<i32>,
}

/// The live, mutable representation of one deployed job.
///
/// Owned by the orchestrator; the health monitor mutates agent handles
/// through the shared map, never the identity fields.
#[derive(Clone, Debug)]
pub struct DeployedJob {
    pub job_id: JobId,
    pub definition: JobDefinition,
    pub plan: DeploymentPlan,
    pub agents: Arc<Mutex<BTreeMap<AgentName, AgentRuntimeHandle>>>,
    /// Agents in the order they actually started; teardown walks it reversed.
    pub start_order: Vec<AgentName>,
    pub start_time_ms: u64,
    pub state: DeployState,
}

impl DeployedJob {
    pub fn status_of(&self, id: &AgentName) -> Option<AgentStatus> {
        self.agents.lock().get(id).map(|a| a.last_status)
    }

    pub fn set_status(&self, id: &AgentName, status: AgentStatus) {
        if let Some(agent) = self.agents.lock().get_mut(id) {
            agent.last_status = status;
        }
    }
}
