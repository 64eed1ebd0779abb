// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent process environment composition.
//!
//! Deterministic: derived variables first, then the job overlay, then the
//! agent overlay; later entries override earlier ones when the runner
//! applies them in order.

use indexmap::IndexMap;
use muster_core::{envvars, AgentConfig, DeploymentPlan, JobDefinition, JobId};

/// Compose the full environment for one agent launch.
pub fn compose_agent_env(
    def: &JobDefinition,
    plan: &DeploymentPlan,
    agent: &AgentConfig,
    job_id: &JobId,
) -> Vec<(String, String)> {
    let mut env: IndexMap<String, String> = IndexMap::new();

    env.insert(envvars::AGENT_PORT.to_string(), agent.config.port.to_string());
    env.insert(envvars::AGENT_NAME.to_string(), agent.display_name().to_string());
    env.insert(envvars::AGENT_ID.to_string(), agent.id.to_string());
    env.insert(envvars::AGENT_JOB_ID.to_string(), job_id.to_string());
    env.insert(envvars::AGENT_TYPE.to_string(), agent.agent_type.clone());

    let connected: Vec<&str> = plan
        .connections
        .get(&agent.id)
        .map(|urls| urls.iter().map(String::as_str).collect())
        .unwrap_or_default();
    env.insert(envvars::CONNECTED_AGENTS.to_string(), connected.join(","));

    let hosts: Vec<&str> = plan.allowed_hosts.iter().map(String::as_str).collect();
    env.insert(envvars::AGENT_ALLOWED_HOSTS.to_string(), hosts.join(","));
    env.insert(
        envvars::AGENT_MIN_PORT.to_string(),
        def.deployment.network.min_port.to_string(),
    );
    env.insert(
        envvars::AGENT_MAX_PORT.to_string(),
        def.deployment.network.max_port.to_string(),
    );

    for (key, value) in &def.environment {
        env.insert(key.clone(), value.clone());
    }
    for (key, value) in &agent.environment {
        env.insert(key.clone(), value.clone());
    }

    env.into_iter().collect()
}

#[cfg(test)]
#[path = "envcompose_tests.rs"]
mod tests;
