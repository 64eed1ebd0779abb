// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topology-to-plan resolution.
//!
//! [`resolve`] is a pure function: the same [`JobDefinition`] always yields a
//! byte-identical [`DeploymentPlan`]. Ordered containers (`BTreeMap`,
//! `BTreeSet`, declaration-ordered stage vectors) carry that guarantee.

use crate::id::AgentName;
use crate::job::JobDefinition;
use crate::topology::Topology;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;

/// Errors from plan resolution. Validation in `muster-jobfile` catches most
/// of these earlier; the resolver still refuses to produce a broken plan.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("topology produces no deployment stages")]
    EmptyPlan,
    #[error("dependency cycle involving agent '{0}'")]
    Cycle(AgentName),
    #[error("topology references unknown agent '{0}'")]
    UnknownAgent(AgentName),
    #[error("agent '{agent}' targets unsupported runner '{kind}'")]
    UnsupportedTarget { agent: AgentName, kind: String },
}

/// Ordered stages plus per-agent URL and connection sets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentPlan {
    /// Agents in one inner vec launch concurrently; stage *k+1* waits for
    /// stage *k* to be fully healthy.
    pub stages: Vec<Vec<AgentName>>,
    /// Base URL per agent, resolved from its target.
    pub urls: BTreeMap<AgentName, String>,
    /// URLs each agent is permitted and expected to call.
    pub connections: BTreeMap<AgentName, BTreeSet<String>>,
    /// Union of hosts across all URLs, for SSRF allow-list propagation.
    pub allowed_hosts: BTreeSet<String>,
}

impl DeploymentPlan {
    /// Stage index an agent launches in, if it is part of the plan.
    pub fn stage_of(&self, id: &AgentName) -> Option<usize> {
        self.stages.iter().position(|s| s.contains(id))
    }

    pub fn agent_count(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }
}

/// Resolve a job definition into its deployment plan.
pub fn resolve(def: &JobDefinition) -> Result<DeploymentPlan, PlanError> {
    let mut urls = BTreeMap::new();
    for agent in &def.agents {
        if !agent.target.is_supported() {
            return Err(PlanError::UnsupportedTarget {
                agent: agent.id.clone(),
                kind: agent.target.to_string(),
            });
        }
        urls.insert(
            agent.id.clone(),
            format!("http://{}:{}", agent.target.url_host(), agent.config.port),
        );
    }

    let url_of = |id: &AgentName| -> Result<String, PlanError> {
        urls.get(id).cloned().ok_or_else(|| PlanError::UnknownAgent(id.clone()))
    };

    let mut stages: Vec<Vec<AgentName>> = Vec::new();
    let mut connections: BTreeMap<AgentName, BTreeSet<String>> = BTreeMap::new();
    for agent in &def.agents {
        connections.insert(agent.id.clone(), BTreeSet::new());
    }
    let mut connect = |from: &AgentName, to: &AgentName| -> Result<(), PlanError> {
        let url = url_of(to)?;
        connections.entry(from.clone()).or_default().insert(url);
        Ok(())
    };

    match &def.topology {
        Topology::HubSpoke { hub, spokes } => {
            url_of(hub)?;
            if !spokes.is_empty() {
                stages.push(spokes.clone());
            }
            stages.push(vec![hub.clone()]);
            for spoke in spokes {
                connect(hub, spoke)?;
            }
        }
        Topology::Pipeline { stages: entries } => {
            for entry in entries {
                stages.push(entry.members().to_vec());
            }
            for pair in entries.windows(2) {
                for from in pair[0].members() {
                    for to in pair[1].members() {
                        connect(from, to)?;
                    }
                }
            }
            // url_of above only runs for connected stages; a single-entry
            // pipeline still needs its reference checked
            for entry in entries {
                for id in entry.members() {
                    url_of(id)?;
                }
            }
        }
        Topology::Dag { edges } => {
            let mut outgoing: HashMap<&AgentName, Vec<&AgentName>> = HashMap::new();
            let mut order: Vec<&AgentName> = Vec::new();
            let mut seen: BTreeSet<&AgentName> = BTreeSet::new();
            for edge in edges {
                url_of(&edge.from)?;
                if seen.insert(&edge.from) {
                    order.push(&edge.from);
                }
                for to in edge.to.members() {
                    url_of(to)?;
                    if seen.insert(to) {
                        order.push(to);
                    }
                    outgoing.entry(&edge.from).or_default().push(to);
                    connect(&edge.from, to)?;
                }
            }
            let levels = sink_distance_levels(&order, &outgoing)?;
            let depth = levels.values().max().copied().unwrap_or(0);
            for level in 0..=depth {
                // declaration order within a generation
                let members: Vec<AgentName> = def
                    .agents
                    .iter()
                    .filter(|a| levels.get(&a.id) == Some(&level))
                    .map(|a| a.id.clone())
                    .collect();
                if !members.is_empty() {
                    stages.push(members);
                }
            }
        }
        Topology::Mesh { members } => {
            if !members.is_empty() {
                stages.push(members.clone());
            }
            for from in members {
                url_of(from)?;
                for to in members {
                    if from != to {
                        connect(from, to)?;
                    }
                }
            }
        }
        Topology::Hierarchical { root, levels } => {
            url_of(root)?;
            for level in levels.iter().rev() {
                if !level.is_empty() {
                    stages.push(level.clone());
                }
            }
            stages.push(vec![root.clone()]);
            if let Some(first) = levels.first() {
                for child in first {
                    connect(root, child)?;
                }
            }
            for pair in levels.windows(2) {
                for parent in &pair[0] {
                    for child in &pair[1] {
                        connect(parent, child)?;
                    }
                }
            }
        }
    }

    // Agents declared but not referenced by the topology launch with the
    // first stage; nothing connects to them so ordering is free.
    let placed: BTreeSet<&AgentName> = stages.iter().flatten().collect();
    let unplaced: Vec<AgentName> =
        def.agents.iter().filter(|a| !placed.contains(&a.id)).map(|a| a.id.clone()).collect();
    if !unplaced.is_empty() {
        match stages.first_mut() {
            Some(first) => first.extend(unplaced),
            None => stages.push(unplaced),
        }
    }

    if stages.is_empty() || stages.iter().all(Vec::is_empty) {
        return Err(PlanError::EmptyPlan);
    }

    let mut allowed_hosts: BTreeSet<String> = BTreeSet::new();
    for agent in &def.agents {
        let host = agent.target.url_host();
        allowed_hosts.insert(host.to_string());
        if host == "127.0.0.1" {
            allowed_hosts.insert("localhost".to_string());
        }
    }
    allowed_hosts.extend(def.deployment.network.allowed_hosts.iter().cloned());

    Ok(DeploymentPlan { stages, urls, connections, allowed_hosts })
}

/// Longest-path distance from each node to a sink, or a cycle error.
///
/// Sinks (no outgoing edges) get level 0 and deploy first; an edge source is
/// always one level above its farthest target, which keeps every connection
/// target in an earlier stage than its caller.
fn sink_distance_levels<'a>(
    order: &[&'a AgentName],
    outgoing: &HashMap<&'a AgentName, Vec<&'a AgentName>>,
) -> Result<BTreeMap<AgentName, usize>, PlanError> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Visiting,
        Done(usize),
    }

    fn visit<'a>(
        node: &'a AgentName,
        outgoing: &HashMap<&'a AgentName, Vec<&'a AgentName>>,
        marks: &mut HashMap<&'a AgentName, Mark>,
    ) -> Result<usize, PlanError> {
        match marks.get(node) {
            Some(Mark::Done(level)) => return Ok(*level),
            Some(Mark::Visiting) => return Err(PlanError::Cycle(node.clone())),
            None => {}
        }
        marks.insert(node, Mark::Visiting);
        let mut level = 0;
        if let Some(targets) = outgoing.get(node) {
            for target in targets {
                level = level.max(1 + visit(target, outgoing, marks)?);
            }
        }
        marks.insert(node, Mark::Done(level));
        Ok(level)
    }

    let mut marks: HashMap<&AgentName, Mark> = HashMap::new();
    let mut levels = BTreeMap::new();
    for node in order {
        let level = visit(node, outgoing, &mut marks)?;
        levels.insert((*node).clone(), level);
    }
    Ok(levels)
}

#[cfg(test)]
#[path = "plan_tests.rs"]
mod tests;
