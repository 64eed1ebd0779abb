// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job definition validation.
//!
//! Collects every issue before returning; callers decide whether warnings
//! matter. Rule order is stable so repeated runs print identically.

use crate::issue::{Issue, IssueKind};
use muster_core::{AgentName, JobDefinition, Target, Topology};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Validate a parsed definition, returning all findings.
pub fn validate(def: &JobDefinition) -> Vec<Issue> {
    let mut issues = Vec::new();

    if def.agents.is_empty() {
        issues.push(Issue::error("agents", IssueKind::NoAgents, "no agents defined"));
    }
    if def.name.is_empty() {
        issues.push(Issue::error("job.name", IssueKind::Schema, "job name must not be empty"));
    }

    check_duplicate_ids(def, &mut issues);
    check_ports(def, &mut issues);
    check_targets(def, &mut issues);
    check_topology_references(def, &mut issues);
    check_dag_cycles(def, &mut issues);
    check_hierarchy_levels(def, &mut issues);
    check_entry_point(def, &mut issues);
    check_unreferenced(def, &mut issues);

    issues
}

fn check_duplicate_ids(def: &JobDefinition, issues: &mut Vec<Issue>) {
    let mut seen: BTreeSet<&AgentName> = BTreeSet::new();
    for (i, agent) in def.agents.iter().enumerate() {
        if !seen.insert(&agent.id) {
            issues.push(Issue::error(
                format!("agents[{}].id", i),
                IssueKind::DuplicateAgent,
                format!("agent id '{}' is declared more than once", agent.id),
            ));
        }
    }
}

fn check_ports(def: &JobDefinition, issues: &mut Vec<Issue>) {
    let range = &def.deployment.network;
    let mut by_host_port: BTreeMap<(&str, u16), &AgentName> = BTreeMap::new();
    for (i, agent) in def.agents.iter().enumerate() {
        let port = agent.config.port;
        if port < range.min_port || port > range.max_port {
            issues.push(Issue::error(
                format!("agents[{}].config.port", i),
                IssueKind::PortRange,
                format!(
                    "port {} outside allowed range {}..={}",
                    port, range.min_port, range.max_port
                ),
            ));
        }
        let key = (agent.target.host_key(), port);
        match by_host_port.get(&key) {
            Some(first) => {
                issues.push(Issue::error(
                    format!("agents[{}].config.port", i),
                    IssueKind::PortConflict,
                    format!("port {} on host '{}' already used by agent '{}'", port, key.0, first),
                ));
            }
            None => {
                by_host_port.insert(key, &agent.id);
            }
        }
    }
}

fn check_targets(def: &JobDefinition, issues: &mut Vec<Issue>) {
    for (i, agent) in def.agents.iter().enumerate() {
        let path = format!("agents[{}].target", i);
        match &agent.target {
            Target::Localhost => {}
            Target::Remote { host, ssh_key, password, .. } => {
                if host.is_empty() {
                    issues.push(Issue::error(
                        format!("{}.host", path),
                        IssueKind::Ssh,
                        "remote target requires a host",
                    ));
                }
                let key = ssh_key.as_ref().or(def.deployment.ssh.key.as_ref());
                if let Some(key) = key {
                    if !key.is_file() {
                        issues.push(Issue::error(
                            format!("{}.ssh_key", path),
                            IssueKind::Ssh,
                            format!("ssh key '{}' is not readable", key.display()),
                        ));
                    }
                }
                if password.is_some() {
                    issues.push(Issue::warning(
                        format!("{}.password", path),
                        IssueKind::Ssh,
                        "password auth is not attempted non-interactively; prefer keys or an agent",
                    ));
                }
            }
            other @ (Target::Container { .. } | Target::Kubernetes { .. }) => {
                issues.push(Issue::error(
                    path,
                    IssueKind::UnsupportedTarget,
                    format!("target '{}' has no runner; only localhost and remote deploy", other),
                ));
            }
        }
    }
}

fn check_topology_references(def: &JobDefinition, issues: &mut Vec<Issue>) {
    let known: BTreeSet<&AgentName> = def.agents.iter().map(|a| &a.id).collect();
    for id in def.topology.referenced_ids() {
        if !known.contains(id) {
            issues.push(Issue::error(
                "topology",
                IssueKind::UnknownReference,
                format!("topology references unknown agent '{}'", id),
            ));
        }
    }
}

/// Kahn's algorithm over the declared edges; any remainder is a cycle.
fn check_dag_cycles(def: &JobDefinition, issues: &mut Vec<Issue>) {
    let Topology::Dag { edges } = &def.topology else {
        return;
    };

    let mut successors: BTreeMap<&AgentName, Vec<&AgentName>> = BTreeMap::new();
    let mut indegree: BTreeMap<&AgentName, usize> = BTreeMap::new();
    for edge in edges {
        indegree.entry(&edge.from).or_insert(0);
        for to in edge.to.members() {
            successors.entry(&edge.from).or_default().push(to);
            *indegree.entry(to).or_insert(0) += 1;
        }
    }

    let mut queue: VecDeque<&AgentName> =
        indegree.iter().filter(|(_, d)| **d == 0).map(|(n, _)| *n).collect();
    let mut done: BTreeSet<&AgentName> = BTreeSet::new();
    while let Some(node) = queue.pop_front() {
        done.insert(node);
        for succ in successors.get(node).into_iter().flatten() {
            if let Some(d) = indegree.get_mut(succ) {
                *d -= 1;
                if *d == 0 {
                    queue.push_back(succ);
                }
            }
        }
    }

    if done.len() < indegree.len() {
        let cyclic: Vec<&str> = indegree
            .keys()
            .filter(|n| !done.contains(*n))
            .map(|n| n.as_str())
            .collect();
        issues.push(Issue::error(
            "topology.edges",
            IssueKind::Cycle,
            format!("edge set contains a cycle (involving: {})", cyclic.join(", ")),
        ));
    }
}

fn check_hierarchy_levels(def: &JobDefinition, issues: &mut Vec<Issue>) {
    let Topology::Hierarchical { root, levels } = &def.topology else {
        return;
    };

    let mut counts: BTreeMap<&AgentName, usize> = BTreeMap::new();
    for level in levels {
        for id in level {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    for (id, count) in &counts {
        if *count > 1 {
            issues.push(Issue::error(
                "topology.levels",
                IssueKind::LevelMembership,
                format!("agent '{}' appears in {} levels; exactly one is allowed", id, count),
            ));
        }
    }
    if counts.contains_key(root) {
        issues.push(Issue::error(
            "topology.root",
            IssueKind::LevelMembership,
            format!("root '{}' must not also appear in a level", root),
        ));
    }
}

fn check_entry_point(def: &JobDefinition, issues: &mut Vec<Issue>) {
    if let Some(entry) = &def.execution.entry_point {
        if def.agent(entry).is_none() {
            issues.push(Issue::error(
                "execution.entry_point",
                IssueKind::EntryPoint,
                format!("entry point '{}' is not a declared agent", entry),
            ));
        }
    }
}

fn check_unreferenced(def: &JobDefinition, issues: &mut Vec<Issue>) {
    let referenced = def.topology.referenced_ids();
    for (i, agent) in def.agents.iter().enumerate() {
        if !referenced.contains(&agent.id) {
            issues.push(Issue::warning(
                format!("agents[{}]", i),
                IssueKind::Unreferenced,
                format!("agent '{}' is not referenced by the topology", agent.id),
            ));
        }
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
