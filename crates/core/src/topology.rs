// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The five topology variants a job can declare.

use crate::id::AgentName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// How agents in a job are wired together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Topology {
    /// One hub querying a set of spokes; spokes do not talk back.
    HubSpoke {
        hub: AgentName,
        #[serde(default)]
        spokes: Vec<AgentName>,
    },
    /// Linear flow; an entry may be a single id or a parallel tier.
    Pipeline { stages: Vec<PipelineStage> },
    /// Arbitrary acyclic edges.
    Dag { edges: Vec<DagEdge> },
    /// Every member may query every other member.
    Mesh { members: Vec<AgentName> },
    /// A root over successive levels; each level queries the one below it.
    Hierarchical {
        root: AgentName,
        #[serde(default)]
        levels: Vec<Vec<AgentName>>,
    },
}

impl Topology {
    /// Every agent id the topology mentions, deduplicated.
    pub fn referenced_ids(&self) -> BTreeSet<&AgentName> {
        let mut ids = BTreeSet::new();
        match self {
            Topology::HubSpoke { hub, spokes } => {
                ids.insert(hub);
                ids.extend(spokes.iter());
            }
            Topology::Pipeline { stages } => {
                for stage in stages {
                    ids.extend(stage.members().iter());
                }
            }
            Topology::Dag { edges } => {
                for edge in edges {
                    ids.insert(&edge.from);
                    ids.extend(edge.to.members().iter());
                }
            }
            Topology::Mesh { members } => {
                ids.extend(members.iter());
            }
            Topology::Hierarchical { root, levels } => {
                ids.insert(root);
                for level in levels {
                    ids.extend(level.iter());
                }
            }
        }
        ids
    }
}

crate::simple_display! {
    Topology {
        HubSpoke { .. } => "hub_spoke",
        Pipeline { .. } => "pipeline",
        Dag { .. } => "dag",
        Mesh { .. } => "mesh",
        Hierarchical { .. } => "hierarchical",
    }
}

/// One pipeline element: a scalar id, or a list forming a parallel tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineStage {
    Single(AgentName),
    Tier(Vec<AgentName>),
}

impl PipelineStage {
    pub fn members(&self) -> &[AgentName] {
        match self {
            PipelineStage::Single(id) => std::slice::from_ref(id),
            PipelineStage::Tier(ids) => ids,
        }
    }
}

/// One DAG edge; `to` may fan out to several targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DagEdge {
    pub from: AgentName,
    pub to: EdgeTargets,
}

/// Edge target: a scalar id or a list of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EdgeTargets {
    Single(AgentName),
    Many(Vec<AgentName>),
}

impl EdgeTargets {
    pub fn members(&self) -> &[AgentName] {
        match self {
            EdgeTargets::Single(id) => std::slice::from_ref(id),
            EdgeTargets::Many(ids) => ids,
        }
    }
}

#[cfg(test)]
#[path = "topology_tests.rs"]
mod tests;
