// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared builders and fixtures for tests across the workspace.

use crate::job::{
    AgentConfig, AgentSettings, DeploymentOptions, ExecutionOptions, JobDefinition, ResourceHints,
};
use crate::target::Target;
use crate::topology::{DagEdge, EdgeTargets, PipelineStage, Topology};
use indexmap::IndexMap;

/// A localhost agent with the given id and port.
pub fn local_agent(id: &str, port: u16) -> AgentConfig {
    AgentConfig {
        id: id.into(),
        agent_type: "assistant".to_string(),
        module: None,
        config: AgentSettings::with_port(port),
        target: Target::Localhost,
        environment: IndexMap::new(),
        resources: ResourceHints::default(),
    }
}

/// A remote agent with the given id, host, and port.
pub fn remote_agent(id: &str, host: &str, port: u16) -> AgentConfig {
    AgentConfig {
        target: Target::Remote {
            host: host.to_string(),
            user: None,
            ssh_key: None,
            password: None,
            port: 22,
            python: "python3".to_string(),
            workdir: None,
        },
        ..local_agent(id, port)
    }
}

/// A definition with the given agents and topology; everything else default.
pub fn job_def(name: &str, agents: Vec<AgentConfig>, topology: Topology) -> JobDefinition {
    JobDefinition {
        name: name.to_string(),
        version: None,
        description: None,
        tags: Vec::new(),
        agents,
        topology,
        deployment: DeploymentOptions::default(),
        execution: ExecutionOptions::default(),
        environment: IndexMap::new(),
    }
}

/// `weather` on 9001 feeding a `controller` hub on 9000.
pub fn two_agent_hub_spoke() -> JobDefinition {
    job_def(
        "demo",
        vec![local_agent("controller", 9000), local_agent("weather", 9001)],
        Topology::HubSpoke { hub: "controller".into(), spokes: vec!["weather".into()] },
    )
}

/// Four-agent scalar pipeline a → b → c → d on ports 9001..9004.
pub fn four_agent_pipeline() -> JobDefinition {
    job_def(
        "pipeline",
        vec![
            local_agent("a", 9001),
            local_agent("b", 9002),
            local_agent("c", 9003),
            local_agent("d", 9004),
        ],
        Topology::Pipeline {
            stages: vec![
                PipelineStage::Single("a".into()),
                PipelineStage::Single("b".into()),
                PipelineStage::Single("c".into()),
                PipelineStage::Single("d".into()),
            ],
        },
    )
}

/// Diamond DAG: src fans out to p1/p2, both feed sink.
pub fn diamond_dag() -> JobDefinition {
    job_def(
        "diamond",
        vec![
            local_agent("src", 9001),
            local_agent("p1", 9002),
            local_agent("p2", 9003),
            local_agent("sink", 9004),
        ],
        Topology::Dag {
            edges: vec![
                DagEdge {
                    from: "src".into(),
                    to: EdgeTargets::Many(vec!["p1".into(), "p2".into()]),
                },
                DagEdge { from: "p1".into(), to: EdgeTargets::Single("sink".into()) },
                DagEdge { from: "p2".into(), to: EdgeTargets::Single("sink".into()) },
            ],
        },
    )
}
