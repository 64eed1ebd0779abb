// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for topology resolution

use super::*;
use crate::test_support::{diamond_dag, four_agent_pipeline, job_def, local_agent, two_agent_hub_spoke};
use crate::topology::{DagEdge, EdgeTargets, PipelineStage};

fn names(stage: &[AgentName]) -> Vec<&str> {
    stage.iter().map(|n| n.as_str()).collect()
}

#[test]
fn hub_spoke_deploys_spokes_first() {
    let plan = resolve(&two_agent_hub_spoke()).unwrap();
    assert_eq!(plan.stages.len(), 2);
    assert_eq!(names(&plan.stages[0]), ["weather"]);
    assert_eq!(names(&plan.stages[1]), ["controller"]);

    let hub_conns = &plan.connections[&AgentName::new("controller")];
    assert_eq!(hub_conns.iter().collect::<Vec<_>>(), ["http://127.0.0.1:9001"]);
    assert!(plan.connections[&AgentName::new("weather")].is_empty());
}

#[test]
fn hub_spoke_without_spokes_is_single_stage() {
    let def = job_def(
        "solo",
        vec![local_agent("hub", 9000)],
        Topology::HubSpoke { hub: "hub".into(), spokes: vec![] },
    );
    let plan = resolve(&def).unwrap();
    assert_eq!(plan.stages.len(), 1);
    assert_eq!(names(&plan.stages[0]), ["hub"]);
    assert!(plan.connections[&AgentName::new("hub")].is_empty());
}

#[test]
fn pipeline_stages_follow_declaration_order() {
    let plan = resolve(&four_agent_pipeline()).unwrap();
    let stages: Vec<Vec<&str>> = plan.stages.iter().map(|s| names(s)).collect();
    assert_eq!(stages, [["a"], ["b"], ["c"], ["d"]]);

    assert_eq!(
        plan.connections[&AgentName::new("a")].iter().collect::<Vec<_>>(),
        ["http://127.0.0.1:9002"]
    );
    assert_eq!(
        plan.connections[&AgentName::new("c")].iter().collect::<Vec<_>>(),
        ["http://127.0.0.1:9004"]
    );
    assert!(plan.connections[&AgentName::new("d")].is_empty());
}

#[test]
fn pipeline_tier_connects_pairwise() {
    let def = job_def(
        "tiered",
        vec![
            local_agent("in", 9001),
            local_agent("w1", 9002),
            local_agent("w2", 9003),
            local_agent("out", 9004),
        ],
        Topology::Pipeline {
            stages: vec![
                PipelineStage::Single("in".into()),
                PipelineStage::Tier(vec!["w1".into(), "w2".into()]),
                PipelineStage::Single("out".into()),
            ],
        },
    );
    let plan = resolve(&def).unwrap();
    assert_eq!(plan.stages[1].len(), 2);
    let in_conns = &plan.connections[&AgentName::new("in")];
    assert!(in_conns.contains("http://127.0.0.1:9002"));
    assert!(in_conns.contains("http://127.0.0.1:9003"));
    assert_eq!(
        plan.connections[&AgentName::new("w1")].iter().collect::<Vec<_>>(),
        ["http://127.0.0.1:9004"]
    );
}

#[test]
fn dag_deploys_sinks_first() {
    let plan = resolve(&diamond_dag()).unwrap();
    let stages: Vec<Vec<&str>> = plan.stages.iter().map(|s| names(s)).collect();
    assert_eq!(stages, vec![vec!["sink"], vec!["p1", "p2"], vec!["src"]]);

    let src = &plan.connections[&AgentName::new("src")];
    assert!(src.contains("http://127.0.0.1:9002") && src.contains("http://127.0.0.1:9003"));
    assert_eq!(
        plan.connections[&AgentName::new("p1")].iter().collect::<Vec<_>>(),
        ["http://127.0.0.1:9004"]
    );
    assert!(plan.connections[&AgentName::new("sink")].is_empty());
}

#[test]
fn dag_cycle_is_rejected() {
    let def = job_def(
        "cyclic",
        vec![local_agent("a", 9001), local_agent("b", 9002), local_agent("c", 9003)],
        Topology::Dag {
            edges: vec![
                DagEdge { from: "a".into(), to: EdgeTargets::Single("b".into()) },
                DagEdge { from: "b".into(), to: EdgeTargets::Single("c".into()) },
                DagEdge { from: "c".into(), to: EdgeTargets::Single("a".into()) },
            ],
        },
    );
    assert!(matches!(resolve(&def), Err(PlanError::Cycle(_))));
}

#[test]
fn mesh_is_single_stage_with_full_connections() {
    let def = job_def(
        "mesh",
        vec![local_agent("a", 9001), local_agent("b", 9002), local_agent("c", 9003)],
        Topology::Mesh { members: vec!["a".into(), "b".into(), "c".into()] },
    );
    let plan = resolve(&def).unwrap();
    assert_eq!(plan.stages.len(), 1);
    assert_eq!(plan.stages[0].len(), 3);
    let a = &plan.connections[&AgentName::new("a")];
    assert_eq!(a.len(), 2);
    assert!(!a.contains("http://127.0.0.1:9001"));
}

#[test]
fn mesh_single_member_has_empty_connections() {
    let def = job_def(
        "lonely",
        vec![local_agent("only", 9001)],
        Topology::Mesh { members: vec!["only".into()] },
    );
    let plan = resolve(&def).unwrap();
    assert_eq!(plan.stages.len(), 1);
    assert!(plan.connections[&AgentName::new("only")].is_empty());
}

#[test]
fn hierarchical_deploys_bottom_up() {
    let def = job_def(
        "tree",
        vec![
            local_agent("root", 9000),
            local_agent("m1", 9001),
            local_agent("m2", 9002),
            local_agent("w1", 9003),
            local_agent("w2", 9004),
        ],
        Topology::Hierarchical {
            root: "root".into(),
            levels: vec![
                vec!["m1".into(), "m2".into()],
                vec!["w1".into(), "w2".into()],
            ],
        },
    );
    let plan = resolve(&def).unwrap();
    let stages: Vec<Vec<&str>> = plan.stages.iter().map(|s| names(s)).collect();
    assert_eq!(stages, vec![vec!["w1", "w2"], vec!["m1", "m2"], vec!["root"]]);

    let root = &plan.connections[&AgentName::new("root")];
    assert!(root.contains("http://127.0.0.1:9001") && root.contains("http://127.0.0.1:9002"));
    let m1 = &plan.connections[&AgentName::new("m1")];
    assert!(m1.contains("http://127.0.0.1:9003") && m1.contains("http://127.0.0.1:9004"));
    assert!(plan.connections[&AgentName::new("w1")].is_empty());
}

#[test]
fn resolution_is_deterministic() {
    let def = diamond_dag();
    let a = resolve(&def).unwrap();
    let b = resolve(&def).unwrap();
    assert_eq!(a, b);
    let ja = serde_json::to_vec(&a).unwrap();
    let jb = serde_json::to_vec(&b).unwrap();
    assert_eq!(ja, jb);
}

#[test]
fn remote_urls_use_target_host() {
    let def = job_def(
        "mixed",
        vec![
            crate::test_support::remote_agent("edge", "worker-1", 9001),
            local_agent("hub", 9000),
        ],
        Topology::HubSpoke { hub: "hub".into(), spokes: vec!["edge".into()] },
    );
    let plan = resolve(&def).unwrap();
    assert_eq!(plan.urls[&AgentName::new("edge")], "http://worker-1:9001");
    assert!(plan.allowed_hosts.contains("worker-1"));
    assert!(plan.allowed_hosts.contains("127.0.0.1"));
    assert!(plan.allowed_hosts.contains("localhost"));
}

#[test]
fn unreferenced_agents_join_first_stage() {
    let def = job_def(
        "extra",
        vec![local_agent("hub", 9000), local_agent("stray", 9005)],
        Topology::HubSpoke { hub: "hub".into(), spokes: vec![] },
    );
    let plan = resolve(&def).unwrap();
    assert_eq!(plan.stages.len(), 1);
    assert_eq!(names(&plan.stages[0]), ["hub", "stray"]);
}

#[test]
fn connection_targets_deploy_before_callers() {
    // generic ordering rule over the diamond
    let plan = resolve(&diamond_dag()).unwrap();
    for (from, conns) in &plan.connections {
        let from_stage = plan.stage_of(from).unwrap();
        for url in conns {
            let (to, _) = plan.urls.iter().find(|(_, u)| *u == url).unwrap();
            assert!(
                plan.stage_of(to).unwrap() < from_stage,
                "{} must deploy before {}",
                to,
                from
            );
        }
    }
}

#[test]
fn empty_mesh_is_an_empty_plan() {
    let def = job_def("none", vec![], Topology::Mesh { members: vec![] });
    assert!(matches!(resolve(&def), Err(PlanError::EmptyPlan)));
}

#[test]
fn container_target_is_unsupported() {
    let mut def = two_agent_hub_spoke();
    def.agents[0].target = crate::target::Target::Container { image: "x".into() };
    assert!(matches!(resolve(&def), Err(PlanError::UnsupportedTarget { .. })));
}

mod props {
    use super::*;
    use proptest::prelude::*;

    /// Edges only point from lower to higher indices, so the set is acyclic
    /// by construction.
    fn arb_dag() -> impl Strategy<Value = Vec<(usize, usize)>> {
        proptest::collection::vec((0usize..8, 0usize..8), 1..20).prop_map(|pairs| {
            pairs
                .into_iter()
                .filter(|(a, b)| a != b)
                .map(|(a, b)| (a.min(b), a.max(b)))
                .collect()
        })
    }

    fn def_from_edges(edges: &[(usize, usize)]) -> JobDefinition {
        let mut ids: Vec<usize> = edges.iter().flat_map(|(a, b)| [*a, *b]).collect();
        ids.sort_unstable();
        ids.dedup();
        let agents = ids
            .iter()
            .map(|i| local_agent(&format!("n{}", i), 9000 + *i as u16))
            .collect();
        let dag_edges = edges
            .iter()
            .map(|(a, b)| DagEdge {
                from: format!("n{}", a).into(),
                to: EdgeTargets::Single(format!("n{}", b).into()),
            })
            .collect();
        job_def("prop", agents, crate::topology::Topology::Dag { edges: dag_edges })
    }

    proptest! {
        #[test]
        fn dag_targets_always_deploy_before_callers(edges in arb_dag()) {
            prop_assume!(!edges.is_empty());
            let def = def_from_edges(&edges);
            let plan = resolve(&def).unwrap();

            for (from, conns) in &plan.connections {
                let from_stage = plan.stage_of(from).unwrap();
                for url in conns {
                    let (to, _) = plan.urls.iter().find(|(_, u)| *u == url).unwrap();
                    prop_assert!(plan.stage_of(to).unwrap() < from_stage);
                }
            }
        }

        #[test]
        fn dag_resolution_is_deterministic(edges in arb_dag()) {
            prop_assume!(!edges.is_empty());
            let def = def_from_edges(&edges);
            let a = resolve(&def).unwrap();
            let b = resolve(&def).unwrap();
            prop_assert_eq!(a, b);
        }
    }
}
