// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for topology parsing

use super::*;

#[test]
fn hub_spoke_parses() {
    let yaml = "type: hub_spoke\nhub: controller\nspokes: [weather, maps]\n";
    let t: Topology = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        t,
        Topology::HubSpoke {
            hub: "controller".into(),
            spokes: vec!["weather".into(), "maps".into()],
        }
    );
}

#[test]
fn pipeline_mixes_scalars_and_tiers() {
    let yaml = "type: pipeline\nstages:\n  - ingest\n  - [clean, enrich]\n  - publish\n";
    let t: Topology = serde_yaml::from_str(yaml).unwrap();
    match &t {
        Topology::Pipeline { stages } => {
            assert_eq!(stages.len(), 3);
            assert_eq!(stages[0].members(), &["ingest".into()] as &[AgentName]);
            assert_eq!(stages[1].members().len(), 2);
        }
        other => panic!("expected pipeline, got {}", other),
    }
}

#[test]
fn dag_edge_targets_fan_out() {
    let yaml = "type: dag\nedges:\n  - from: src\n    to: [p1, p2]\n  - from: p1\n    to: sink\n";
    let t: Topology = serde_yaml::from_str(yaml).unwrap();
    match &t {
        Topology::Dag { edges } => {
            assert_eq!(edges[0].to.members().len(), 2);
            assert_eq!(edges[1].to.members(), &["sink".into()] as &[AgentName]);
        }
        other => panic!("expected dag, got {}", other),
    }
}

#[test]
fn referenced_ids_deduplicates() {
    let yaml = "type: dag\nedges:\n  - from: a\n    to: b\n  - from: b\n    to: c\n  - from: a\n    to: c\n";
    let t: Topology = serde_yaml::from_str(yaml).unwrap();
    let ids: Vec<&str> = t.referenced_ids().iter().map(|n| n.as_str()).collect();
    assert_eq!(ids, ["a", "b", "c"]);
}

#[test]
fn topology_round_trips() {
    let t = Topology::Hierarchical {
        root: "ceo".into(),
        levels: vec![
            vec!["mgr1".into(), "mgr2".into()],
            vec!["w1".into(), "w2".into(), "w3".into()],
        ],
    };
    let yaml = serde_yaml::to_string(&t).unwrap();
    let back: Topology = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(back, t);
}

#[yare::parameterized(
    hub_spoke = { "type: hub_spoke\nhub: h\n", "hub_spoke" },
    mesh = { "type: mesh\nmembers: [a]\n", "mesh" },
)]
fn displays_kind(yaml: &str, expected: &str) {
    let t: Topology = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(t.to_string(), expected);
}
