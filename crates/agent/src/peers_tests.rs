// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the peer registry

use super::*;
use crate::card::{AgentCard, Capabilities, Skill};

fn card(name: &str, url: &str) -> AgentCard {
    AgentCard {
        name: name.to_string(),
        description: format!("{} agent", name),
        version: "0.1.0".to_string(),
        url: url.to_string(),
        capabilities: Capabilities::default(),
        skills: vec![Skill {
            id: format!("{}-lookup", name),
            name: format!("{} lookup", name),
            description: "answers lookups".to_string(),
            tags: vec![],
            examples: vec![],
        }],
    }
}

#[test]
fn empty_registry_renders_base_prompt_unchanged() {
    let peers = PeerRegistry::new();
    assert_eq!(peers.render_prompt("You are an assistant."), "You are an assistant.");
}

#[test]
fn discovered_peers_appear_with_skills() {
    let peers = PeerRegistry::new();
    peers.insert("http://127.0.0.1:9001", Some(card("weather", "http://127.0.0.1:9001")));

    let prompt = peers.render_prompt("Base.");
    assert!(prompt.starts_with("Base."));
    assert!(prompt.contains("Connected agents:"));
    assert!(prompt.contains("weather (http://127.0.0.1:9001)"));
    assert!(prompt.contains("weather lookup: answers lookups"));
    assert!(prompt.contains("query_agent"));
}

#[test]
fn failed_discovery_is_listed_with_a_note() {
    let peers = PeerRegistry::new();
    peers.insert("http://127.0.0.1:9009", None);

    let prompt = peers.render_prompt("Base.");
    assert!(prompt.contains("http://127.0.0.1:9009 (capabilities could not be retrieved)"));
}

#[test]
fn by_url_returns_only_successful_cards() {
    let peers = PeerRegistry::new();
    peers.insert("http://a:9001", Some(card("a", "http://a:9001")));
    peers.insert("http://b:9002", None);

    assert_eq!(peers.by_url("http://a:9001").unwrap().name, "a");
    assert!(peers.by_url("http://b:9002").is_none());
    assert!(peers.by_url("http://c:9003").is_none());
}

#[test]
fn rendering_is_deterministic_across_calls() {
    let peers = PeerRegistry::new();
    peers.insert("http://b:9002", Some(card("b", "http://b:9002")));
    peers.insert("http://a:9001", Some(card("a", "http://a:9001")));

    let first = peers.render_prompt("Base.");
    let second = peers.render_prompt("Base.");
    assert_eq!(first, second);
    // BTreeMap keying orders peers by URL
    let a_pos = first.find("http://a:9001").unwrap();
    let b_pos = first.find("http://b:9002").unwrap();
    assert!(a_pos < b_pos);
}

#[tokio::test]
async fn discover_all_marks_unreachable_peers_failed() {
    let peers = PeerRegistry::new();
    let client = reqwest::Client::new();
    // nothing listens here; discovery must complete and record the failure
    peers
        .discover_all(
            &client,
            &["http://127.0.0.1:19901".to_string()],
            Duration::from_millis(200),
        )
        .await;

    assert_eq!(peers.known_urls(), ["http://127.0.0.1:19901"]);
    assert!(peers.by_url("http://127.0.0.1:19901").is_none());
}
