// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for identifiers

use super::*;

#[test]
fn derive_appends_epoch_suffix() {
    let id = JobId::derive("pipeline", 1722470400);
    assert_eq!(id.as_str(), "pipeline-1722470400");
}

#[test]
fn derived_ids_differ_across_timestamps() {
    let a = JobId::derive("demo", 100);
    let b = JobId::derive("demo", 101);
    assert_ne!(a, b);
}

#[test]
fn from_string_is_verbatim() {
    let id = JobId::from_string("custom-id");
    assert_eq!(id.as_str(), "custom-id");
    assert_eq!(id, "custom-id");
}

#[test]
fn job_id_round_trips_through_serde() {
    let id = JobId::derive("demo", 42);
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"demo-42\"");
    let back: JobId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn agent_name_compares_with_str() {
    let name = AgentName::new("weather");
    assert_eq!(name, "weather");
    assert_eq!(name.to_string(), "weather");
}

#[test]
fn agent_names_sort_lexicographically() {
    let mut names = vec![AgentName::new("c"), AgentName::new("a"), AgentName::new("b")];
    names.sort();
    let strs: Vec<&str> = names.iter().map(|n| n.as_str()).collect();
    assert_eq!(strs, ["a", "b", "c"]);
}

#[yare::parameterized(
    shorter = { "abc", 5, "abc" },
    exact = { "abcde", 5, "abcde" },
    truncated = { "abcdefgh", 5, "abcde" },
)]
fn short_truncates(input: &str, n: usize, expected: &str) {
    assert_eq!(short(input, n), expected);
}
