// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the agent class registry

use super::*;

#[test]
fn builtin_classes_are_registered() {
    let names: Vec<&str> = builtin().iter().map(|c| c.type_name).collect();
    assert_eq!(names, ["assistant", "controller"]);
}

#[test]
fn lookup_finds_registered_class() {
    let class = lookup("controller");
    assert_eq!(class.type_name, "controller");
    assert!(class.base_prompt.contains("controller"));
    assert!(!(class.skills)().is_empty());
}

#[test]
fn unknown_type_falls_back_to_assistant() {
    let class = lookup("weather-station-9000");
    assert_eq!(class.type_name, "assistant");
}

#[test]
fn classes_only_add_tools_on_top_of_a2a() {
    let mut registry = ToolRegistry::with_a2a_tools();
    let before = registry.names();
    (lookup("assistant").register_tools)(&mut registry);
    assert_eq!(registry.names(), before);
    assert!(before.contains(&"query_agent".to_string()));
    assert!(before.contains(&"discover_agent".to_string()));
}
