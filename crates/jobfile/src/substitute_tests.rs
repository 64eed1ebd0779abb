// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for environment substitution

use super::*;
use std::collections::HashMap;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> =
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    move |name: &str| map.get(name).cloned()
}

#[test]
fn substitutes_known_variables() {
    let out = substitute_with("key: ${API_KEY}", lookup(&[("API_KEY", "s3cret")])).unwrap();
    assert_eq!(out, "key: s3cret");
}

#[test]
fn default_applies_when_unset() {
    let out = substitute_with("host: ${DB_HOST:-localhost}", lookup(&[])).unwrap();
    assert_eq!(out, "host: localhost");
}

#[test]
fn explicit_value_beats_default() {
    let out =
        substitute_with("host: ${DB_HOST:-localhost}", lookup(&[("DB_HOST", "db-1")])).unwrap();
    assert_eq!(out, "host: db-1");
}

#[test]
fn unresolved_variables_are_collected_and_sorted() {
    let err = substitute_with("a: ${ZED}\nb: ${ALPHA}\nc: ${ZED}", lookup(&[])).unwrap_err();
    assert_eq!(err, ["ALPHA", "ZED"]);
}

#[test]
fn untouched_text_passes_through() {
    let text = "plain: value\nport: 9000\n";
    assert_eq!(substitute_with(text, lookup(&[])).unwrap(), text);
}

#[yare::parameterized(
    lowercase_start = { "${path}" },
    underscore = { "${_INTERNAL}" },
)]
fn accepts_shellish_names(text: &str) {
    // both resolve, so no error and full replacement
    let out = substitute_with(text, |_| Some("x".to_string())).unwrap();
    assert_eq!(out, "x");
}

#[test]
fn empty_default_is_allowed() {
    let out = substitute_with("v: '${OPT:-}'", lookup(&[])).unwrap();
    assert_eq!(out, "v: ''");
}
