// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for duration parsing

use super::*;

#[yare::parameterized(
    bare_seconds = { "30", Duration::from_secs(30) },
    seconds = { "30s", Duration::from_secs(30) },
    millis = { "500ms", Duration::from_millis(500) },
    minutes = { "5m", Duration::from_secs(300) },
    hours = { "1h", Duration::from_secs(3600) },
    days = { "2d", Duration::from_secs(172_800) },
    padded = { " 10s ", Duration::from_secs(10) },
)]
fn parses(input: &str, expected: Duration) {
    assert_eq!(parse_duration(input).unwrap(), expected);
}

#[yare::parameterized(
    empty = { "" },
    no_number = { "s" },
    bad_suffix = { "10fortnights" },
)]
fn rejects(input: &str) {
    assert!(parse_duration(input).is_err());
}

#[test]
fn serde_round_trip_seconds() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Wrap {
        #[serde(with = "serde_duration")]
        d: Duration,
    }

    let w: Wrap = serde_yaml::from_str("d: 30").unwrap();
    assert_eq!(w.d, Duration::from_secs(30));

    let out = serde_yaml::to_string(&Wrap { d: Duration::from_secs(30) }).unwrap();
    let back: Wrap = serde_yaml::from_str(&out).unwrap();
    assert_eq!(back.d, Duration::from_secs(30));
}

#[test]
fn serde_accepts_suffixed_string() {
    #[derive(serde::Deserialize)]
    struct Wrap {
        #[serde(with = "serde_duration")]
        d: Duration,
    }

    let w: Wrap = serde_yaml::from_str("d: 250ms").unwrap();
    assert_eq!(w.d, Duration::from_millis(250));
}
