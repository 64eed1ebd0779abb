// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the outbound URL guard

use super::*;

fn guard(hosts: &[&str]) -> UrlGuard {
    UrlGuard::new(hosts.iter().map(|h| h.to_string()).collect(), 1024, 65535)
}

#[test]
fn exact_host_match_passes() {
    let g = guard(&["localhost", "127.0.0.1"]);
    assert!(g.validate("http://127.0.0.1:9000/query").is_ok());
    assert!(g.validate("http://localhost:9000").is_ok());
}

#[test]
fn unlisted_private_address_is_blocked() {
    let g = guard(&["localhost", "127.0.0.1"]);
    let err = g.validate("http://10.0.0.5:9000").unwrap_err();
    assert_eq!(err, GuardError::PrivateAddress("10.0.0.5".to_string()));
}

#[test]
fn unlisted_public_host_is_blocked() {
    let g = guard(&["localhost"]);
    let err = g.validate("http://agents.example.com:9000").unwrap_err();
    assert!(matches!(err, GuardError::HostNotAllowed(_)));
}

#[test]
fn wildcard_suffix_matches_subdomains() {
    let g = guard(&["*.agents.internal"]);
    assert!(g.validate("http://weather.agents.internal:9001").is_ok());
    assert!(g.validate("http://deep.sub.agents.internal:9001").is_ok());
    // the bare suffix itself is not covered by the wildcard
    assert!(matches!(
        g.validate("http://agents.internal:9001"),
        Err(GuardError::HostNotAllowed(_))
    ));
}

#[test]
fn wildcard_never_grants_private_addresses() {
    let g = guard(&["*.1"]);
    assert!(matches!(
        g.validate("http://10.0.0.1:9001"),
        Err(GuardError::PrivateAddress(_))
    ));
}

#[test]
fn explicit_private_entry_is_honored() {
    let g = guard(&["10.0.0.5"]);
    assert!(g.validate("http://10.0.0.5:9001").is_ok());
}

#[yare::parameterized(
    below = { 80 },
    above_allowed = { 500 },
)]
fn ports_outside_range_are_blocked(port: u16) {
    let g = guard(&["127.0.0.1"]);
    let err = g.validate(&format!("http://127.0.0.1:{}", port)).unwrap_err();
    assert!(matches!(err, GuardError::PortOutOfRange { .. }));
}

#[test]
fn default_port_is_checked_too() {
    // no explicit port: http defaults to 80, below min_port 1024
    let g = guard(&["127.0.0.1"]);
    assert!(matches!(
        g.validate("http://127.0.0.1/query"),
        Err(GuardError::PortOutOfRange { port: 80, .. })
    ));
}

#[yare::parameterized(
    ftp = { "ftp://127.0.0.1:9000" },
    file = { "file:///etc/passwd" },
)]
fn non_http_schemes_are_blocked(url: &str) {
    let g = guard(&["127.0.0.1"]);
    assert!(matches!(g.validate(url), Err(GuardError::BadScheme(_) | GuardError::InvalidUrl(_))));
}

#[test]
fn garbage_urls_are_invalid() {
    let g = guard(&["127.0.0.1"]);
    assert!(matches!(g.validate("not a url"), Err(GuardError::InvalidUrl(_))));
}

#[test]
fn host_matching_is_case_insensitive() {
    let g = guard(&["Agents.Example.COM"]);
    // public hostname listed with mixed case still matches
    let ok = UrlGuard::new(vec!["agents.example.com".to_string()], 1024, 65535)
        .validate("http://AGENTS.EXAMPLE.COM:9000");
    assert!(ok.is_ok());
    assert!(g.validate("http://agents.example.com:9000").is_ok());
}

#[test]
fn link_local_v6_requires_exact_entry() {
    let g = guard(&["127.0.0.1"]);
    assert!(matches!(
        g.validate("http://[fe80::1]:9000"),
        Err(GuardError::PrivateAddress(_))
    ));
}
