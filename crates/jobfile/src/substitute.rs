// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-environment variable substitution.
//!
//! Applied to the raw job file text before parsing, so `${VAR}` works in any
//! string position. `${VAR:-default}` falls back when the variable is unset;
//! a bare `${VAR}` that resolves nowhere is a load error.

use regex::Regex;
use std::sync::LazyLock;

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .expect("constant regex pattern is valid")
});

/// Expand `${VAR}` and `${VAR:-default}` from the host environment.
///
/// Returns the expanded text, or the sorted, deduplicated names of variables
/// that could not be resolved.
pub fn substitute_env(text: &str) -> Result<String, Vec<String>> {
    substitute_with(text, |name| std::env::var(name).ok())
}

/// Expansion against an arbitrary lookup; the seam tests use.
pub fn substitute_with(
    text: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, Vec<String>> {
    let mut missing: Vec<String> = Vec::new();

    let result = VAR_PATTERN
        .replace_all(text, |caps: &regex::Captures| {
            let name = &caps[1];
            match lookup(name) {
                Some(val) => val,
                None => match caps.get(3) {
                    Some(default) => default.as_str().to_string(),
                    None => {
                        missing.push(name.to_string());
                        caps[0].to_string()
                    }
                },
            }
        })
        .to_string();

    if missing.is_empty() {
        Ok(result)
    } else {
        missing.sort();
        missing.dedup();
        Err(missing)
    }
}

#[cfg(test)]
#[path = "substitute_tests.rs"]
mod tests;
