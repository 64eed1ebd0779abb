// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outbound URL validation for A2A calls.
//!
//! Hosts must appear on the allow-list (exactly, or via a `*.suffix`
//! wildcard entry) and ports must fall inside the configured range.
//! Loopback, private, and link-local IP literals additionally require an
//! exact allow-list entry; a wildcard never grants them.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GuardError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("scheme '{0}' is not allowed; only http and https")]
    BadScheme(String),
    #[error("host '{0}' is not in the allowed hosts list")]
    HostNotAllowed(String),
    #[error("private or loopback address '{0}' requires an exact allow-list entry")]
    PrivateAddress(String),
    #[error("port {port} is outside the allowed range {min}..={max}")]
    PortOutOfRange { port: u16, min: u16, max: u16 },
}

/// Allow-list plus port bounds, built once per agent from its environment.
#[derive(Debug, Clone)]
pub struct UrlGuard {
    allowed_hosts: Vec<String>,
    min_port: u16,
    max_port: u16,
}

impl UrlGuard {
    pub fn new(allowed_hosts: Vec<String>, min_port: u16, max_port: u16) -> Self {
        let allowed_hosts = allowed_hosts
            .into_iter()
            .map(|h| h.trim().to_ascii_lowercase())
            .filter(|h| !h.is_empty())
            .collect();
        UrlGuard { allowed_hosts, min_port, max_port }
    }

    /// Validate a target URL, returning its parsed form on success.
    pub fn validate(&self, raw: &str) -> Result<Url, GuardError> {
        let url = Url::parse(raw).map_err(|e| GuardError::InvalidUrl(e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(GuardError::BadScheme(other.to_string())),
        }
        let parsed_host = url
            .host()
            .ok_or_else(|| GuardError::InvalidUrl("missing host".to_string()))?;
        // bracket-free form so IPv6 entries match how operators write them
        let host = match &parsed_host {
            url::Host::Domain(d) => d.to_ascii_lowercase(),
            url::Host::Ipv4(ip) => ip.to_string(),
            url::Host::Ipv6(ip) => ip.to_string(),
        };

        let exact = self.allowed_hosts.iter().any(|h| h == &host);
        let wildcard = self.allowed_hosts.iter().any(|allowed| {
            allowed.strip_prefix("*.").is_some_and(|suffix| {
                host.strip_suffix(suffix).is_some_and(|head| head.ends_with('.'))
            })
        });

        if is_restricted_host(&parsed_host, &host) {
            if !exact {
                return Err(GuardError::PrivateAddress(host));
            }
        } else if !exact && !wildcard {
            return Err(GuardError::HostNotAllowed(host));
        }

        let port = url.port_or_known_default().unwrap_or(80);
        if port < self.min_port || port > self.max_port {
            return Err(GuardError::PortOutOfRange {
                port,
                min: self.min_port,
                max: self.max_port,
            });
        }
        Ok(url)
    }
}

/// Loopback, private-range, and link-local addresses (plus `localhost`).
fn is_restricted_host(parsed: &url::Host<&str>, lowered: &str) -> bool {
    match parsed {
        url::Host::Domain(_) => lowered == "localhost",
        url::Host::Ipv4(v4) => {
            v4.is_loopback() || v4.is_private() || v4.is_link_local() || v4.is_unspecified()
        }
        url::Host::Ipv6(v6) => {
            v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xffc0) == 0xfe80
        }
    }
}

#[cfg(test)]
#[path = "guard_tests.rs"]
mod tests;
