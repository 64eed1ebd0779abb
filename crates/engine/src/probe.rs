// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health probing shared by the deploy gate and the runtime monitor.

use std::time::Duration;

/// One `GET <url>/health` probe; true on any 2xx within the timeout.
pub async fn probe_health(client: &reqwest::Client, base_url: &str, timeout: Duration) -> bool {
    let url = format!("{}/health", base_url.trim_end_matches('/'));
    match client.get(&url).timeout(timeout).send().await {
        Ok(response) => response.status().is_success(),
        Err(_) => false,
    }
}
