// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod cleanup;
pub mod logs;
pub mod plan;
pub mod start;
pub mod status;
pub mod stop;
pub mod validate;

use anyhow::{Context, Result};
use muster_engine::Orchestrator;
use std::path::PathBuf;

/// Engine state directory shared by every command.
pub fn state_dir() -> Result<PathBuf> {
    muster_engine::state_dir().context("could not resolve a state directory (set MUSTER_STATE_DIR)")
}

pub fn orchestrator() -> Result<Orchestrator> {
    Ok(Orchestrator::new(state_dir()?))
}

/// `1722470400` → `2024-08-01 00:00:00` style local display.
pub fn format_epoch_ms(ms: u64) -> String {
    use std::time::{Duration, UNIX_EPOCH};
    let time = UNIX_EPOCH + Duration::from_millis(ms);
    match time.elapsed() {
        Ok(elapsed) if elapsed.as_secs() < 120 => format!("{}s ago", elapsed.as_secs()),
        Ok(elapsed) if elapsed.as_secs() < 7200 => format!("{}m ago", elapsed.as_secs() / 60),
        Ok(elapsed) => format!("{}h ago", elapsed.as_secs() / 3600),
        Err(_) => "just now".to_string(),
    }
}
