// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `muster cleanup` — drop finished registry records.

use crate::exit_error::ExitError;
use anyhow::Result;

pub fn run(all: bool) -> Result<()> {
    let orch = super::orchestrator()?;
    let removed = orch.cleanup(all).map_err(|e| ExitError::new(1, e.to_string()))?;

    if removed.is_empty() {
        println!("nothing to clean up");
    } else {
        for record in &removed {
            println!("removed {} ({})", record.job_id, record.state);
        }
    }
    Ok(())
}
