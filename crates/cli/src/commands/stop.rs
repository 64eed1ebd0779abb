// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `muster stop` — terminate a deployed job.

use crate::exit_error::ExitError;
use anyhow::Result;
use muster_engine::Runners;
use muster_runner::SshOptions;
use std::sync::Arc;

pub async fn run(job_id: &str, force: bool) -> Result<()> {
    let orch = super::orchestrator()?;
    let runners = Arc::new(Runners::new(SshOptions::default()));

    let record = orch
        .stop_by_id(&muster_core::JobId::from_string(job_id), &runners, !force)
        .await
        .map_err(|e| ExitError::new(1, e.to_string()))?;

    println!("stopped '{}' ({} agents)", record.job_id, record.agents.len());
    Ok(())
}
