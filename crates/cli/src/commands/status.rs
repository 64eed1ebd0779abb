// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `muster list` and `muster status` — registry views.

use crate::exit_error::ExitError;
use anyhow::Result;

pub async fn list() -> Result<()> {
    let orch = super::orchestrator()?;
    let records = orch.list().await.map_err(|e| ExitError::new(1, e.to_string()))?;

    if records.is_empty() {
        println!("no deployed jobs");
        return Ok(());
    }
    println!("{:<32} {:<10} {:>7} {:<12}", "JOB", "STATE", "AGENTS", "STARTED");
    for record in records {
        println!(
            "{:<32} {:<10} {:>7} {:<12}",
            record.job_id,
            record.state.to_string(),
            record.agents.len(),
            super::format_epoch_ms(record.start_time_ms),
        );
    }
    Ok(())
}

pub async fn show(job_id: &str) -> Result<()> {
    let orch = super::orchestrator()?;
    let record = orch
        .status(&muster_core::JobId::from_string(job_id))
        .await
        .map_err(|e| ExitError::new(1, e.to_string()))?;

    println!("job:    {}", record.job_id);
    println!("name:   {}", record.name);
    println!("state:  {}", record.state);
    println!("hash:   {}", muster_core::short(&record.definition_hash, 12));
    if let Some(entry) = &record.entry_point {
        println!("entry:  {}", entry);
    }
    println!();
    println!("{:<20} {:<12} {:<28} {:>8}", "AGENT", "STATUS", "URL", "PID");
    for agent in &record.agents {
        println!(
            "{:<20} {:<12} {:<28} {:>8}",
            agent.id,
            agent.status.to_string(),
            agent.url,
            agent.run.pid,
        );
    }
    Ok(())
}
