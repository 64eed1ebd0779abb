// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `muster logs` — print captured agent output.

use crate::exit_error::ExitError;
use anyhow::Result;
use std::time::Duration;

pub async fn run(job_id: &str, agent: Option<&str>, tail: usize, follow: bool) -> Result<()> {
    let orch = super::orchestrator()?;
    let job_id = muster_core::JobId::from_string(job_id);
    let agent = agent.map(muster_core::AgentName::new);

    print_tail(&orch, &job_id, agent.as_ref(), tail)?;
    if !follow {
        return Ok(());
    }

    // naive follow: re-tail on an interval, printing only unseen lines
    let mut seen: std::collections::HashMap<String, Vec<String>> = std::collections::HashMap::new();
    loop {
        tokio::time::sleep(Duration::from_secs(1)).await;
        let batches = orch
            .logs(&job_id, agent.as_ref(), tail.max(200))
            .map_err(|e| ExitError::new(1, e.to_string()))?;
        for (agent_id, stream, lines) in batches {
            let key = format!("{}/{}", agent_id, stream);
            let previous = seen.entry(key).or_default();
            for line in &lines {
                if !previous.contains(line) {
                    println!("[{}:{}] {}", agent_id, stream, line);
                }
            }
            *previous = lines;
        }
    }
}

fn print_tail(
    orch: &muster_engine::Orchestrator,
    job_id: &muster_core::JobId,
    agent: Option<&muster_core::AgentName>,
    tail: usize,
) -> Result<()> {
    let batches = orch
        .logs(job_id, agent, tail)
        .map_err(|e| ExitError::new(1, e.to_string()))?;
    if batches.is_empty() {
        println!("no logs recorded");
        return Ok(());
    }
    for (agent_id, stream, lines) in batches {
        if lines.is_empty() {
            continue;
        }
        println!("--- {} ({}) ---", agent_id, stream);
        for line in lines {
            println!("{}", line);
        }
    }
    Ok(())
}
