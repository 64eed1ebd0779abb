// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `muster plan` — print the resolved deployment plan.

use anyhow::{Context, Result};
use muster_core::JobId;
use muster_engine::compose_agent_env;
use std::path::Path;

/// Env keys whose values never print.
const SECRET_MARKERS: [&str; 4] = ["KEY", "TOKEN", "SECRET", "PASSWORD"];

pub fn run(job_file: &Path, show_env: bool) -> Result<()> {
    let def = muster_jobfile::load(job_file)
        .with_context(|| format!("loading {}", job_file.display()))?;
    let plan = muster_core::resolve(&def).context("resolving topology")?;

    println!("job '{}' ({} topology)", def.name, def.topology);
    println!();
    for (index, stage) in plan.stages.iter().enumerate() {
        let names: Vec<&str> = stage.iter().map(|n| n.as_str()).collect();
        println!("stage {}: {}", index + 1, names.join(", "));
    }
    println!();
    for agent in &def.agents {
        let url = &plan.urls[&agent.id];
        println!("{} -> {}", agent.id, url);
        let connections = &plan.connections[&agent.id];
        if connections.is_empty() {
            println!("    connects to: (none)");
        } else {
            for target in connections {
                println!("    connects to: {}", target);
            }
        }
        if show_env {
            let env = compose_agent_env(&def, &plan, agent, &JobId::from_string("<job-id>"));
            for (key, value) in env {
                if SECRET_MARKERS.iter().any(|m| key.to_uppercase().contains(m)) {
                    println!("    env {}=****", key);
                } else {
                    println!("    env {}={}", key, value);
                }
            }
        }
    }
    println!();
    let hosts: Vec<&str> = plan.allowed_hosts.iter().map(String::as_str).collect();
    println!("allowed hosts: {}", hosts.join(", "));
    Ok(())
}
