// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `muster start` — deploy a job and monitor it.

use crate::exit_error::ExitError;
use anyhow::{Context, Result};
use muster_engine::health::HealthMonitor;
use muster_engine::{DeployOverrides, Runners};
use muster_runner::SshOptions;
use std::path::Path;
use std::sync::Arc;

pub async fn run(job_file: &Path, job_id: Option<String>, detach: bool) -> Result<()> {
    let def = muster_jobfile::load(job_file)
        .map_err(|e| report_load_error(e))?;
    let orch = super::orchestrator()?;

    let ssh = SshOptions {
        accept_unknown_hosts: def.deployment.ssh.accept_unknown_hosts,
        default_user: def.deployment.ssh.user.clone(),
        default_key: def.deployment.ssh.key.clone(),
        ..SshOptions::default()
    };
    let runners = Arc::new(Runners::new(ssh));

    let overrides = DeployOverrides { job_id: job_id.map(muster_core::JobId::from_string) };
    let health_check = def.deployment.health_check.clone();
    let mut job = orch
        .deploy(def, overrides, runners.clone())
        .await
        .map_err(|e| ExitError::new(1, format!("deployment failed: {}", e)))?;

    println!("deployed '{}' ({} agents)", job.job_id, job.plan.agent_count());
    for (agent, url) in &job.plan.urls {
        println!("  {} at {}", agent, url);
    }
    if let Some(entry) = &job.definition.execution.entry_point {
        if let Some(url) = job.plan.urls.get(entry) {
            println!("entry point: POST {}/query", url);
        }
    }

    if detach {
        println!("running detached; stop with: muster stop {}", job.job_id);
        return Ok(());
    }

    let monitor = HealthMonitor::new(health_check).with_callback(Arc::new(|agent, status| {
        println!("[health] {} is {}", agent, status);
    }));
    let handle = monitor.spawn(&job, runners.clone());

    println!("monitoring; Ctrl-C stops the job");
    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;

    println!("stopping '{}'", job.job_id);
    handle.shutdown().await;
    orch.stop(&mut job, &runners, true)
        .await
        .map_err(|e| ExitError::new(1, format!("stop failed: {}", e)))?;
    println!("stopped");
    Ok(())
}

fn report_load_error(e: muster_jobfile::LoadError) -> ExitError {
    for issue in e.issues() {
        eprintln!("{}", issue);
    }
    ExitError::new(2, e.to_string())
}
