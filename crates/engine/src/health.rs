// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime health monitoring.
//!
//! One background task per agent probes `/health` on an interval and walks
//! the state machine `Starting → Healthy ↔ Unreachable → Restarting →
//! {Healthy | Failed}`. Restarts go through the same runner that started the
//! agent and swap the run handle in place; the agent's id, port, and URL
//! never change. Each agent is driven by a single task, so two restarts of
//! the same agent cannot overlap.

use crate::deployed::{AgentStatus, DeployedJob};
use crate::orchestrator::Runners;
use crate::probe::probe_health;
use muster_core::{AgentName, HealthCheckConfig, RestartPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Invoked on every status transition (CLI display, tests).
pub type StatusCallback = Arc<dyn Fn(&AgentName, AgentStatus) + Send + Sync>;

/// What the monitor loop must do after a probe result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeAction {
    None,
    BecameHealthy,
    BecameUnreachable,
    /// Restart attempt `attempt` (1-based) after waiting `backoff`.
    StartRestart { attempt: u32, backoff: Duration },
    BecameFailed,
}

/// Pure per-agent state machine; the async loop feeds it probe results.
#[derive(Debug, Clone)]
pub struct ProbeTracker {
    status: AgentStatus,
    consecutive_failures: u32,
    restart_count: u32,
    retries: u32,
    restart: RestartPolicy,
}

impl ProbeTracker {
    pub fn new(retries: u32, restart: RestartPolicy) -> Self {
        ProbeTracker {
            status: AgentStatus::Starting,
            consecutive_failures: 0,
            restart_count: 0,
            retries: retries.max(1),
            restart,
        }
    }

    pub fn status(&self) -> AgentStatus {
        self.status
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    /// Exponential backoff for the next restart attempt, capped at 60s.
    fn backoff(&self) -> Duration {
        let exp = self.restart_count.min(6);
        let base = self.restart.backoff.max(Duration::from_millis(1));
        (base * 2u32.pow(exp)).min(Duration::from_secs(60))
    }

    pub fn on_probe(&mut self, ok: bool) -> ProbeAction {
        match (self.status, ok) {
            (AgentStatus::Failed | AgentStatus::Stopped | AgentStatus::Restarting, _) => {
                ProbeAction::None
            }
            (_, true) => {
                self.consecutive_failures = 0;
                if self.status == AgentStatus::Healthy {
                    ProbeAction::None
                } else {
                    self.status = AgentStatus::Healthy;
                    ProbeAction::BecameHealthy
                }
            }
            (AgentStatus::Starting | AgentStatus::Healthy, false) => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.retries {
                    self.status = AgentStatus::Unreachable;
                    ProbeAction::BecameUnreachable
                } else {
                    ProbeAction::None
                }
            }
            (AgentStatus::Unreachable, false) => {
                if !self.restart.enabled {
                    // heals on the next successful probe
                    return ProbeAction::None;
                }
                if self.restart_count < self.restart.max_restarts {
                    let action = ProbeAction::StartRestart {
                        attempt: self.restart_count + 1,
                        backoff: self.backoff(),
                    };
                    self.status = AgentStatus::Restarting;
                    action
                } else {
                    self.status = AgentStatus::Failed;
                    ProbeAction::BecameFailed
                }
            }
        }
    }

    /// Feed back the outcome of a restart attempt.
    pub fn on_restart_result(&mut self, started: bool) -> ProbeAction {
        self.restart_count += 1;
        self.consecutive_failures = 0;
        if started {
            self.status = AgentStatus::Starting;
            ProbeAction::None
        } else if self.restart_count >= self.restart.max_restarts {
            self.status = AgentStatus::Failed;
            ProbeAction::BecameFailed
        } else {
            self.status = AgentStatus::Unreachable;
            ProbeAction::None
        }
    }
}

/// Running monitor for one deployed job.
pub struct MonitorHandle {
    token: CancellationToken,
    tasks: JoinSet<()>,
    probe_timeout: Duration,
}

impl MonitorHandle {
    /// Cancel all probe tasks and wait for each within one probe timeout.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        let deadline = tokio::time::Instant::now() + self.probe_timeout;
        while !self.tasks.is_empty() {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, self.tasks.join_next()).await {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) => {
                    self.tasks.abort_all();
                    break;
                }
            }
        }
    }
}

/// Health monitor: spawns one probe loop per agent of a deployed job.
pub struct HealthMonitor {
    client: reqwest::Client,
    config: HealthCheckConfig,
    callback: Option<StatusCallback>,
}

impl HealthMonitor {
    pub fn new(config: HealthCheckConfig) -> Self {
        HealthMonitor { client: reqwest::Client::new(), config, callback: None }
    }

    pub fn with_callback(mut self, callback: StatusCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    pub fn spawn(&self, job: &DeployedJob, runners: Arc<Runners>) -> MonitorHandle {
        let token = CancellationToken::new();
        let mut tasks = JoinSet::new();

        let agent_ids: Vec<AgentName> = job.agents.lock().keys().cloned().collect();
        for agent_id in agent_ids {
            tasks.spawn(agent_loop(
                job.clone(),
                agent_id,
                runners.clone(),
                self.client.clone(),
                self.config.clone(),
                self.callback.clone(),
                token.clone(),
            ));
        }

        MonitorHandle { token, tasks, probe_timeout: self.config.timeout }
    }
}

async fn agent_loop(
    job: DeployedJob,
    agent_id: AgentName,
    runners: Arc<Runners>,
    client: reqwest::Client,
    config: HealthCheckConfig,
    callback: Option<StatusCallback>,
    token: CancellationToken,
) {
    let Some((url, runner_kind)) = job
        .agents
        .lock()
        .get(&agent_id)
        .map(|a| (a.url.clone(), a.runner))
    else {
        return;
    };
    let mut tracker = ProbeTracker::new(config.retries, config.restart.clone());
    let notify = |status: AgentStatus| {
        job.set_status(&agent_id, status);
        if let Some(cb) = &callback {
            cb(&agent_id, status);
        }
    };

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(config.interval) => {}
        }

        let ok = probe_health(&client, &url, config.timeout).await;
        match tracker.on_probe(ok) {
            ProbeAction::None => {}
            ProbeAction::BecameHealthy => {
                tracing::info!(agent = %agent_id, "agent healthy");
                notify(AgentStatus::Healthy);
            }
            ProbeAction::BecameUnreachable => {
                tracing::warn!(agent = %agent_id, url = %url, "agent unreachable");
                notify(AgentStatus::Unreachable);
            }
            ProbeAction::BecameFailed => {
                tracing::error!(agent = %agent_id, "agent failed permanently");
                notify(AgentStatus::Failed);
            }
            ProbeAction::StartRestart { attempt, backoff } => {
                tracing::warn!(agent = %agent_id, attempt, backoff_ms = backoff.as_millis() as u64, "restarting agent");
                notify(AgentStatus::Restarting);
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(backoff) => {}
                }

                let (run, spec) = {
                    let agents = job.agents.lock();
                    let Some(agent) = agents.get(&agent_id) else { break };
                    (agent.run.clone(), agent.spec.clone())
                };
                let runner = runners.for_kind(runner_kind);
                // best-effort stop of whatever is left of the old process
                let _ = runner.stop(&run, Duration::from_secs(5)).await;
                let started = match runner.start(&spec).await {
                    Ok(new_run) => {
                        let mut agents = job.agents.lock();
                        if let Some(agent) = agents.get_mut(&agent_id) {
                            agent.run = new_run;
                            agent.restart_count = attempt;
                        }
                        true
                    }
                    Err(e) => {
                        tracing::error!(agent = %agent_id, error = %e, "restart failed");
                        false
                    }
                };
                match tracker.on_restart_result(started) {
                    ProbeAction::BecameFailed => notify(AgentStatus::Failed),
                    _ => notify(tracker.status()),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
