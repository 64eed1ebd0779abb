// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local subprocess runner.

use crate::tail::tail_string;
use crate::{RunHandle, RunLocation, Runner, RunnerError, SignalKind, StartSpec};
use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

/// How long after spawn to check for an immediate crash.
fn spawn_check_delay() -> Duration {
    std::env::var("MUSTER_SPAWN_CHECK_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(150))
}

/// Runs agents as direct children of the orchestrator process.
///
/// Children are detached from the runner's lifetime (stop works from a fresh
/// process via the pid in the handle); a reaper task per child prevents
/// zombies while the orchestrator stays alive and records the exit code.
#[derive(Clone, Default)]
pub struct LocalRunner {
    exits: Arc<Mutex<HashMap<u32, Option<i32>>>>,
}

impl LocalRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit code observed by the reaper, if the process has exited.
    pub fn exit_code(&self, pid: u32) -> Option<Option<i32>> {
        self.exits.lock().get(&pid).copied()
    }

    fn signal_pid(pid: u32, signal: Signal) -> nix::Result<()> {
        kill(Pid::from_raw(pid as i32), signal)
    }

    /// Whether a pid refers to a live process (signal 0 succeeds).
    pub fn pid_alive(pid: u32) -> bool {
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }
}

#[async_trait]
impl Runner for LocalRunner {
    async fn start(&self, spec: &StartSpec) -> Result<RunHandle, RunnerError> {
        std::fs::create_dir_all(&spec.log_dir)?;
        let stdout_path = spec.log_dir.join(format!("{}.stdout.log", spec.agent_id));
        let stderr_path = spec.log_dir.join(format!("{}.stderr.log", spec.agent_id));
        let stdout_file = std::fs::File::create(&stdout_path)?;
        let stderr_file = std::fs::File::create(&stderr_path)?;

        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout_file))
            .stderr(Stdio::from(stderr_file));
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|e| RunnerError::StartFailed {
            agent: spec.agent_id.clone(),
            exit_code: None,
            stderr_tail: format!("spawn {}: {}", spec.program, e),
        })?;
        let pid = child.id().ok_or_else(|| RunnerError::StartFailed {
            agent: spec.agent_id.clone(),
            exit_code: None,
            stderr_tail: "child exited before a pid was assigned".to_string(),
        })?;

        // Reaper: collect the exit status so the child never zombies while
        // the orchestrator is alive.
        let exits = self.exits.clone();
        let reaper_agent = spec.agent_id.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => {
                    tracing::info!(agent = %reaper_agent, pid, exit = ?status.code(), "agent process exited");
                    exits.lock().insert(pid, status.code());
                }
                Err(e) => {
                    tracing::error!(agent = %reaper_agent, pid, error = %e, "failed to wait on agent process");
                    exits.lock().insert(pid, None);
                }
            }
        });

        tracing::info!(
            agent = %spec.agent_id,
            pid,
            program = %spec.program,
            stdout = %stdout_path.display(),
            "agent process spawned"
        );

        // Immediate-crash check: a process dead this early never passes the
        // health gate, so fail fast with its stderr.
        tokio::time::sleep(spawn_check_delay()).await;
        if let Some(exit_code) = self.exit_code(pid) {
            return Err(RunnerError::StartFailed {
                agent: spec.agent_id.clone(),
                exit_code,
                stderr_tail: tail_string(&stderr_path, 10),
            });
        }

        Ok(RunHandle {
            agent_id: spec.agent_id.clone(),
            pid,
            location: RunLocation::Local,
            stdout_log: stdout_path.display().to_string(),
            stderr_log: stderr_path.display().to_string(),
        })
    }

    async fn stop(&self, handle: &RunHandle, timeout: Duration) -> Result<(), RunnerError> {
        if !handle.is_local() {
            return Err(RunnerError::StopFailed {
                agent: handle.agent_id.clone(),
                message: "handle does not belong to the local runner".to_string(),
            });
        }
        if !Self::pid_alive(handle.pid) {
            return Ok(());
        }

        // ESRCH between the check and the signal means it just exited
        let _ = Self::signal_pid(handle.pid, Signal::SIGTERM);
        let deadline = tokio::time::Instant::now() + timeout;
        while Self::pid_alive(handle.pid) {
            if tokio::time::Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        if Self::pid_alive(handle.pid) {
            tracing::warn!(agent = %handle.agent_id, pid = handle.pid, "graceful stop timed out, killing");
            let _ = Self::signal_pid(handle.pid, Signal::SIGKILL);
            tokio::time::sleep(Duration::from_millis(200)).await;
            if Self::pid_alive(handle.pid) {
                return Err(RunnerError::StopFailed {
                    agent: handle.agent_id.clone(),
                    message: format!("pid {} survived SIGKILL", handle.pid),
                });
            }
        }
        Ok(())
    }

    async fn signal(&self, handle: &RunHandle, kind: SignalKind) -> Result<(), RunnerError> {
        let signal = match kind {
            SignalKind::Terminate => Signal::SIGTERM,
            SignalKind::Kill => Signal::SIGKILL,
        };
        Self::signal_pid(handle.pid, signal).map_err(|e| RunnerError::StopFailed {
            agent: handle.agent_id.clone(),
            message: format!("signal {} to pid {}: {}", kind, handle.pid, e),
        })
    }

    async fn alive(&self, handle: &RunHandle) -> bool {
        Self::pid_alive(handle.pid)
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
