// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH runner — agent processes on remote hosts.

pub mod command;
pub mod config;
pub mod session;

use crate::{RunHandle, RunLocation, Runner, RunnerError, SignalKind, StartSpec};
use async_trait::async_trait;
use muster_core::Target;
use session::{SshPool, SshTarget};
use std::path::PathBuf;
use std::time::Duration;

/// Pool-wide SSH behavior, from the job's deployment options.
#[derive(Debug, Clone)]
pub struct SshOptions {
    /// Relax host key checking from `yes` to `accept-new`.
    pub accept_unknown_hosts: bool,
    pub default_user: Option<String>,
    pub default_key: Option<PathBuf>,
    pub connect_timeout: Duration,
    pub exec_timeout: Duration,
}

impl Default for SshOptions {
    fn default() -> Self {
        SshOptions {
            accept_unknown_hosts: false,
            default_user: None,
            default_key: None,
            connect_timeout: Duration::from_secs(10),
            exec_timeout: Duration::from_secs(30),
        }
    }
}

/// Starts agents on remote hosts by driving the system `ssh`/`scp` clients.
///
/// Launches survive SSH disconnects (`setsid`+`nohup`); stop reconnects and
/// signals the recorded pid, so it works from a fresh orchestrator process.
pub struct SshRunner {
    pool: SshPool,
}

impl SshRunner {
    pub fn new(options: SshOptions) -> Self {
        SshRunner { pool: SshPool::new(options) }
    }

    fn target_of(&self, spec_target: &Target) -> Option<SshTarget> {
        match spec_target {
            Target::Remote { host, user, ssh_key, port, .. } => Some(SshTarget {
                host: host.clone(),
                user: user.clone(),
                port: *port,
                key: ssh_key.clone(),
            }),
            _ => None,
        }
    }

    fn handle_target(&self, handle: &RunHandle) -> Result<SshTarget, RunnerError> {
        match &handle.location {
            RunLocation::Remote { host, user, port, .. } => Ok(SshTarget {
                host: host.clone(),
                user: user.clone(),
                port: *port,
                key: None,
            }),
            RunLocation::Local => Err(RunnerError::StopFailed {
                agent: handle.agent_id.clone(),
                message: "handle does not belong to the ssh runner".to_string(),
            }),
        }
    }
}

#[async_trait]
impl Runner for SshRunner {
    async fn start(&self, spec: &StartSpec) -> Result<RunHandle, RunnerError> {
        let Target::Remote { workdir, .. } = &spec.target else {
            return Err(RunnerError::StartFailed {
                agent: spec.agent_id.clone(),
                exit_code: None,
                stderr_tail: "ssh runner requires a remote target".to_string(),
            });
        };
        let target = self.target_of(&spec.target).ok_or_else(|| RunnerError::StartFailed {
            agent: spec.agent_id.clone(),
            exit_code: None,
            stderr_tail: "ssh runner requires a remote target".to_string(),
        })?;
        let session = self.pool.session(&target).await?;

        // Expand ~/${VAR} on the remote side, then quote everywhere after
        let raw_workdir = workdir
            .clone()
            .unwrap_or_else(|| format!("~/.muster/agents/{}", spec.job_id));
        let expanded = session.exec(&command::expand_workdir(&raw_workdir)).await?;
        let workdir = command::first_line(&String::from_utf8_lossy(&expanded.stdout)).to_string();
        if workdir.is_empty() {
            return Err(RunnerError::StartFailed {
                agent: spec.agent_id.clone(),
                exit_code: expanded.status.code(),
                stderr_tail: String::from_utf8_lossy(&expanded.stderr).trim().to_string(),
            });
        }

        let mkdir = session.exec(&command::mkdir(&workdir)).await?;
        if !mkdir.status.success() {
            return Err(RunnerError::TransferFailed {
                host: session.host().to_string(),
                message: format!(
                    "mkdir {}: {}",
                    workdir,
                    String::from_utf8_lossy(&mkdir.stderr).trim()
                ),
            });
        }

        // Ship the agent binary beside its logs
        let mut program = spec.program.clone();
        if let Some(file) = &spec.transfer {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "muster-agent".to_string());
            session.copy_to(file, &format!("{}/{}", workdir, name)).await?;
            let chmod = session
                .exec(&format!(
                    "chmod +x {}/{}",
                    crate::quote::sh_quote(&workdir),
                    crate::quote::sh_quote(&name)
                ))
                .await?;
            if !chmod.status.success() {
                return Err(RunnerError::TransferFailed {
                    host: session.host().to_string(),
                    message: format!("chmod: {}", String::from_utf8_lossy(&chmod.stderr).trim()),
                });
            }
            program = format!("./{}", name);
        } else if !program.contains('/') {
            // bare interpreter or program name: resolve on the remote path
            let resolved = session.exec(&command::resolve_program(&program)).await?;
            let resolved_stdout = String::from_utf8_lossy(&resolved.stdout);
            let path = command::first_line(&resolved_stdout);
            if path.is_empty() {
                return Err(RunnerError::StartFailed {
                    agent: spec.agent_id.clone(),
                    exit_code: resolved.status.code(),
                    stderr_tail: format!("program '{}' not found on {}", program, session.host()),
                });
            }
            program = path.to_string();
        }

        let launch =
            command::launch(&workdir, &spec.env, &program, &spec.args, spec.agent_id.as_str());
        let output = session.exec(&launch).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let pid = match command::parse_launch_pid(&stdout) {
            Some(pid) => pid,
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(RunnerError::StartFailed {
                    agent: spec.agent_id.clone(),
                    exit_code: output.status.code(),
                    stderr_tail: muster_core::short(stderr.trim(), 500).to_string(),
                });
            }
        };

        tracing::info!(
            agent = %spec.agent_id,
            host = %session.host(),
            pid,
            workdir = %workdir,
            "remote agent launched"
        );

        Ok(RunHandle {
            agent_id: spec.agent_id.clone(),
            pid,
            location: RunLocation::Remote {
                host: target.host,
                user: target.user,
                port: target.port,
                workdir: workdir.clone(),
            },
            stdout_log: format!("{}/{}.stdout.log", workdir, spec.agent_id),
            stderr_log: format!("{}/{}.stderr.log", workdir, spec.agent_id),
        })
    }

    async fn stop(&self, handle: &RunHandle, timeout: Duration) -> Result<(), RunnerError> {
        let target = self.handle_target(handle)?;
        let session = self.pool.session(&target).await?;

        let _ = session.exec(&command::send_signal(handle.pid, "TERM")).await;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let check = session.exec(&command::check_alive(handle.pid)).await?;
            if !check.status.success() {
                break;
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(agent = %handle.agent_id, pid = handle.pid, "graceful remote stop timed out, killing");
                let _ = session.exec(&command::send_signal(handle.pid, "KILL")).await;
                break;
            }
            tokio::time::sleep(Duration::from_millis(500)).await;
        }

        if let RunLocation::Remote { workdir, .. } = &handle.location {
            let _ = session
                .exec(&command::remove_pid_file(workdir, handle.agent_id.as_str()))
                .await;
        }
        Ok(())
    }

    async fn signal(&self, handle: &RunHandle, kind: SignalKind) -> Result<(), RunnerError> {
        let target = self.handle_target(handle)?;
        let session = self.pool.session(&target).await?;
        let name = match kind {
            SignalKind::Terminate => "TERM",
            SignalKind::Kill => "KILL",
        };
        let output = session.exec(&command::send_signal(handle.pid, name)).await?;
        if !output.status.success() {
            return Err(RunnerError::NotAlive { agent: handle.agent_id.clone() });
        }
        Ok(())
    }

    async fn alive(&self, handle: &RunHandle) -> bool {
        let Ok(target) = self.handle_target(handle) else {
            return false;
        };
        let Ok(session) = self.pool.session(&target).await else {
            return false;
        };
        match session.exec(&command::check_alive(handle.pid)).await {
            Ok(output) => output.status.success(),
            Err(_) => false,
        }
    }
}
