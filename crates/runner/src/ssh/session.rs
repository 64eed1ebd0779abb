// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pooled SSH master connections.
//!
//! One OpenSSH master connection per `(host, user)` pair via
//! `ControlMaster=auto`; subsequent execs and copies multiplex over its
//! control socket instead of re-handshaking.

use super::config::resolve_host;
use crate::{RunnerError, SshOptions};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Connection parameters after merging job config over client SSH config.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SshTarget {
    pub host: String,
    pub user: Option<String>,
    pub port: u16,
    pub key: Option<PathBuf>,
}

/// One established master connection.
pub struct SshSession {
    target: SshTarget,
    control_path: PathBuf,
    accept_unknown_hosts: bool,
    exec_timeout: Duration,
}

impl SshSession {
    fn base_args(&self) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "ControlMaster=auto".to_string(),
            "-o".to_string(),
            format!("ControlPath={}", self.control_path.display()),
            "-o".to_string(),
            "ControlPersist=60".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            // rejecting unknown hosts is the hard default; the job file's
            // accept_unknown_hosts flag relaxes to accept-new, never to no
            format!(
                "StrictHostKeyChecking={}",
                if self.accept_unknown_hosts { "accept-new" } else { "yes" }
            ),
            "-p".to_string(),
            self.target.port.to_string(),
        ];
        if let Some(user) = &self.target.user {
            args.push("-l".to_string());
            args.push(user.clone());
        }
        if let Some(key) = &self.target.key {
            args.push("-i".to_string());
            args.push(key.display().to_string());
        }
        args
    }

    /// Run a shell command on the remote host, bounded by the exec timeout.
    pub async fn exec(&self, command: &str) -> Result<Output, RunnerError> {
        let mut cmd = tokio::process::Command::new("ssh");
        cmd.args(self.base_args()).arg(&self.target.host).arg("--").arg(command);
        let host = self.target.host.clone();
        let output = tokio::time::timeout(self.exec_timeout, cmd.output())
            .await
            .map_err(|_| RunnerError::ConnectionFailed {
                host: host.clone(),
                message: format!("remote command timed out after {:?}", self.exec_timeout),
            })?
            .map_err(|e| RunnerError::ConnectionFailed {
                host,
                message: format!("ssh exec: {}", e),
            })?;
        Ok(output)
    }

    /// Copy a local file into the remote path over the shared connection.
    pub async fn copy_to(&self, local: &Path, remote: &str) -> Result<(), RunnerError> {
        let mut cmd = tokio::process::Command::new("scp");
        cmd.arg("-o")
            .arg(format!("ControlPath={}", self.control_path.display()))
            .arg("-o")
            .arg("BatchMode=yes")
            .arg("-P")
            .arg(self.target.port.to_string())
            .arg(local);
        let dest_host = match &self.target.user {
            Some(user) => format!("{}@{}", user, self.target.host),
            None => self.target.host.clone(),
        };
        cmd.arg(format!("{}:{}", dest_host, remote));

        let output = cmd.output().await.map_err(|e| RunnerError::TransferFailed {
            host: self.target.host.clone(),
            message: format!("scp: {}", e),
        })?;
        if !output.status.success() {
            return Err(RunnerError::TransferFailed {
                host: self.target.host.clone(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    pub fn host(&self) -> &str {
        &self.target.host
    }
}

/// Sessions keyed by `(host, user)`, established on first use.
pub struct SshPool {
    control_dir: PathBuf,
    options: SshOptions,
    sessions: Mutex<HashMap<(String, Option<String>), Arc<SshSession>>>,
}

impl SshPool {
    pub fn new(options: SshOptions) -> Self {
        let control_dir =
            std::env::temp_dir().join(format!("muster-ssh-{}", std::process::id()));
        SshPool { control_dir, options, sessions: Mutex::new(HashMap::new()) }
    }

    /// Existing session for the target, or establish a new master connection.
    pub async fn session(&self, target: &SshTarget) -> Result<Arc<SshSession>, RunnerError> {
        let key = (target.host.clone(), target.user.clone());
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get(&key) {
            return Ok(session.clone());
        }

        // Precedence: agent target, then job ssh defaults, then client config
        let resolved = resolve_host(&target.host).await?;
        let merged = SshTarget {
            host: target.host.clone(),
            user: target
                .user
                .clone()
                .or_else(|| self.options.default_user.clone())
                .or(resolved.user),
            port: if target.port != 22 { target.port } else { resolved.port },
            key: target
                .key
                .clone()
                .or_else(|| self.options.default_key.clone())
                .or(resolved.identity_file),
        };

        std::fs::create_dir_all(&self.control_dir)?;
        let socket_name = format!(
            "{}-{}.sock",
            merged.host.replace(['/', ':'], "_"),
            merged.user.as_deref().unwrap_or("-")
        );
        let session = SshSession {
            control_path: self.control_dir.join(socket_name),
            target: merged,
            accept_unknown_hosts: self.options.accept_unknown_hosts,
            exec_timeout: self.options.exec_timeout,
        };

        establish(&session, self.options.connect_timeout).await?;
        tracing::info!(host = %session.target.host, user = ?session.target.user, "ssh master connection established");

        let session = Arc::new(session);
        sessions.insert(key, session.clone());
        Ok(session)
    }
}

/// Open the master connection with a no-op command; classify failures.
async fn establish(session: &SshSession, timeout: Duration) -> Result<(), RunnerError> {
    let mut cmd = tokio::process::Command::new("ssh");
    cmd.args(session.base_args())
        .arg("-o")
        .arg(format!("ConnectTimeout={}", timeout.as_secs().max(1)))
        .arg(&session.target.host)
        .arg("--")
        .arg("true");

    let host = session.target.host.clone();
    let output = tokio::time::timeout(timeout + Duration::from_secs(5), cmd.output())
        .await
        .map_err(|_| RunnerError::ConnectionFailed {
            host: host.clone(),
            message: "connect timed out".to_string(),
        })?
        .map_err(|e| RunnerError::ConnectionFailed {
            host: host.clone(),
            message: format!("ssh: {}", e),
        })?;

    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.contains("Permission denied") || stderr.contains("publickey") {
        Err(RunnerError::AuthFailed { host, message: stderr })
    } else {
        Err(RunnerError::ConnectionFailed { host, message: stderr })
    }
}
