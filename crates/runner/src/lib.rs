// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! muster-runner: starting and stopping a single agent process on a target.
//!
//! Two concrete runners exist: [`LocalRunner`] spawns children directly,
//! [`SshRunner`] drives the system `ssh`/`scp` clients with pooled master
//! connections. The orchestrator picks one per agent from its target.

mod local;
pub mod quote;
pub mod ssh;
mod tail;

pub use local::LocalRunner;
pub use ssh::{SshOptions, SshRunner};
pub use tail::tail_file;

use async_trait::async_trait;
use muster_core::{AgentName, JobId, Target};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by runners.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("connection to {host} failed: {message}")]
    ConnectionFailed { host: String, message: String },
    #[error("authentication to {host} failed: {message}")]
    AuthFailed { host: String, message: String },
    #[error("transfer to {host} failed: {message}")]
    TransferFailed { host: String, message: String },
    #[error("agent '{agent}' failed to start (exit code {exit_code:?}): {stderr_tail}")]
    StartFailed { agent: AgentName, exit_code: Option<i32>, stderr_tail: String },
    #[error("agent '{agent}' is not alive")]
    NotAlive { agent: AgentName },
    #[error("failed to stop agent '{agent}': {message}")]
    StopFailed { agent: AgentName, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Everything a runner needs to launch one agent process.
#[derive(Debug, Clone)]
pub struct StartSpec {
    pub job_id: JobId,
    pub agent_id: AgentName,
    pub display_name: String,
    /// Program to execute. A bare name is resolved on the target
    /// (`command -v`, first line); paths are used as given.
    pub program: String,
    pub args: Vec<String>,
    /// Ordered environment pairs; later entries override earlier ones.
    pub env: Vec<(String, String)>,
    /// Local directory receiving `<agent>.{stdout,stderr}.log`.
    pub log_dir: PathBuf,
    /// File shipped into the remote workdir before launch (the agent binary).
    pub transfer: Option<PathBuf>,
    pub target: Target,
}

/// Where a started process lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunLocation {
    Local,
    Remote {
        host: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,
        #[serde(default = "default_ssh_port")]
        port: u16,
        workdir: String,
    },
}

fn default_ssh_port() -> u16 {
    22
}

/// Handle to a started agent process.
///
/// Serializable so the job registry can persist enough state for a fresh
/// orchestrator process to signal or probe the agent later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHandle {
    pub agent_id: AgentName,
    pub pid: u32,
    pub location: RunLocation,
    pub stdout_log: String,
    pub stderr_log: String,
}

impl RunHandle {
    pub fn is_local(&self) -> bool {
        self.location == RunLocation::Local
    }
}

/// Signals a runner can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Terminate,
    Kill,
}

muster_core::simple_display! {
    SignalKind {
        Terminate => "terminate",
        Kill => "kill",
    }
}

/// Start/stop one agent process on one target.
#[async_trait]
pub trait Runner: Send + Sync {
    /// Launch the process and return a handle once it is running.
    async fn start(&self, spec: &StartSpec) -> Result<RunHandle, RunnerError>;

    /// Graceful termination, escalating to kill after `timeout`.
    /// Stopping an already-dead process succeeds.
    async fn stop(&self, handle: &RunHandle, timeout: Duration) -> Result<(), RunnerError>;

    /// Deliver a single signal without waiting.
    async fn signal(&self, handle: &RunHandle, kind: SignalKind) -> Result<(), RunnerError>;

    /// Whether the process is currently running.
    async fn alive(&self, handle: &RunHandle) -> bool;
}
