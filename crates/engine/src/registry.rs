// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent job registry.
//!
//! One JSON object per line keyed by `job_id`. Writers hold an `fs2`
//! exclusive lock on a sidecar lock file for the read-modify-write window;
//! readers snapshot whatever is on disk.

use crate::deployed::{AgentStatus, DeployedJob, RunnerKind};
use fs2::FileExt;
use muster_core::{AgentName, DeployState, JobId};
use muster_runner::RunHandle;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry io: {0}")]
    Io(#[from] std::io::Error),
    #[error("registry record is not valid JSON: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("unknown job '{0}'")]
    UnknownJob(JobId),
}

/// Persisted summary of one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: AgentName,
    pub url: String,
    pub runner: RunnerKind,
    pub run: RunHandle,
    pub status: AgentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub restart_count: u32,
}

/// Persisted summary of one job; no live handles, just enough to probe,
/// signal, and display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    pub name: String,
    pub state: DeployState,
    /// sha256 of the definition's canonical JSON; `status` flags drift.
    pub definition_hash: String,
    pub agents: Vec<AgentRecord>,
    pub start_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_time_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<AgentName>,
    pub log_dir: PathBuf,
}

impl JobRecord {
    /// Snapshot a live job into its persistent form.
    pub fn from_deployed(job: &DeployedJob, log_dir: &Path) -> Self {
        let agents = job
            .agents
            .lock()
            .values()
            .map(|a| AgentRecord {
                id: a.agent_id.clone(),
                url: a.url.clone(),
                runner: a.runner,
                run: a.run.clone(),
                status: a.last_status,
                exit_code: a.exit_code,
                restart_count: a.restart_count,
            })
            .collect();
        JobRecord {
            job_id: job.job_id.clone(),
            name: job.definition.name.clone(),
            state: job.state,
            definition_hash: definition_hash(&job.definition),
            agents,
            start_time_ms: job.start_time_ms,
            stop_time_ms: None,
            entry_point: job.definition.execution.entry_point.clone(),
            log_dir: log_dir.to_path_buf(),
        }
    }
}

/// Canonical content hash of a definition.
pub fn definition_hash(def: &muster_core::JobDefinition) -> String {
    let bytes = serde_json::to_vec(def).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    format!("{:x}", digest)
}

/// Line-oriented registry file under the state directory.
pub struct JobRegistry {
    path: PathBuf,
    lock_path: PathBuf,
}

impl JobRegistry {
    pub fn new(state_dir: &Path) -> Self {
        JobRegistry {
            path: state_dir.join("registry.jsonl"),
            lock_path: state_dir.join("registry.lock"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace the record for its `job_id`.
    pub fn upsert(&self, record: &JobRecord) -> Result<(), RegistryError> {
        let _guard = self.write_lock()?;
        let mut records = self.read_all()?;
        match records.iter_mut().find(|r| r.job_id == record.job_id) {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        self.write_all(&records)
    }

    /// All records, in file order.
    pub fn load_all(&self) -> Result<Vec<JobRecord>, RegistryError> {
        self.read_all()
    }

    pub fn get(&self, job_id: &JobId) -> Result<JobRecord, RegistryError> {
        self.read_all()?
            .into_iter()
            .find(|r| &r.job_id == job_id)
            .ok_or_else(|| RegistryError::UnknownJob(job_id.clone()))
    }

    /// Remove records matching the predicate; returns what was removed.
    pub fn remove_where(
        &self,
        predicate: impl Fn(&JobRecord) -> bool,
    ) -> Result<Vec<JobRecord>, RegistryError> {
        let _guard = self.write_lock()?;
        let records = self.read_all()?;
        let (removed, kept): (Vec<_>, Vec<_>) = records.into_iter().partition(&predicate);
        self.write_all(&kept)?;
        Ok(removed)
    }

    fn read_all(&self) -> Result<Vec<JobRecord>, RegistryError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut records = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }

    /// Rewrite atomically: temp file in the same directory, then rename.
    fn write_all(&self, records: &[JobRecord]) -> Result<(), RegistryError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let mut file = std::fs::File::create(&tmp)?;
            for record in records {
                serde_json::to_writer(&mut file, record)?;
                file.write_all(b"\n")?;
            }
            file.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn write_lock(&self) -> Result<std::fs::File, RegistryError> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::File::create(&self.lock_path)?;
        file.lock_exclusive()?;
        Ok(file)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
