// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deployment orchestration.
//!
//! `deploy` executes the resolved plan stage by stage: concurrent starts
//! within a stage, a `/health` gate before the next stage begins, and
//! reverse-order teardown when anything fails. Job summaries persist to the
//! registry so `stop`/`status`/`logs` work from a fresh process.

use crate::deployed::{AgentRuntimeHandle, AgentStatus, DeployedJob, RunnerKind};
use crate::envcompose::compose_agent_env;
use crate::probe::probe_health;
use crate::registry::{JobRecord, JobRegistry, RegistryError};
use muster_core::{
    resolve, AgentName, Clock, DeployState, DeployStrategy, JobDefinition, JobId, PlanError,
    SystemClock,
};
use muster_runner::{LocalRunner, Runner, RunnerError, SshOptions, SshRunner, StartSpec};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;

/// Grace budget for agent shutdown before escalation.
const STOP_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("agent '{agent}': {source}")]
    Runner {
        agent: AgentName,
        #[source]
        source: RunnerError,
    },
    #[error("agent '{agent}' never became healthy after {attempts} probes")]
    HealthGate { agent: AgentName, attempts: u32 },
    #[error("deployment exceeded its {0:?} budget")]
    Timeout(Duration),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("agent binary not found; set MUSTER_AGENT_BIN or install muster-agent")]
    AgentBinaryMissing,
    #[error("job '{0}' is not running")]
    NotRunning(JobId),
}

/// Program and leading args every agent process is launched with.
#[derive(Debug, Clone)]
pub struct AgentCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl AgentCommand {
    /// `MUSTER_AGENT_BIN` override, a `muster-agent` beside the current
    /// binary, or `muster-agent` on PATH.
    pub fn resolve() -> Self {
        if let Ok(program) = std::env::var("MUSTER_AGENT_BIN") {
            return AgentCommand { program, args: vec![] };
        }
        if let Ok(exe) = std::env::current_exe() {
            let sibling = exe.with_file_name("muster-agent");
            if sibling.is_file() {
                return AgentCommand { program: sibling.display().to_string(), args: vec![] };
            }
        }
        AgentCommand { program: "muster-agent".to_string(), args: vec![] }
    }
}

/// The two concrete runners, selected per agent target.
pub struct Runners {
    local: LocalRunner,
    ssh: SshRunner,
}

impl Runners {
    pub fn new(ssh_options: SshOptions) -> Self {
        Runners { local: LocalRunner::new(), ssh: SshRunner::new(ssh_options) }
    }

    pub fn for_kind(&self, kind: RunnerKind) -> &dyn Runner {
        match kind {
            RunnerKind::Local => &self.local,
            RunnerKind::Ssh => &self.ssh,
        }
    }

    pub fn local(&self) -> &LocalRunner {
        &self.local
    }
}

/// Operator overrides for one deploy invocation.
#[derive(Debug, Clone, Default)]
pub struct DeployOverrides {
    pub job_id: Option<JobId>,
}

/// Executes deployment plans and owns the resulting jobs.
pub struct Orchestrator<C: Clock = SystemClock> {
    clock: C,
    state_dir: PathBuf,
    registry: JobRegistry,
    http: reqwest::Client,
    agent_command: AgentCommand,
}

impl Orchestrator<SystemClock> {
    pub fn new(state_dir: PathBuf) -> Self {
        Self::with_parts(state_dir, SystemClock, AgentCommand::resolve())
    }
}

impl<C: Clock> Orchestrator<C> {
    pub fn with_parts(state_dir: PathBuf, clock: C, agent_command: AgentCommand) -> Self {
        let registry = JobRegistry::new(&state_dir);
        Orchestrator {
            clock,
            state_dir,
            registry,
            http: reqwest::Client::new(),
            agent_command,
        }
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    pub fn log_dir(&self, job_id: &JobId) -> PathBuf {
        self.state_dir.join("logs/jobs").join(job_id.as_str())
    }

    /// Deploy a validated definition; on failure every already-started agent
    /// is stopped in reverse start order and the job is recorded as failed.
    pub async fn deploy(
        &self,
        def: JobDefinition,
        overrides: DeployOverrides,
        runners: Arc<Runners>,
    ) -> Result<DeployedJob, DeployError> {
        let plan = resolve(&def)?;
        let job_id = overrides
            .job_id
            .unwrap_or_else(|| JobId::derive(&def.name, self.clock.epoch_secs()));
        let log_dir = self.log_dir(&job_id);
        std::fs::create_dir_all(&log_dir).map_err(RegistryError::Io)?;

        tracing::info!(
            job = %job_id,
            stages = plan.stages.len(),
            agents = plan.agent_count(),
            "deploying"
        );

        let mut job = DeployedJob {
            job_id: job_id.clone(),
            definition: def,
            plan,
            agents: Arc::new(parking_lot::Mutex::new(BTreeMap::new())),
            start_order: Vec::new(),
            start_time_ms: self.clock.epoch_ms(),
            state: DeployState::Deploying,
        };
        self.persist(&job)?;

        let budget = job.definition.deployment.timeout;
        let result = tokio::time::timeout(budget, self.run_stages(&mut job, &runners)).await;
        match result {
            Ok(Ok(())) => {
                job.state = DeployState::Running;
                self.persist(&job)?;
                tracing::info!(job = %job.job_id, "deployment complete");
                Ok(job)
            }
            Ok(Err(e)) => {
                self.abort(&mut job, &runners).await;
                self.persist(&job)?;
                Err(e)
            }
            Err(_) => {
                self.abort(&mut job, &runners).await;
                self.persist(&job)?;
                Err(DeployError::Timeout(budget))
            }
        }
    }

    async fn run_stages(
        &self,
        job: &mut DeployedJob,
        runners: &Arc<Runners>,
    ) -> Result<(), DeployError> {
        let stages = job.plan.stages.clone();
        let strategy = job.definition.deployment.strategy;

        match strategy {
            DeployStrategy::Sequential => {
                for stage in &stages {
                    for agent_id in stage {
                        self.start_agent(job, agent_id, runners).await?;
                        self.gate_agents(job, std::slice::from_ref(agent_id)).await?;
                    }
                }
            }
            DeployStrategy::Staged => {
                for stage in &stages {
                    self.start_stage(job, stage, runners).await?;
                    self.gate_agents(job, stage).await?;
                }
            }
            DeployStrategy::Parallel => {
                // stage order still drives start order, but nothing gates
                // between stages; health is awaited across the whole fleet
                for stage in &stages {
                    self.start_stage(job, stage, runners).await?;
                }
                let all: Vec<AgentName> = stages.iter().flatten().cloned().collect();
                self.gate_agents(job, &all).await?;
            }
        }
        Ok(())
    }

    /// Start every agent of one stage concurrently.
    async fn start_stage(
        &self,
        job: &mut DeployedJob,
        stage: &[AgentName],
        runners: &Arc<Runners>,
    ) -> Result<(), DeployError> {
        let mut set: JoinSet<Result<(AgentName, AgentRuntimeHandle), DeployError>> =
            JoinSet::new();
        for agent_id in stage {
            let spec = self.start_spec(job, agent_id)?;
            let kind = self.runner_kind(job, agent_id);
            let url = job.plan.urls[agent_id].clone();
            let runners = runners.clone();
            let agent_id = agent_id.clone();
            set.spawn(async move {
                let run = runners
                    .for_kind(kind)
                    .start(&spec)
                    .await
                    .map_err(|source| DeployError::Runner { agent: agent_id.clone(), source })?;
                Ok((
                    agent_id.clone(),
                    AgentRuntimeHandle {
                        agent_id,
                        url,
                        runner: kind,
                        run,
                        spec,
                        last_status: AgentStatus::Starting,
                        restart_count: 0,
                        exit_code: None,
                    },
                ))
            });
        }

        let mut first_error = None;
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(Ok((agent_id, handle))) => {
                    job.agents.lock().insert(agent_id.clone(), handle);
                    job.start_order.push(agent_id);
                }
                Ok(Err(e)) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
                Err(join_err) => {
                    if first_error.is_none() {
                        first_error = Some(DeployError::Runner {
                            agent: AgentName::new("unknown"),
                            source: RunnerError::Io(std::io::Error::other(join_err)),
                        });
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn start_agent(
        &self,
        job: &mut DeployedJob,
        agent_id: &AgentName,
        runners: &Arc<Runners>,
    ) -> Result<(), DeployError> {
        let spec = self.start_spec(job, agent_id)?;
        let kind = self.runner_kind(job, agent_id);
        let run = runners
            .for_kind(kind)
            .start(&spec)
            .await
            .map_err(|source| DeployError::Runner { agent: agent_id.clone(), source })?;
        let handle = AgentRuntimeHandle {
            agent_id: agent_id.clone(),
            url: job.plan.urls[agent_id].clone(),
            runner: kind,
            run,
            spec,
            last_status: AgentStatus::Starting,
            restart_count: 0,
            exit_code: None,
        };
        job.agents.lock().insert(agent_id.clone(), handle);
        job.start_order.push(agent_id.clone());
        Ok(())
    }

    /// Await `/health` from each agent; marks them healthy as they answer.
    async fn gate_agents(
        &self,
        job: &DeployedJob,
        agents: &[AgentName],
    ) -> Result<(), DeployError> {
        let hc = &job.definition.deployment.health_check;
        for agent_id in agents {
            let url = job.plan.urls[agent_id].clone();
            let mut attempts = 0u32;
            loop {
                if probe_health(&self.http, &url, hc.timeout).await {
                    job.set_status(agent_id, AgentStatus::Healthy);
                    tracing::info!(agent = %agent_id, url = %url, "agent healthy");
                    break;
                }
                attempts += 1;
                if attempts >= hc.retries {
                    job.set_status(agent_id, AgentStatus::Failed);
                    return Err(DeployError::HealthGate {
                        agent: agent_id.clone(),
                        attempts,
                    });
                }
                tokio::time::sleep(hc.interval).await;
            }
        }
        Ok(())
    }

    fn runner_kind(&self, job: &DeployedJob, agent_id: &AgentName) -> RunnerKind {
        match job.definition.agent(agent_id).map(|a| a.target.is_remote()) {
            Some(true) => RunnerKind::Ssh,
            _ => RunnerKind::Local,
        }
    }

    fn start_spec(&self, job: &DeployedJob, agent_id: &AgentName) -> Result<StartSpec, DeployError> {
        let agent = job
            .definition
            .agent(agent_id)
            .ok_or_else(|| PlanError::UnknownAgent(agent_id.clone()))?;
        let env = compose_agent_env(&job.definition, &job.plan, agent, &job.job_id);
        let transfer = if agent.target.is_remote() {
            let program = PathBuf::from(&self.agent_command.program);
            if !program.is_file() {
                return Err(DeployError::AgentBinaryMissing);
            }
            Some(program)
        } else {
            None
        };
        Ok(StartSpec {
            job_id: job.job_id.clone(),
            agent_id: agent_id.clone(),
            display_name: agent.display_name().to_string(),
            program: self.agent_command.program.clone(),
            args: self.agent_command.args.clone(),
            env,
            log_dir: self.log_dir(&job.job_id),
            transfer,
            target: agent.target.clone(),
        })
    }

    /// Reverse-order teardown after a failed deploy.
    async fn abort(&self, job: &mut DeployedJob, runners: &Arc<Runners>) {
        tracing::warn!(job = %job.job_id, "deployment failed, tearing down started agents");
        self.stop_agents(job, runners, true).await;
        job.state = DeployState::Failed;
    }

    /// Stop a job's agents in reverse start order.
    async fn stop_agents(&self, job: &mut DeployedJob, runners: &Arc<Runners>, graceful: bool) {
        let order: Vec<AgentName> = job.start_order.iter().rev().cloned().collect();
        for agent_id in order {
            let Some((run, kind)) = job
                .agents
                .lock()
                .get(&agent_id)
                .map(|a| (a.run.clone(), a.runner))
            else {
                continue;
            };
            let runner = runners.for_kind(kind);
            let timeout = if graceful { STOP_GRACE } else { Duration::from_millis(100) };
            match runner.stop(&run, timeout).await {
                Ok(()) => {
                    tracing::info!(agent = %agent_id, "agent stopped");
                }
                Err(e) => {
                    tracing::warn!(agent = %agent_id, error = %e, "stop failed");
                }
            }
            let exit_code = runners.local().exit_code(run.pid).flatten();
            let mut agents = job.agents.lock();
            if let Some(agent) = agents.get_mut(&agent_id) {
                agent.last_status = AgentStatus::Stopped;
                agent.exit_code = exit_code;
            }
        }
    }

    /// Stop a live job in reverse stage order and persist the outcome.
    pub async fn stop(
        &self,
        job: &mut DeployedJob,
        runners: &Arc<Runners>,
        graceful: bool,
    ) -> Result<(), DeployError> {
        if job.state == DeployState::Stopped {
            return Ok(());
        }
        job.state = DeployState::Stopping;
        self.persist(&*job)?;
        self.stop_agents(job, runners, graceful).await;
        job.state = DeployState::Stopped;
        let mut record = JobRecord::from_deployed(job, &self.log_dir(&job.job_id));
        record.stop_time_ms = Some(self.clock.epoch_ms());
        self.registry.upsert(&record)?;
        Ok(())
    }

    /// Stop a job known only from the registry (fresh orchestrator process).
    pub async fn stop_by_id(
        &self,
        job_id: &JobId,
        runners: &Arc<Runners>,
        graceful: bool,
    ) -> Result<JobRecord, DeployError> {
        let mut record = self.registry.get(job_id)?;
        if record.state == DeployState::Stopped {
            return Ok(record);
        }
        // reverse of recorded order
        for agent in record.agents.iter_mut().rev() {
            let runner = runners.for_kind(agent.runner);
            let timeout = if graceful { STOP_GRACE } else { Duration::from_millis(100) };
            if let Err(e) = runner.stop(&agent.run, timeout).await {
                tracing::warn!(agent = %agent.id, error = %e, "stop failed");
            }
            agent.status = AgentStatus::Stopped;
        }
        record.state = DeployState::Stopped;
        record.stop_time_ms = Some(self.clock.epoch_ms());
        self.registry.upsert(&record)?;
        Ok(record)
    }

    /// All persisted jobs; entries from dead orchestrators are reported
    /// stopped unless a live probe proves otherwise.
    pub async fn list(&self) -> Result<Vec<JobRecord>, DeployError> {
        let mut records = self.registry.load_all()?;
        for record in &mut records {
            if record.state == DeployState::Running && !self.any_agent_alive(record).await {
                record.state = DeployState::Stopped;
            }
        }
        Ok(records)
    }

    /// One job's record, refreshed against live `/health` probes.
    pub async fn status(&self, job_id: &JobId) -> Result<JobRecord, DeployError> {
        let mut record = self.registry.get(job_id)?;
        if record.state == DeployState::Running {
            let mut any_alive = false;
            for agent in &mut record.agents {
                let healthy =
                    probe_health(&self.http, &agent.url, Duration::from_secs(2)).await;
                agent.status =
                    if healthy { AgentStatus::Healthy } else { AgentStatus::Unreachable };
                any_alive |= healthy;
            }
            if !any_alive {
                record.state = DeployState::Stopped;
            }
        }
        Ok(record)
    }

    async fn any_agent_alive(&self, record: &JobRecord) -> bool {
        for agent in &record.agents {
            if probe_health(&self.http, &agent.url, Duration::from_millis(500)).await {
                return true;
            }
        }
        false
    }

    /// Tail log lines per agent: `(agent, stream, lines)`.
    pub fn logs(
        &self,
        job_id: &JobId,
        agent: Option<&AgentName>,
        tail: usize,
    ) -> Result<Vec<(AgentName, String, Vec<String>)>, DeployError> {
        let record = self.registry.get(job_id)?;
        let mut out = Vec::new();
        for rec in &record.agents {
            if let Some(wanted) = agent {
                if &rec.id != wanted {
                    continue;
                }
            }
            for (stream, path) in
                [("stdout", &rec.run.stdout_log), ("stderr", &rec.run.stderr_log)]
            {
                let lines = match rec.run.location {
                    muster_runner::RunLocation::Local => {
                        muster_runner::tail_file(Path::new(path), tail).unwrap_or_default()
                    }
                    muster_runner::RunLocation::Remote { ref host, .. } => {
                        vec![format!("(remote log on {}: {})", host, path)]
                    }
                };
                out.push((rec.id.clone(), stream.to_string(), lines));
            }
        }
        Ok(out)
    }

    /// Drop terminal records; `all` also drops running ones (after stopping
    /// is the caller's concern).
    pub fn cleanup(&self, all: bool) -> Result<Vec<JobRecord>, DeployError> {
        Ok(self
            .registry
            .remove_where(|r| all || r.state.is_terminal())?)
    }

    fn persist(&self, job: &DeployedJob) -> Result<(), RegistryError> {
        let record = JobRecord::from_deployed(job, &self.log_dir(&job.job_id));
        self.registry.upsert(&record)
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
