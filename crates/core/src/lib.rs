// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! muster-core: shared data model for the muster deployment engine.
//!
//! Holds the job definition types, the topology variants, and the pure
//! topology-to-plan resolver. Everything here is IO-free; loading and
//! validation live in `muster-jobfile`, execution in `muster-engine`.

pub mod macros;

pub mod clock;
pub mod duration;
pub mod envvars;
pub mod id;
pub mod job;
pub mod plan;
pub mod target;
pub mod topology;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use duration::parse_duration;
pub use id::{short, AgentName, JobId};
pub use job::{
    AgentConfig, AgentSettings, DeployState, DeployStrategy, DeploymentOptions, ExecutionOptions,
    HealthCheckConfig, JobDefinition, NetworkOptions, ResourceHints, RestartPolicy, SshDefaults,
};
pub use plan::{resolve, DeploymentPlan, PlanError};
pub use target::Target;
pub use topology::{DagEdge, EdgeTargets, PipelineStage, Topology};
