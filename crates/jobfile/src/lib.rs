// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! muster-jobfile: YAML job file loading and validation.
//!
//! [`load`] turns a job file into a validated [`muster_core::JobDefinition`]
//! or a [`LoadError`] carrying *every* problem found, never just the first.

mod issue;
mod load;
mod substitute;
mod validate;

pub use issue::{Issue, IssueKind, Severity};
pub use load::{dump, load, load_str, LoadError};
pub use substitute::substitute_env;
pub use validate::validate;
