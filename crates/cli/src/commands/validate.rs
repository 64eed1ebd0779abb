// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `muster validate` — check a job file and report every issue.

use crate::exit_error::ExitError;
use anyhow::Result;
use muster_jobfile::LoadError;
use std::path::Path;

pub fn run(job_file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(job_file)
        .map_err(|e| ExitError::new(1, format!("cannot read {}: {}", job_file.display(), e)))?;

    match muster_jobfile::load_str(&text) {
        Ok((def, warnings)) => {
            for warning in &warnings {
                println!("{}", warning);
            }
            println!(
                "ok: '{}' with {} agent(s), topology {}",
                def.name,
                def.agents.len(),
                def.topology
            );
            Ok(())
        }
        Err(LoadError::Invalid { issues }) => {
            for issue in &issues {
                println!("{}", issue);
            }
            let fatal = issues.iter().filter(|i| i.is_fatal()).count();
            Err(ExitError::new(2, format!("{} fatal issue(s)", fatal)).into())
        }
        Err(e) => Err(ExitError::new(2, e.to_string()).into()),
    }
}
