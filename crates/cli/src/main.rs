// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `muster` — deploy and operate multi-agent jobs.

mod commands;
mod exit_error;

use clap::{Parser, Subcommand};
use exit_error::ExitError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "muster", version, about = "Declarative multi-agent deployment")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase log verbosity (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Check a job file and print every issue found
    Validate {
        /// Path to the job YAML
        job_file: PathBuf,
    },
    /// Print the resolved deployment plan without deploying
    Plan {
        job_file: PathBuf,
        /// Include the per-agent environment preview
        #[arg(long)]
        env: bool,
    },
    /// Deploy a job and monitor it until interrupted
    Start {
        job_file: PathBuf,
        /// Use this job id instead of deriving one
        #[arg(long)]
        job_id: Option<String>,
        /// Exit after deployment, leaving the fleet running
        #[arg(long)]
        detach: bool,
    },
    /// Stop a deployed job (reverse start order)
    Stop {
        job_id: String,
        /// Skip the graceful drain window
        #[arg(long)]
        force: bool,
    },
    /// List deployed jobs from the registry
    List,
    /// Show one job with live agent health
    Status { job_id: String },
    /// Print agent logs
    Logs {
        job_id: String,
        /// Restrict to one agent
        agent: Option<String>,
        /// Number of trailing lines per stream
        #[arg(long, default_value_t = 50)]
        tail: usize,
        /// Keep printing as logs grow
        #[arg(long)]
        follow: bool,
    },
    /// Remove finished jobs from the registry
    Cleanup {
        /// Remove every record, not just terminal ones
        #[arg(long)]
        all: bool,
    },
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Command::Validate { job_file } => commands::validate::run(&job_file),
        Command::Plan { job_file, env } => commands::plan::run(&job_file, env),
        Command::Start { job_file, job_id, detach } => {
            commands::start::run(&job_file, job_id, detach).await
        }
        Command::Stop { job_id, force } => commands::stop::run(&job_id, force).await,
        Command::List => commands::status::list().await,
        Command::Status { job_id } => commands::status::show(&job_id).await,
        Command::Logs { job_id, agent, tail, follow } => {
            commands::logs::run(&job_id, agent.as_deref(), tail, follow).await
        }
        Command::Cleanup { all } => commands::cleanup::run(all),
    };

    if let Err(error) = result {
        let code = match error.downcast_ref::<ExitError>() {
            Some(exit) => {
                if !exit.message.is_empty() {
                    eprintln!("{}", exit.message);
                }
                exit.code
            }
            None => {
                eprintln!("error: {:#}", error);
                1
            }
        };
        std::process::exit(code);
    }
}
