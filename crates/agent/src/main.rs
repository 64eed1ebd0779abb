// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! muster-agent: one deployed agent process.
//!
//! Configured entirely from `AGENT_*` environment variables set by the
//! orchestrator; serves the A2A surface until SIGTERM/SIGINT, then drains
//! in-flight queries within a bounded grace period.

use muster_agent::{serve, AgentEnv, AgentRuntime};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Grace budget for in-flight queries at shutdown.
const DRAIN_GRACE: Duration = Duration::from_secs(5);

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let level = std::env::var(muster_core::envvars::AGENT_LOG_LEVEL)
        .unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = matches!(
        std::env::var(muster_core::envvars::AGENT_LOG_JSON).as_deref(),
        Ok("1" | "true" | "yes" | "on")
    );
    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    init_logging();

    let env = match AgentEnv::from_env() {
        Ok(env) => env,
        Err(e) => {
            eprintln!("muster-agent: {}", e);
            std::process::exit(2);
        }
    };
    let port = env.port;
    let runtime = AgentRuntime::initialize(env).await;

    let listener = match tokio::net::TcpListener::bind(("0.0.0.0", port)).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("muster-agent: bind 0.0.0.0:{}: {}", port, e);
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    spawn_signal_handler(shutdown.clone());

    let server = tokio::spawn(serve(runtime, listener, shutdown.clone()));

    shutdown.cancelled().await;
    tracing::info!("shutdown requested, draining in-flight queries");
    match tokio::time::timeout(DRAIN_GRACE, server).await {
        Ok(Ok(Ok(()))) => tracing::info!("server drained cleanly"),
        Ok(Ok(Err(e))) => tracing::error!(error = %e, "server error during drain"),
        Ok(Err(e)) => tracing::error!(error = %e, "server task failed"),
        Err(_) => tracing::warn!(grace = ?DRAIN_GRACE, "drain grace expired, exiting"),
    }
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            ) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::error!(error = %e, "failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    shutdown.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = ctrl_c => {}
                _ = sigterm.recv() => {}
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
        }
        shutdown.cancel();
    });
}
