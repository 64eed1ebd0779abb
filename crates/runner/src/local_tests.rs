// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tests for the local runner

use super::*;
use crate::StartSpec;
use muster_core::{JobId, Target};
use tempfile::TempDir;

fn shell_spec(logs: &TempDir, agent: &str, script: &str) -> StartSpec {
    StartSpec {
        job_id: JobId::from_string("job-test"),
        agent_id: agent.into(),
        display_name: agent.to_string(),
        program: "/bin/sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        env: vec![],
        log_dir: logs.path().to_path_buf(),
        transfer: None,
        target: Target::Localhost,
    }
}

#[tokio::test]
async fn start_and_stop_round_trip() {
    let logs = TempDir::new().unwrap();
    let runner = LocalRunner::new();
    let handle = runner.start(&shell_spec(&logs, "sleeper", "sleep 30")).await.unwrap();

    assert!(runner.alive(&handle).await);
    runner.stop(&handle, Duration::from_secs(2)).await.unwrap();
    assert!(!runner.alive(&handle).await);
}

#[tokio::test]
async fn stop_is_idempotent() {
    let logs = TempDir::new().unwrap();
    let runner = LocalRunner::new();
    let handle = runner.start(&shell_spec(&logs, "sleeper", "sleep 30")).await.unwrap();

    runner.stop(&handle, Duration::from_secs(2)).await.unwrap();
    // second stop on a dead pid is a success no-op
    runner.stop(&handle, Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn immediate_crash_reports_stderr_tail() {
    let logs = TempDir::new().unwrap();
    let runner = LocalRunner::new();
    let err = runner
        .start(&shell_spec(&logs, "crasher", "echo boom >&2; exit 3"))
        .await
        .unwrap_err();

    match err {
        RunnerError::StartFailed { exit_code, stderr_tail, .. } => {
            assert_eq!(exit_code, Some(3));
            assert!(stderr_tail.contains("boom"), "tail was: {}", stderr_tail);
        }
        other => panic!("expected StartFailed, got {}", other),
    }
}

#[tokio::test]
async fn missing_program_fails_to_spawn() {
    let logs = TempDir::new().unwrap();
    let runner = LocalRunner::new();
    let mut spec = shell_spec(&logs, "ghost", "");
    spec.program = "/nonexistent/muster-agent".to_string();
    assert!(matches!(
        runner.start(&spec).await,
        Err(RunnerError::StartFailed { .. })
    ));
}

#[tokio::test]
async fn stdout_is_captured_to_log_file() {
    let logs = TempDir::new().unwrap();
    let runner = LocalRunner::new();
    let handle = runner
        .start(&shell_spec(&logs, "talker", "echo started; sleep 30"))
        .await
        .unwrap();

    // give the child a moment to flush
    tokio::time::sleep(Duration::from_millis(200)).await;
    let contents = std::fs::read_to_string(&handle.stdout_log).unwrap();
    assert!(contents.contains("started"));
    runner.stop(&handle, Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn env_is_passed_to_child() {
    let logs = TempDir::new().unwrap();
    let runner = LocalRunner::new();
    let mut spec = shell_spec(&logs, "env-echo", "echo \"port=$AGENT_PORT\"; sleep 30");
    spec.env.push(("AGENT_PORT".to_string(), "9001".to_string()));
    let handle = runner.start(&spec).await.unwrap();

    tokio::time::sleep(Duration::from_millis(200)).await;
    let contents = std::fs::read_to_string(&handle.stdout_log).unwrap();
    assert!(contents.contains("port=9001"));
    runner.stop(&handle, Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn sigterm_resistant_child_is_killed_after_timeout() {
    let logs = TempDir::new().unwrap();
    let runner = LocalRunner::new();
    let handle = runner
        .start(&shell_spec(&logs, "stubborn", "trap '' TERM; sleep 30"))
        .await
        .unwrap();

    // trap needs to be installed before we signal
    tokio::time::sleep(Duration::from_millis(200)).await;
    runner.stop(&handle, Duration::from_millis(500)).await.unwrap();
    assert!(!runner.alive(&handle).await);
}
