// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote command assembly.
//!
//! Pure string builders so the exact shell fragments are unit-testable.
//! Every user-controlled value is quoted; the only intentionally unquoted
//! value is the workdir inside [`expand_workdir`], which must stay bare so
//! the remote shell expands `~` and `${VAR}` before we quote the result.

use crate::quote::{sh_quote, sh_quote_env};

/// `echo <workdir>` with the value unquoted for remote-side expansion.
pub fn expand_workdir(workdir: &str) -> String {
    format!("echo {}", workdir)
}

/// Create the (already expanded) workdir.
pub fn mkdir(dir: &str) -> String {
    format!("mkdir -p {}", sh_quote(dir))
}

/// Resolve a bare program name to a path; output may span lines, callers
/// take the first.
pub fn resolve_program(program: &str) -> String {
    format!("command -v {}", sh_quote(program))
}

/// Launch detached under `setsid`+`nohup` so the process survives the SSH
/// session, writing logs and a pid file beside it; prints the pid last.
pub fn launch(
    workdir: &str,
    env: &[(String, String)],
    program: &str,
    args: &[String],
    agent_id: &str,
) -> String {
    let mut cmd = String::new();
    cmd.push_str(&format!("cd {} && ", sh_quote(workdir)));
    cmd.push_str("setsid nohup env");
    for (key, value) in env {
        cmd.push(' ');
        cmd.push_str(&sh_quote_env(key, value));
    }
    cmd.push(' ');
    cmd.push_str(&sh_quote(program));
    for arg in args {
        cmd.push(' ');
        cmd.push_str(&sh_quote(arg));
    }
    cmd.push_str(&format!(
        " > {} 2> {} < /dev/null & pid=$!; echo $pid > {}; echo $pid",
        sh_quote(&format!("{}.stdout.log", agent_id)),
        sh_quote(&format!("{}.stderr.log", agent_id)),
        sh_quote(&format!("{}.pid", agent_id)),
    ));
    cmd
}

/// The pid printed by [`launch`]: last non-empty stdout line.
pub fn parse_launch_pid(stdout: &str) -> Option<u32> {
    stdout.lines().rev().find(|l| !l.trim().is_empty())?.trim().parse().ok()
}

/// First non-empty line of command output (interpreter paths may be
/// multi-line when shells print banners).
pub fn first_line(output: &str) -> &str {
    output.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim()
}

pub fn send_signal(pid: u32, signal: &str) -> String {
    format!("kill -{} {}", signal, pid)
}

pub fn check_alive(pid: u32) -> String {
    format!("kill -0 {} 2>/dev/null", pid)
}

/// Best-effort pid file removal after stop.
pub fn remove_pid_file(workdir: &str, agent_id: &str) -> String {
    format!("rm -f {}/{}", sh_quote(workdir), sh_quote(&format!("{}.pid", agent_id)))
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
