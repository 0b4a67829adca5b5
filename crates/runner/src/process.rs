// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-group spawning with merged stdout/stderr streaming and a
//! cancel/timeout poll loop.

use crate::cancel::CancelToken;
use crate::outcome::RunOutcome;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on how long the poll loop can go between cancel/timeout checks.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long to wait after SIGTERM before escalating to SIGKILL.
const TERMINATE_GRACE: Duration = Duration::from_millis(500);

/// Spawn `argv[0]` with the rest as arguments, in its own process group,
/// merging stdout and stderr into a single ordered stream delivered to
/// `on_line`. Returns once the process exits, is cancelled via `cancel`,
/// or exceeds `timeout`.
pub fn run(
    argv: &[&str],
    cwd: Option<&Path>,
    env: &[(String, String)],
    timeout: Duration,
    cancel: &CancelToken,
    mut on_line: impl FnMut(&str),
) -> RunOutcome {
    let Some((program, args)) = argv.split_first() else {
        return RunOutcome::SpawnFailed("empty argv".to_string());
    };

    let mut command = Command::new(program);
    command.args(args);
    if let Some(cwd) = cwd {
        command.current_dir(cwd);
    }
    command.env_clear();
    command.envs(env.iter().map(|(k, v)| (k.clone(), v.clone())));
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(e) => return RunOutcome::SpawnFailed(e.to_string()),
    };
    let pid = child.id();

    let stdout = match child.stdout.take() {
        Some(s) => s,
        None => return RunOutcome::SpawnFailed("missing stdout pipe".to_string()),
    };
    let stderr = match child.stderr.take() {
        Some(s) => s,
        None => return RunOutcome::SpawnFailed("missing stderr pipe".to_string()),
    };

    let (tx, rx) = mpsc::channel::<String>();
    let tx_stderr = tx.clone();
    let stdout_thread = thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    let stderr_thread = thread::spawn(move || {
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            if tx_stderr.send(line).is_err() {
                break;
            }
        }
    });

    let deadline = Instant::now() + timeout;
    let mut terminated = None;
    loop {
        if cancel.is_set() {
            terminate_process_group(pid, &mut child);
            terminated = Some(RunOutcome::Cancelled);
            break;
        }
        if Instant::now() >= deadline {
            tracing::error!(pid, "timeout exceeded");
            terminate_process_group(pid, &mut child);
            terminated = Some(RunOutcome::TimedOut);
            break;
        }
        match rx.recv_timeout(POLL_INTERVAL) {
            Ok(line) => on_line(&line),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    while let Ok(line) = rx.try_recv() {
        on_line(&line);
    }
    let _ = stdout_thread.join();
    let _ = stderr_thread.join();

    if let Some(outcome) = terminated {
        let _ = child.wait();
        return outcome;
    }

    match child.wait() {
        Ok(status) if status.success() => RunOutcome::Ok,
        Ok(status) => RunOutcome::NonZeroExit(status.code().unwrap_or(-1)),
        Err(e) => RunOutcome::SpawnFailed(e.to_string()),
    }
}

#[cfg(unix)]
fn terminate_process_group(pid: u32, child: &mut Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let pgid = Pid::from_raw(pid as i32);
    if killpg(pgid, Signal::SIGTERM).is_err() {
        return;
    }
    tracing::warn!(pid, "process group terminated with SIGTERM");

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(_)) => return,
            Ok(None) => {
                if start.elapsed() >= TERMINATE_GRACE {
                    break;
                }
                thread::sleep(Duration::from_millis(50));
            }
            Err(_) => return,
        }
    }
    tracing::warn!(pid, "escalating to SIGKILL after grace period");
    let _ = killpg(pgid, Signal::SIGKILL);
}

#[cfg(not(unix))]
fn terminate_process_group(_pid: u32, child: &mut Child) {
    let _ = child.kill();
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
