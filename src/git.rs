//! # Remote Origin Resolution
//!
//! Determines the canonical remote repository URL of the current working
//! copy by invoking the system git command.
//!
//! Using the system git means SSH keys, credential helpers, and anything
//! else configured in `~/.gitconfig` keep working. The call is local,
//! fast, and deterministic, so there is no retry: a bounded wait of one
//! second separates "git is answering" from "git is stuck" (for example
//! on a repository with a hung filesystem), and any failure is fatal to
//! the run.

use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};

/// Deadline for the `git remote get-url` subprocess.
const REMOTE_URL_TIMEOUT: Duration = Duration::from_secs(1);

/// Resolve the `origin` remote URL of the working copy in the current
/// directory.
///
/// Returns the trimmed stdout of `git remote get-url origin`. Fails with
/// `GitTimeout` when the subprocess overruns its deadline, `GitCommand`
/// (carrying the captured stderr) when it exits non-zero, and
/// `GitEmptyOutput` when it succeeds but prints nothing.
pub fn origin_url() -> Result<String> {
    let mut command = Command::new("git");
    command.args(["remote", "get-url", "origin"]);
    run_for_output(command, REMOTE_URL_TIMEOUT)
}

/// Run a command to completion within a deadline and return its trimmed
/// stdout.
fn run_for_output(mut command: Command, timeout: Duration) -> Result<String> {
    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    // std has no bounded wait, so collect the output on a helper thread
    // and bound the receive instead. On timeout the child is abandoned;
    // the run aborts immediately afterwards anyway.
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let _ = sender.send(child.wait_with_output());
    });

    let output = match receiver.recv_timeout(timeout) {
        Ok(output) => output?,
        Err(_) => return Err(Error::GitTimeout),
    };

    if !output.status.success() {
        return Err(Error::GitCommand {
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        return Err(Error::GitEmptyOutput);
    }
    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Command {
        let mut command = Command::new("sh");
        command.args(["-c", script]);
        command
    }

    #[test]
    fn test_run_for_output_trims_stdout() {
        let out = run_for_output(sh("echo 'https://github.com/acme/widget.git'"), REMOTE_URL_TIMEOUT)
            .unwrap();
        assert_eq!(out, "https://github.com/acme/widget.git");
    }

    #[test]
    fn test_run_for_output_empty_stdout() {
        let err = run_for_output(sh("true"), REMOTE_URL_TIMEOUT).unwrap_err();
        assert!(matches!(err, Error::GitEmptyOutput));
    }

    #[test]
    fn test_run_for_output_nonzero_exit_captures_stderr() {
        let err = run_for_output(sh("echo 'boom' >&2; exit 3"), REMOTE_URL_TIMEOUT).unwrap_err();
        match err {
            Error::GitCommand { status, stderr } => {
                assert_eq!(status, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected GitCommand, got {:?}", other),
        }
    }

    #[test]
    fn test_run_for_output_timeout() {
        let err = run_for_output(sh("sleep 5"), Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, Error::GitTimeout));
    }
}
