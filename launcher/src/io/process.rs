//! Helpers for running child processes with timeouts and bounded output.

use std::io::Read;
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

/// Lines of output kept when summarizing a failed command.
const DIAGNOSTIC_TAIL_LINES: usize = 20;

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
    pub timed_out: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.status.success()
    }

    /// Stdout and stderr joined, for tools that print to either stream.
    pub fn combined(&self) -> String {
        let mut text = String::from_utf8_lossy(&self.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&self.stderr));
        text
    }

    /// One-paragraph summary of why the command failed.
    ///
    /// Shows the last lines of stderr (stdout if stderr is empty). When that
    /// stream hit the capture limit, the summary says how much was dropped,
    /// since the real tail may be among the dropped bytes.
    pub fn diagnostic(&self, timeout: Duration) -> String {
        if self.timed_out {
            return format!("timed out after {}s", timeout.as_secs());
        }
        let (stream, dropped) = if self.stderr.iter().any(|b| !b.is_ascii_whitespace()) {
            (&self.stderr, self.stderr_truncated)
        } else {
            (&self.stdout, self.stdout_truncated)
        };
        let text = String::from_utf8_lossy(stream);
        let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
        let mut tail = lines[lines.len().saturating_sub(DIAGNOSTIC_TAIL_LINES)..].join("\n");
        if dropped > 0 {
            tail.push_str(&format!("\n[{dropped} more bytes of output not captured]"));
        }
        match (self.status.code(), tail.is_empty()) {
            (Some(code), true) => format!("exited with status {code}"),
            (Some(code), false) => format!("exited with status {code}:\n{tail}"),
            (None, true) => "terminated by signal".to_string(),
            (None, false) => format!("terminated by signal:\n{tail}"),
        }
    }
}

/// Run `cmd` to completion or until `timeout`, capturing both output streams.
///
/// Both pipes are drained on their own threads while the child runs, so a
/// chatty `pip install` cannot fill a pipe and stall. At most
/// `output_limit_bytes` per stream is kept; the rest is counted and dropped.
#[instrument(skip_all, fields(program = ?cmd.get_program(), timeout_secs = timeout.as_secs()))]
pub fn run_command_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|err| {
        error!(err = %err, "failed to spawn command");
        anyhow::Error::new(err).context("spawn command")
    })?;
    debug!(pid = child.id(), "child process spawned");

    let stdout_pipe = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr_pipe = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let stdout_reader = thread::spawn(move || drain_limited(stdout_pipe, output_limit_bytes));
    let stderr_reader = thread::spawn(move || drain_limited(stderr_pipe, output_limit_bytes));

    let (status, timed_out) = match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => (status, false),
        None => {
            warn!(timeout_secs = timeout.as_secs(), "command timed out, killing");
            child.kill().context("kill command")?;
            (child.wait().context("wait command after kill")?, true)
        }
    };

    let stdout = join_reader(stdout_reader).context("join stdout")?;
    let stderr = join_reader(stderr_reader).context("join stderr")?;
    if stdout.dropped > 0 || stderr.dropped > 0 {
        warn!(
            stdout_dropped = stdout.dropped,
            stderr_dropped = stderr.dropped,
            "output truncated"
        );
    }

    debug!(exit_code = ?status.code(), timed_out, "command finished");
    Ok(CommandOutput {
        status,
        stdout: stdout.kept,
        stderr: stderr.kept,
        stdout_truncated: stdout.dropped,
        stderr_truncated: stderr.dropped,
        timed_out,
    })
}

/// Run a command attached to the launcher's terminal and block until it exits.
///
/// Stdio is inherited so the operator sees the child's output and the child
/// receives the same console interrupts as the launcher.
#[instrument(skip_all, fields(program = ?cmd.get_program()))]
pub fn run_attached(mut cmd: Command) -> Result<ExitStatus> {
    cmd.stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());
    debug!("spawning attached child process");
    let mut child = cmd.spawn().context("spawn command")?;
    let status = child.wait().context("wait for command")?;
    debug!(exit_code = ?status.code(), "attached command finished");
    Ok(status)
}

/// Bytes read from one stream.
struct Drained {
    kept: Vec<u8>,
    dropped: usize,
}

fn join_reader(handle: thread::JoinHandle<Result<Drained>>) -> Result<Drained> {
    handle
        .join()
        .map_err(|_| anyhow!("output reader thread panicked"))?
}

fn drain_limited<R: Read>(mut reader: R, limit: usize) -> Result<Drained> {
    let mut drained = Drained {
        kept: Vec::new(),
        dropped: 0,
    };
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            return Ok(drained);
        }
        let keep = n.min(limit.saturating_sub(drained.kept.len()));
        drained.kept.extend_from_slice(&chunk[..keep]);
        drained.dropped += n - keep;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_limited_counts_dropped_bytes() {
        let input = vec![b'x'; 10_000];
        let drained = drain_limited(&input[..], 4_096).expect("read");
        assert_eq!(drained.kept.len(), 4_096);
        assert_eq!(drained.dropped, 10_000 - 4_096);
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let cmd = Command::new("launcher-test-program-that-does-not-exist");
        let err = run_command_with_timeout(cmd, Duration::from_secs(5), 1024).unwrap_err();
        assert!(format!("{err:#}").contains("spawn command"));
    }

    #[cfg(unix)]
    #[test]
    fn captures_output_and_failure_tail() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("echo progress; echo 'boom: bad requirement' >&2; exit 3");
        let out = run_command_with_timeout(cmd, Duration::from_secs(10), 1024).expect("run");
        assert!(!out.success());
        assert_eq!(out.status.code(), Some(3));
        let diagnostic = out.diagnostic(Duration::from_secs(10));
        assert!(diagnostic.contains("status 3"));
        assert!(diagnostic.contains("boom: bad requirement"));
        assert!(!diagnostic.contains("progress"));
    }

    #[cfg(unix)]
    #[test]
    fn diagnostic_mentions_dropped_output() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg("i=0; while [ $i -lt 200 ]; do echo \"line $i\" >&2; i=$((i+1)); done; exit 1");
        let out = run_command_with_timeout(cmd, Duration::from_secs(10), 64).expect("run");
        assert!(out.stderr_truncated > 0);
        let diagnostic = out.diagnostic(Duration::from_secs(10));
        assert!(diagnostic.contains("line 0"));
        assert!(diagnostic.contains(&format!(
            "[{} more bytes of output not captured]",
            out.stderr_truncated
        )));
    }

    #[cfg(unix)]
    #[test]
    fn kills_command_after_timeout() {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg("exec sleep 5");
        let out = run_command_with_timeout(cmd, Duration::from_millis(200), 1024).expect("run");
        assert!(out.timed_out);
        assert!(!out.success());
        assert!(out.diagnostic(Duration::from_secs(1)).contains("timed out"));
    }
}
