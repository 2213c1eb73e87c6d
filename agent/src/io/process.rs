//! Bounded child-process execution for model calls.

use std::io::{Read, Write};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Captured child process output.
#[derive(Debug)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Bytes dropped from stdout beyond the output limit.
    pub stdout_dropped: usize,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    /// Last non-empty stderr line, for error messages.
    pub fn stderr_tail(&self) -> Option<String> {
        String::from_utf8_lossy(&self.stderr)
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
    }
}

/// Run `cmd`, feed `stdin`, and wait at most `timeout`.
///
/// Both pipes are drained on reader threads while the child runs so a chatty
/// child cannot deadlock on a full pipe. At most `output_limit_bytes` per
/// stream are kept. A child that outlives `timeout` is killed and its output
/// is discarded.
#[instrument(skip_all, fields(timeout_secs = timeout.as_secs(), output_limit_bytes))]
pub fn run_with_timeout(
    mut cmd: Command,
    stdin: &[u8],
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<ProcessOutput> {
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!(program = ?cmd.get_program(), "spawning model process");
    let mut child = cmd.spawn().context("spawn model command")?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;
    let stdout_reader = thread::spawn(move || drain_limited(stdout, output_limit_bytes));
    let stderr_reader = thread::spawn(move || drain_limited(stderr, output_limit_bytes));

    let mut child_stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("stdin was not piped"))?;
    let input = stdin.to_vec();
    // Writing happens off-thread so a child that never reads cannot stall the timeout.
    let stdin_writer = thread::spawn(move || {
        if let Err(err) = child_stdin.write_all(&input) {
            warn!(err = %err, "failed to write prompt to model stdin");
        }
    });

    let status = match child.wait_timeout(timeout).context("wait for model command")? {
        Some(status) => status,
        None => {
            warn!(timeout_secs = timeout.as_secs(), "model command timed out, killing");
            child.kill().context("kill model command")?;
            let status = child.wait().context("wait model command after kill")?;
            // Only the direct child is killed. Descendants may still hold the
            // pipes, so the reader and writer threads are detached, not joined.
            drop((stdin_writer, stdout_reader, stderr_reader));
            return Ok(ProcessOutput {
                status,
                stdout: Vec::new(),
                stderr: Vec::new(),
                stdout_dropped: 0,
                timed_out: true,
            });
        }
    };

    if stdin_writer.join().is_err() {
        warn!("stdin writer thread panicked");
    }
    let (stdout, stdout_dropped) = join_reader(stdout_reader).context("join stdout")?;
    let (stderr, _) = join_reader(stderr_reader).context("join stderr")?;
    if stdout_dropped > 0 {
        warn!(stdout_dropped, "model stdout truncated");
    }

    debug!(exit_code = ?status.code(), "model command finished");
    Ok(ProcessOutput {
        status,
        stdout,
        stderr,
        stdout_dropped,
        timed_out: false,
    })
}

fn join_reader(handle: thread::JoinHandle<Result<(Vec<u8>, usize)>>) -> Result<(Vec<u8>, usize)> {
    handle
        .join()
        .map_err(|_| anyhow!("output reader thread panicked"))?
}

fn drain_limited<R: Read>(mut reader: R, limit: usize) -> Result<(Vec<u8>, usize)> {
    let mut kept = Vec::new();
    let mut dropped = 0usize;
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).context("read output")?;
        if n == 0 {
            break;
        }
        let room = limit.saturating_sub(kept.len());
        let take = n.min(room);
        kept.extend_from_slice(&chunk[..take]);
        dropped += n - take;
    }
    Ok((kept, dropped))
}
