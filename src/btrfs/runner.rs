//! btrfs::runner
//!
//! Subprocess execution for the snapshot tool.
//!
//! # Modes
//!
//! - [`ProcessRunner::run`]: run to completion, capturing stdout and stderr
//! - [`ProcessRunner::run_streaming`]: hand the live stdout of a running
//!   process to a handler (used by `send` and `subvolume list`)
//! - [`ProcessRunner::run_feeding`]: copy a reader into the stdin of a
//!   running process (used by `receive`)
//!
//! # Invariants
//!
//! - stderr is always drained, on success too, so a chatty tool can never
//!   block on a full pipe
//! - Streams move through fixed-size buffers; payloads are never collected
//!   in memory
//! - Every invocation and its stderr go to the `tracing` log
//! - No timeouts and no retries: a call blocks until the process exits

use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, info, warn};

use super::error::{BtrfsError, ProcessError};

/// Captured output of a completed process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// Standard output, lossily decoded
    pub stdout: String,
    /// Standard error, lossily decoded
    pub stderr: String,
}

/// Runs the external tool and turns failures into typed errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRunner {
    tool: OsString,
}

impl ProcessRunner {
    /// A runner invoking `tool` (a binary name looked up on `PATH`, or a
    /// path).
    pub fn new(tool: impl Into<OsString>) -> Self {
        Self { tool: tool.into() }
    }

    /// The tool binary.
    pub fn tool(&self) -> &OsStr {
        &self.tool
    }

    /// A command invoking the tool with `args`.
    pub fn tool_command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = Command::new(&self.tool);
        cmd.args(args);
        cmd
    }

    /// Run `cmd` to completion.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::Spawn`] if the process cannot be started
    /// - [`ProcessError::Failed`] if it exits nonzero; carries stderr
    pub fn run(&self, mut cmd: Command) -> Result<ProcessOutput, ProcessError> {
        let command = describe(&cmd);
        info!(command = %command, "running");

        let output = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ProcessError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        log_stderr(&command, &stderr);
        check_status(&command, output.status, &stderr)?;

        Ok(ProcessOutput { stdout, stderr })
    }

    /// Run `cmd`, passing its live stdout to `handler`.
    ///
    /// The handler runs on the calling thread while the process produces
    /// data. It must read the stream to the end (or fail): once it returns,
    /// the read end is closed, and a process still writing then dies of a
    /// broken pipe, which fails the call.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::Spawn`] if the process cannot be started
    /// - [`BtrfsError::Stream`] if the handler fails; the process is killed
    /// - [`ProcessError::Failed`] if the process exits nonzero
    pub fn run_streaming<T, F>(&self, mut cmd: Command, handler: F) -> Result<T, BtrfsError>
    where
        F: FnOnce(&mut dyn Read) -> io::Result<T>,
    {
        let command = describe(&cmd);
        info!(command = %command, "running (streaming stdout)");

        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stderr_drain = child.stderr.take().map(drain);

        let result = match child.stdout.take() {
            Some(mut stdout) => handler(&mut stdout),
            None => Err(io::Error::new(io::ErrorKind::Other, "stdout not captured")),
        };

        if result.is_err() {
            // The child may already be gone; nothing to do about a failed kill.
            let _ = child.kill();
        }
        let status = child.wait();
        let stderr = join_drain(stderr_drain);
        log_stderr(&command, &stderr);

        let value = match result {
            Ok(value) => value,
            Err(source) => {
                warn!(command = %command, error = %source, "stream handler failed");
                return Err(BtrfsError::Stream {
                    command,
                    source,
                    stderr,
                });
            }
        };

        let status = status.map_err(|source| BtrfsError::Stream {
            command: command.clone(),
            source,
            stderr: stderr.clone(),
        })?;
        check_status(&command, status, &stderr)?;

        Ok(value)
    }

    /// Run `cmd`, copying `input` into its stdin, then closing stdin.
    ///
    /// `input` is consumed; it is dropped (closed) when this returns.
    /// Returns the number of bytes copied.
    ///
    /// # Errors
    ///
    /// - [`ProcessError::Spawn`] if the process cannot be started
    /// - [`ProcessError::Failed`] if the process exits nonzero, including
    ///   when it stops reading early and the copy hits a broken pipe
    /// - [`BtrfsError::Stream`] if reading `input` fails (the process is
    ///   killed), or stdin breaks while the process still exits cleanly
    pub fn run_feeding<R: Read>(
        &self,
        mut cmd: Command,
        mut input: R,
    ) -> Result<u64, BtrfsError> {
        let command = describe(&cmd);
        info!(command = %command, "running (streaming stdin)");

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout_drain = child.stdout.take().map(drain);
        let stderr_drain = child.stderr.take().map(drain);

        // stdin is dropped at the end of the match arm, signalling EOF.
        let copied = match child.stdin.take() {
            Some(mut stdin) => io::copy(&mut input, &mut stdin),
            None => Err(io::Error::new(io::ErrorKind::Other, "stdin not captured")),
        };

        // A broken pipe means the process stopped reading; its exit status
        // says why.
        let rejected = matches!(&copied, Err(e) if e.kind() == io::ErrorKind::BrokenPipe);
        if copied.is_err() && !rejected {
            let _ = child.kill();
        }
        let status = child.wait();
        let stdout = join_drain(stdout_drain);
        let stderr = join_drain(stderr_drain);
        if !stdout.trim().is_empty() {
            debug!(command = %command, stdout = stdout.trim(), "tool stdout");
        }
        log_stderr(&command, &stderr);

        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(source) => {
                if rejected {
                    if let Ok(status) = &status {
                        check_status(&command, *status, &stderr)?;
                    }
                }
                warn!(command = %command, error = %source, "stream copy failed");
                return Err(BtrfsError::Stream {
                    command,
                    source,
                    stderr,
                });
            }
        };
        info!(command = %command, bytes, "copied stream");

        let status = status.map_err(|source| BtrfsError::Stream {
            command: command.clone(),
            source,
            stderr: stderr.clone(),
        })?;
        check_status(&command, status, &stderr)?;

        Ok(bytes)
    }
}

/// Render a command line for logs and errors.
pub fn describe(cmd: &Command) -> String {
    let mut out = cmd.get_program().to_string_lossy().into_owned();
    for arg in cmd.get_args() {
        out.push(' ');
        out.push_str(&arg.to_string_lossy());
    }
    out
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        // A read error ends the capture; whatever arrived is still useful.
        let _ = reader.read_to_end(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    })
}

fn join_drain(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn log_stderr(command: &str, stderr: &str) {
    let trimmed = stderr.trim();
    if !trimmed.is_empty() {
        debug!(command = %command, stderr = trimmed, "tool stderr");
    }
}

fn check_status(command: &str, status: ExitStatus, stderr: &str) -> Result<(), ProcessError> {
    if status.success() {
        return Ok(());
    }
    warn!(command = %command, status = %status, stderr = stderr.trim(), "tool failed");
    Err(ProcessError::Failed {
        command: command.to_string(),
        status: status.to_string(),
        stderr: stderr.trim().to_string(),
    })
}
