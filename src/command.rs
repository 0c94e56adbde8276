//! The external-command action: run one process per value, capture its merged
//! stdout/stderr under a timeout, and hand successful output to the sink.

use crate::config::CommandOptions;
use crate::error::ConfigError;
use crate::output::OutputSink;
use crate::worker::Action;
use anyhow::Context;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use wait_timeout::ChildExt;

/// Environment variable carrying the current value into the child.
pub const VALUE_ENV: &str = "VALRUN_VALUE";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("failed to spawn command {command:?}: {error}")]
    Spawn { command: String, error: io::Error },

    #[error("failed to wait on command {command:?}: {error}")]
    Wait { command: String, error: io::Error },

    #[error("failed to capture output of command {command:?}: {error}")]
    Capture { command: String, error: io::Error },

    #[error("command {command:?} timed out after {timeout_ms}ms")]
    TimedOut { command: String, timeout_ms: u64 },

    #[error("failed to run command {command:?}: {output}: {status}")]
    Failed { command: String, output: String, status: ExitStatus },
}

#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    /// stdout and stderr as the child interleaved them.
    pub output: Vec<u8>,
}

/// Read `reader` to EOF on its own thread and deliver the bytes on the
/// returned channel. The thread is never joined, so a caller that stops
/// waiting simply leaves it behind.
fn spawn_capture_thread(mut reader: impl Read + Send + 'static) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = bounded(1);
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        let res = reader.read_to_end(&mut buf).map(|_| buf);
        let _ = tx.send(res);
    });
    rx
}

fn timed_out(display_command: &str, timeout: Duration) -> CommandError {
    CommandError::TimedOut {
        command: display_command.to_string(),
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}

/// Run `command` with stdout and stderr pointed at one pipe, killing it if it
/// outlives `timeout`.
///
/// The deadline also covers collecting output: if a background grandchild
/// keeps the pipe open after the child exits, the call still returns
/// `TimedOut` once `timeout` has elapsed.
pub fn run_combined_with_timeout(
    mut command: Command,
    display_command: &str,
    timeout: Duration,
) -> Result<CapturedOutput, CommandError> {
    let spawn_err = |error| CommandError::Spawn { command: display_command.to_string(), error };

    let (reader, writer) = os_pipe::pipe().map_err(spawn_err)?;
    let writer2 = writer.try_clone().map_err(spawn_err)?;
    command
        .stdin(Stdio::null())
        .stdout(Stdio::from(writer))
        .stderr(Stdio::from(writer2));
    let started = Instant::now();
    let mut child = command.spawn().map_err(spawn_err)?;
    // the parent must not keep a write end open or the reader never sees EOF
    drop(command);

    let capture = spawn_capture_thread(reader);

    let status = match child.wait_timeout(timeout) {
        Ok(Some(status)) => status,
        Ok(None) => {
            let _ = child.kill();
            let _ = child.wait();
            // capture is left behind: a grandchild may still hold the pipe open
            return Err(timed_out(display_command, timeout));
        }
        Err(error) => {
            let _ = child.kill();
            let _ = child.wait();
            return Err(CommandError::Wait { command: display_command.to_string(), error });
        }
    };

    let remaining = timeout.saturating_sub(started.elapsed());
    let output = match capture.recv_timeout(remaining) {
        Ok(res) => res.map_err(|error| CommandError::Capture { command: display_command.to_string(), error })?,
        Err(RecvTimeoutError::Timeout) => {
            tracing::debug!(command = display_command, "child exited but its output pipe is still open");
            return Err(timed_out(display_command, timeout));
        }
        Err(RecvTimeoutError::Disconnected) => {
            return Err(CommandError::Capture {
                command: display_command.to_string(),
                error: io::Error::other("capture thread panicked"),
            });
        }
    };
    Ok(CapturedOutput { status, output })
}

/// Runs `program args…` once per value with the value exported as
/// [`VALUE_ENV`]. A non-zero exit or a timeout fails the value.
pub struct CommandAction {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    sink: OutputSink,
}

impl CommandAction {
    /// Output goes to stdout in the configured mode.
    pub fn new<I, S>(program: impl Into<String>, args: I, opts: CommandOptions) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sink = OutputSink::stdout(opts.output);
        Self::with_sink(program, args, opts.timeout, sink)
    }

    pub fn with_sink<I, S>(program: impl Into<String>, args: I, timeout: Duration, sink: OutputSink) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let program = program.into();
        if program.trim().is_empty() {
            return Err(ConfigError::MissingCommand);
        }
        Ok(Self {
            program,
            args: args.into_iter().map(Into::into).collect(),
            timeout,
            sink,
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl Action for CommandAction {
    fn call(&self, value: &str) -> anyhow::Result<()> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).env(VALUE_ENV, value);

        let captured = run_combined_with_timeout(command, &self.program, self.timeout)?;
        let text = String::from_utf8_lossy(&captured.output);
        if !captured.status.success() {
            return Err(CommandError::Failed {
                command: self.program.clone(),
                output: text.trim_end().to_string(),
                status: captured.status,
            }
            .into());
        }
        self.sink
            .emit(value, &text)
            .with_context(|| format!("writing output of command {:?}", self.program))
    }
}
