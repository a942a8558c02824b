// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote program execution.
//!
//! Pagesync never talks to the content store's database directly. Instead, it
//! hands a small Ruby program to the store's own runner (`bin/rails runner`)
//! on the remote host, and lets the application persist pages itself. Each
//! program travels over a fresh command channel, is executed to completion,
//! and reports back through its exit status.
//!
//! # Atomicity
//!
//! One program is one round trip. Whether the runner's own sequence of
//! find-or-create, assign, and save is atomic is up to the remote
//! application. If a page gets created but its save aborts, all pagesync gets
//! to see is a non-zero exit status. There is no compensating action, and no
//! automatic retry.
//!
//! # See Also
//!
//! 1. [`script`] for how programs are rendered.
//! 2. [`ssh`] for the command channel itself.

pub mod script;
pub mod ssh;

use indicatif::ProgressBar;
use std::fmt::{Display, Formatter, Result as FmtResult};
use tracing::{info, instrument};

/// Program ready to be run by the remote runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteProgram {
    /// Short description used in logs.
    pub label: String,

    /// Full source of program.
    pub source: String,
}

/// Outcome of running one remote program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// Remote program exited with status zero.
    pub succeeded: bool,

    /// Exit code of remote program, -1 if it was killed by a signal.
    pub exit_code: i32,

    /// Most recent standard error output of remote program.
    pub stderr: String,
}

impl ExecutionResult {
    /// Successful execution without any error output.
    pub fn success() -> Self {
        Self {
            succeeded: true,
            exit_code: 0,
            stderr: String::new(),
        }
    }

    /// Failed execution with given exit code and error output.
    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            exit_code,
            stderr: stderr.into(),
        }
    }
}

impl Display for ExecutionResult {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match (self.succeeded, self.stderr.trim_end()) {
            (true, _) => write!(fmt, "exit status {}", self.exit_code),
            (false, "") => write!(fmt, "remote program failed with exit status {}", self.exit_code),
            (false, stderr) => write!(
                fmt,
                "remote program failed with exit status {}:\n{stderr}",
                self.exit_code
            ),
        }
    }
}

/// Run programs on the remote runner.
///
/// Implementors block until the remote program is done. A program that ran
/// but failed is an [`ExecutionResult`] with `succeeded` unset. Only failures
/// of the channel itself are errors.
pub trait RemoteExecutor {
    /// Execute remote program to completion.
    fn execute(&self, program: &RemoteProgram) -> Result<ExecutionResult>;
}

impl<E> RemoteExecutor for &E
where
    E: RemoteExecutor + ?Sized,
{
    fn execute(&self, program: &RemoteProgram) -> Result<ExecutionResult> {
        (**self).execute(program)
    }
}

/// Executor that only prints programs.
///
/// Shows what would be sent to the remote runner, without opening any
/// channel. Every program counts as successful.
#[derive(Debug, Clone)]
pub struct DryRunExecutor {
    command: String,
    bar: ProgressBar,
}

impl DryRunExecutor {
    /// Construct new dry run executor.
    ///
    /// The `command` is the channel invocation shown ahead of each program.
    pub fn new(command: impl Into<String>, bar: ProgressBar) -> Self {
        Self {
            command: command.into(),
            bar,
        }
    }
}

impl RemoteExecutor for DryRunExecutor {
    #[instrument(skip(self, program), fields(label = %program.label), level = "debug")]
    fn execute(&self, program: &RemoteProgram) -> Result<ExecutionResult> {
        info!("dry run, would send program to {}", self.command);
        self.bar.suspend(|| println!("{}", program.source));
        Ok(ExecutionResult::success())
    }
}

/// Remote execution error types.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// Channel program cannot be started.
    #[error("failed to start {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
    },

    /// Standard stream of channel program is not available.
    #[error("standard {stream} of channel program is not piped")]
    MissingPipe { stream: &'static str },

    /// Channel I/O fails while program is running.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Thread pumping a standard stream panicked.
    #[error("thread pumping standard {stream} panicked")]
    StreamPanicked { stream: &'static str },

    /// Program could not be encoded.
    #[error(transparent)]
    Encode(#[from] crate::encode::EncodeError),
}

/// Friendly result alias :3
pub type Result<T, E = RemoteError> = std::result::Result<T, E>;
