// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote command channel over SSH.
//!
//! Every program gets its own `ssh` invocation of the form:
//!
//! ```text
//! ssh [options] user@host "cd '<app_dir>' && '<runner>'..."
//! ```
//!
//! The program itself is written to the standard input of `ssh`, and the
//! runner reads it from there (`bin/rails runner -`). Thus, page content
//! never becomes part of any command line, and is not subject to argument
//! length limits or shell quoting. Only the remote command is quoted, since
//! the remote login shell parses it.
//!
//! Authentication is left entirely to `ssh`, i.e., key-based login is
//! expected to be set up already. No timeout is imposed on the remote
//! program. A hung runner blocks the import until `ssh` gives up on its own,
//! which can be tuned through the `ConnectTimeout` option.

use crate::{
    encode::{EncodingLayer, ShellWord},
    remote::{ExecutionResult, RemoteError, RemoteExecutor, RemoteProgram, Result},
};

use indicatif::ProgressBar;
use std::{
    io::{BufRead, BufReader, ErrorKind, Read, Write},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
};
use tracing::{debug, info, instrument, warn};

/// Upper bound of standard error output kept per execution.
const STDERR_TAIL_LIMIT: usize = 64 * 1024;

/// Settings of SSH command channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshSettings {
    /// Remote host to connect to.
    pub host: String,

    /// Remote user to log in as.
    pub user: String,

    /// Directory of remote application.
    pub app_dir: String,

    /// Runner command reading a program from standard input.
    pub runner: Vec<String>,

    /// Local SSH client binary.
    pub program: String,

    /// Extra options passed to SSH client.
    pub options: Vec<String>,

    /// Connection timeout in seconds.
    pub connect_timeout: Option<u64>,
}

impl SshSettings {
    /// Login destination in `user@host` form.
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }

    /// Command line for remote login shell.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::Encode`] if a word cannot be quoted.
    pub fn remote_command(&self) -> Result<String> {
        let runner = self
            .runner
            .iter()
            .map(|word| ShellWord.escape(word))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(format!("cd {} && {}", ShellWord.escape(&self.app_dir)?, runner.join(" ")))
    }

    /// Full argument listing of SSH client.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::Encode`] if remote command cannot be quoted.
    pub fn client_args(&self) -> Result<Vec<String>> {
        let mut args = self.options.clone();
        if let Some(timeout) = self.connect_timeout {
            args.extend(["-o".to_string(), format!("ConnectTimeout={timeout}")]);
        }
        args.push(self.destination());
        args.push(self.remote_command()?);

        Ok(args)
    }

    /// Human readable rendition of full SSH invocation.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::Encode`] if remote command cannot be quoted.
    pub fn display_command(&self) -> Result<String> {
        let mut words = vec![self.program.clone()];
        words.extend(self.client_args()?);
        Ok(words.join(" "))
    }
}

/// Remote executor through local SSH client.
///
/// Output of the remote program is streamed line by line to the console as it
/// arrives, suspending the progress bar for each line.
#[derive(Debug, Clone)]
pub struct SshExecutor {
    settings: SshSettings,
    bar: ProgressBar,
}

impl SshExecutor {
    /// Construct new SSH executor.
    pub fn new(settings: SshSettings, bar: ProgressBar) -> Self {
        Self { settings, bar }
    }
}

impl RemoteExecutor for SshExecutor {
    /// Execute program on remote runner.
    ///
    /// Opens one SSH session, feeds program through standard input, and waits
    /// for the session to end.
    ///
    /// # Errors
    ///
    /// - Return [`RemoteError::Spawn`] if SSH client cannot be started.
    /// - Return [`RemoteError::Io`] if channel I/O fails.
    /// - Return [`RemoteError::StreamPanicked`] if a stream pump dies.
    #[instrument(skip(self, program), fields(label = %program.label), level = "debug")]
    fn execute(&self, program: &RemoteProgram) -> Result<ExecutionResult> {
        debug!("open channel to {}", self.settings.destination());
        let mut child = Command::new(&self.settings.program)
            .args(self.settings.client_args()?)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|err| RemoteError::Spawn {
                source: err,
                program: self.settings.program.clone(),
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or(RemoteError::MissingPipe { stream: "input" })?;
        let stdout = child
            .stdout
            .take()
            .ok_or(RemoteError::MissingPipe { stream: "output" })?;
        let stderr = child
            .stderr
            .take()
            .ok_or(RemoteError::MissingPipe { stream: "error" })?;

        // INVARIANT: Pump all three streams at once.
        //   - A large program can fill the input pipe before the remote side
        //     starts reading, while the remote side waits on us to drain its
        //     output.
        let source = program.source.as_bytes();
        let bar = &self.bar;
        let pumped = thread::scope(|scope| -> Result<String> {
            let feeder = scope.spawn(move || feed_program(stdin, source));
            let output = scope.spawn(move || {
                pump_lines(stdout, |line| bar.suspend(|| println!("{line}")))
            });
            let errors = scope.spawn(move || {
                let mut tail = String::new();
                pump_lines(stderr, |line| {
                    bar.suspend(|| eprintln!("{line}"));
                    push_bounded(&mut tail, line);
                })?;
                Ok::<_, std::io::Error>(tail)
            });

            feeder
                .join()
                .map_err(|_| RemoteError::StreamPanicked { stream: "input" })??;
            output
                .join()
                .map_err(|_| RemoteError::StreamPanicked { stream: "output" })??;
            let tail = errors
                .join()
                .map_err(|_| RemoteError::StreamPanicked { stream: "error" })??;

            Ok(tail)
        });

        let (status, stderr_tail) = reap(&mut child, pumped)?;
        let exit_code = status.code().unwrap_or(-1);
        if status.success() {
            info!("channel to {} closed cleanly", self.settings.destination());
            return Ok(ExecutionResult {
                succeeded: true,
                exit_code,
                stderr: stderr_tail,
            });
        }

        warn!("remote program {:?} exited with {exit_code}", program.label);
        Ok(ExecutionResult::failure(exit_code, stderr_tail))
    }
}

fn reap(child: &mut Child, pumped: Result<String>) -> Result<(ExitStatus, String)> {
    match pumped {
        Ok(stderr_tail) => Ok((child.wait()?, stderr_tail)),
        Err(err) => {
            // INVARIANT: Never leave a channel process behind.
            if let Err(kill_err) = child.kill() {
                debug!("failed to kill channel process: {kill_err}");
            }
            child.wait()?;
            Err(err)
        }
    }
}

fn feed_program(mut stdin: impl Write, source: &[u8]) -> std::io::Result<()> {
    match stdin.write_all(source).and_then(|_| stdin.flush()) {
        // INVARIANT: Early remote exit is reported through exit status.
        Err(err) if err.kind() == ErrorKind::BrokenPipe => {
            debug!("remote side closed input early");
            Ok(())
        }
        result => result,
    }
}

fn pump_lines(stream: impl Read, mut sink: impl FnMut(&str)) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut buffer = Vec::new();
    loop {
        buffer.clear();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(());
        }

        let line = String::from_utf8_lossy(&buffer);
        sink(line.trim_end_matches(['\n', '\r']));
    }
}

fn push_bounded(tail: &mut String, line: &str) {
    tail.push_str(line);
    tail.push('\n');
    if tail.len() <= STDERR_TAIL_LIMIT {
        return;
    }

    let excess = tail.len() - STDERR_TAIL_LIMIT;
    let cut = (excess..=tail.len())
        .find(|index| tail.is_char_boundary(*index))
        .unwrap_or(tail.len());
    tail.drain(..cut);
}
