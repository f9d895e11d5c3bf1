//! Process runner
//!
//! Spawns an external executable with an argument list and a working
//! directory, collects what it prints and hands back a single
//! [`CommandOutput`] once the process has exited.
//!
//! A non-zero exit code is *not* an error here: the caller decides what an
//! exit code means. The runner only fails when the process cannot be
//! spawned, when reading its pipes fails, or when it outlives its timeout
//! (in which case it is killed).

use async_trait::async_trait;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn '{program}' in '{}': {source}", .working_dir.display())]
    Spawn {
        program: String,
        working_dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("'{command}' did not exit within {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type RunnerResult<T> = Result<T, RunnerError>;

/// Which pipe becomes the payload of a [`CommandOutput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capture {
    /// Stdout is the payload; stderr is kept aside for diagnostics.
    #[default]
    Stdout,
    /// Stdout followed by stderr.
    Combined,
    /// Whichever settles first: stdout closing, or stderr producing data.
    /// An empty stdout never masks stderr text.
    FirstOf,
}

/// One invocation of an external executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    pub envs: Vec<(String, String)>,
    pub capture: Capture,
    pub timeout: Duration,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            envs: Vec::new(),
            capture: Capture::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.args
            .extend(args.into_iter().map(|arg| arg.as_ref().to_string()));
        self
    }

    pub fn with_capture(mut self, capture: Capture) -> Self {
        self.capture = capture;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_envs(mut self, envs: &[(String, String)]) -> Self {
        self.envs.extend_from_slice(envs);
        self
    }

    /// `program arg1 arg2 ...`, for logs and error messages.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Captured payload and exit status of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub output: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code, `-1` when the process was terminated by a signal.
    pub code: i32,
}

impl CommandOutput {
    pub fn new(output: impl Into<Vec<u8>>, code: i32) -> Self {
        Self {
            output: output.into(),
            stderr: Vec::new(),
            code,
        }
    }

    pub fn with_stderr(mut self, stderr: impl Into<Vec<u8>>) -> Self {
        self.stderr = stderr.into();
        self
    }

    pub fn success(&self) -> bool {
        self.code == 0
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// The payload, or stderr when the payload is blank.
    pub fn diagnostic(&self) -> String {
        let text = self.text();
        if text.trim().is_empty() {
            String::from_utf8_lossy(&self.stderr).trim().to_string()
        } else {
            text.trim().to_string()
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> RunnerResult<CommandOutput>;

    fn runner_name(&self) -> &'static str;
}

/// Runs commands as real OS processes on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, spec: &CommandSpec) -> RunnerResult<CommandOutput> {
        debug!(
            "Spawning `{}` in {}",
            spec.command_line(),
            spec.working_dir.display()
        );

        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.working_dir)
            .envs(spec.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RunnerError::Spawn {
                program: spec.program.clone(),
                working_dir: spec.working_dir.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdout was not piped"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stderr was not piped"))?;

        let finished = tokio::time::timeout(spec.timeout, async {
            let (output, stderr) = collect(stdout, stderr, spec.capture).await?;
            let status = child.wait().await?;
            Ok::<_, io::Error>((output, stderr, status))
        })
        .await;

        match finished {
            Ok(Ok((output, stderr, status))) => {
                let code = status.code().unwrap_or(-1);
                debug!(
                    "`{}` exited with {} ({} bytes captured)",
                    spec.command_line(),
                    code,
                    output.len()
                );
                Ok(CommandOutput {
                    output,
                    stderr,
                    code,
                })
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                warn!(
                    "`{}` exceeded {:?}, killing it",
                    spec.command_line(),
                    spec.timeout
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill `{}`: {}", spec.command_line(), e);
                }
                Err(RunnerError::Timeout {
                    command: spec.command_line(),
                    timeout: spec.timeout,
                })
            }
        }
    }

    fn runner_name(&self) -> &'static str {
        "process"
    }
}

async fn read_all<R: AsyncRead + Unpin>(mut reader: R) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

/// Reads both pipes to the end and returns `(payload, stderr)`.
async fn collect(
    stdout: ChildStdout,
    mut stderr: ChildStderr,
    capture: Capture,
) -> io::Result<(Vec<u8>, Vec<u8>)> {
    match capture {
        Capture::Stdout => tokio::try_join!(read_all(stdout), read_all(stderr)),
        Capture::Combined => {
            let (mut output, errors) = tokio::try_join!(read_all(stdout), read_all(stderr))?;
            output.extend_from_slice(&errors);
            Ok((output, errors))
        }
        Capture::FirstOf => {
            let mut stdout_task = tokio::spawn(read_all(stdout));
            let mut first = vec![0u8; 8192];

            tokio::select! {
                biased;

                read = stderr.read(&mut first) => {
                    let n = read?;
                    if n == 0 {
                        let output = stdout_task.await.map_err(io::Error::other)??;
                        return Ok((output, Vec::new()));
                    }
                    first.truncate(n);
                    stderr.read_to_end(&mut first).await?;
                    stdout_task.await.map_err(io::Error::other)??;
                    Ok((first.clone(), first))
                }
                joined = &mut stdout_task => {
                    let output = joined.map_err(io::Error::other)??;
                    let errors = read_all(stderr).await?;
                    if output.is_empty() && !errors.is_empty() {
                        Ok((errors.clone(), errors))
                    } else {
                        Ok((output, errors))
                    }
                }
            }
        }
    }
}
