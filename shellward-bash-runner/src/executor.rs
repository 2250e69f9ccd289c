use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

use crate::process_group;
use crate::runner::MAX_OUTPUT_CHARS;

/// Bytes kept per stream. Anything beyond is still read, so the child never
/// stalls on a full pipe, but only counted.
pub const MAX_CAPTURE_BYTES: usize = 4 * 4 * MAX_OUTPUT_CHARS;

const READ_CHUNK_BYTES: usize = 8 * 1024;

/// Environment applied to every child so pagers never wait for input.
const NON_INTERACTIVE_ENV: &[(&str, &str)] =
    &[("PAGER", "cat"), ("GIT_PAGER", "cat"), ("LESS", "R")];

/// Shell family used to execute commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShellKind {
    Unix,
    Windows,
}

impl ShellKind {
    /// Shell family of the host.
    pub const fn current() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Unix }
    }

    fn command(self, script: &str) -> Command {
        match self {
            Self::Unix => {
                let mut command = Command::new("sh");
                command.arg("-c").arg(script);
                command
            }
            Self::Windows => {
                let mut command = Command::new("powershell");
                command
                    .arg("-NoProfile")
                    .arg("-NonInteractive")
                    .arg("-Command")
                    .arg(script);
                command
            }
        }
    }
}

/// Describes a command that will be executed by a [`CommandExecutor`].
#[derive(Debug, Clone)]
pub struct CommandInvocation {
    pub shell: ShellKind,
    pub command: String,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

impl CommandInvocation {
    pub fn new(shell: ShellKind, command: impl Into<String>, working_dir: PathBuf) -> Self {
        Self {
            shell,
            command: command.into(),
            working_dir,
            timeout: crate::config::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// What happened to a spawned command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The child exited and its pipes were drained. Children killed by a
    /// signal report `-1`. `omitted` counts characters read past
    /// [`MAX_CAPTURE_BYTES`] on either stream and not kept.
    Exited {
        exit_code: i32,
        stdout: String,
        stderr: String,
        omitted: usize,
    },
    /// The deadline passed; the process group was killed.
    TimedOut,
}

/// Trait implemented by concrete command execution strategies.
///
/// `Err` is reserved for failures to start or supervise the process.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn execute(&self, invocation: &CommandInvocation) -> Result<ProcessOutcome>;
}

/// Executes commands by delegating to the system shell via
/// [`tokio::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessCommandExecutor;

impl ProcessCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandExecutor for ProcessCommandExecutor {
    async fn execute(&self, invocation: &CommandInvocation) -> Result<ProcessOutcome> {
        let deadline = Instant::now() + invocation.timeout;

        let mut command = invocation.shell.command(&invocation.command);
        command
            .current_dir(&invocation.working_dir)
            .envs(NON_INTERACTIVE_ENV.iter().copied())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().context("failed to spawn command")?;
        let pid = child.id();
        debug!(
            pid,
            command = %invocation.command,
            working_dir = %invocation.working_dir.display(),
            "Spawned command"
        );

        let mut readers = OutputReaders::attach(&mut child);

        let status = match timeout_at(deadline, child.wait()).await {
            Ok(status) => status.context("failed to wait for command")?,
            Err(_) => {
                warn!(
                    pid,
                    timeout = ?invocation.timeout,
                    "Command timed out; killing process group"
                );
                terminate(&mut child, pid).await;
                return Ok(ProcessOutcome::TimedOut);
            }
        };

        // Background jobs that inherited the pipes can keep them open after
        // the shell exits; the same deadline bounds the drain.
        let drained = timeout_at(deadline, readers.collect()).await;
        let Ok((stdout, stderr, omitted)) = drained else {
            warn!(pid, "Command output still open at deadline; killing process group");
            terminate(&mut child, pid).await;
            return Ok(ProcessOutcome::TimedOut);
        };

        let exit_code = status.code().unwrap_or(-1);
        debug!(pid, exit_code, omitted, "Command finished");

        Ok(ProcessOutcome::Exited {
            exit_code,
            stdout,
            stderr,
            omitted,
        })
    }
}

async fn terminate(child: &mut Child, pid: Option<u32>) {
    if let Some(pid) = pid
        && let Err(error) = process_group::kill_process_group(pid)
    {
        warn!(pid, %error, "Failed to kill process group");
    }
    if let Err(error) = child.kill().await {
        debug!(%error, "Child already gone");
    }
}

/// Background tasks draining the child's pipes. Dropping aborts them.
struct OutputReaders {
    stdout: JoinHandle<Capture>,
    stderr: JoinHandle<Capture>,
}

impl OutputReaders {
    fn attach(child: &mut Child) -> Self {
        Self {
            stdout: tokio::spawn(read_stream(child.stdout.take())),
            stderr: tokio::spawn(read_stream(child.stderr.take())),
        }
    }

    async fn collect(&mut self) -> (String, String, usize) {
        let stdout = (&mut self.stdout).await.unwrap_or_default();
        let stderr = (&mut self.stderr).await.unwrap_or_default();
        let omitted = stdout.omitted + stderr.omitted;
        (stdout.into_text(), stderr.into_text(), omitted)
    }
}

impl Drop for OutputReaders {
    fn drop(&mut self) {
        self.stdout.abort();
        self.stderr.abort();
    }
}

/// Bytes read from one stream, capped at [`MAX_CAPTURE_BYTES`].
#[derive(Debug, Default)]
struct Capture {
    kept: Vec<u8>,
    omitted: usize,
}

impl Capture {
    fn push(&mut self, chunk: &[u8]) {
        let room = MAX_CAPTURE_BYTES.saturating_sub(self.kept.len());
        let (kept, dropped) = chunk.split_at(room.min(chunk.len()));
        self.kept.extend_from_slice(kept);
        // UTF-8 continuation bytes do not start a character.
        self.omitted += dropped.iter().filter(|byte| (**byte & 0xC0) != 0x80).count();
    }

    fn into_text(self) -> String {
        String::from_utf8_lossy(&self.kept).into_owned()
    }
}

async fn read_stream<R>(reader: Option<R>) -> Capture
where
    R: AsyncRead + Unpin,
{
    let mut capture = Capture::default();
    let Some(mut reader) = reader else {
        return capture;
    };
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(read) => capture.push(&chunk[..read]),
            Err(error) => {
                debug!(%error, "Stopped reading command output");
                break;
            }
        }
    }
    capture
}
