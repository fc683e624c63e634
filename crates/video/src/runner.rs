use std::{
    ffi::{OsStr, OsString},
    io,
    path::{Path, PathBuf},
    process::{Output, Stdio},
    time::{Duration, Instant},
};

use tokio::process::Command;
use tracing::debug;

use crate::error::VideoError;

/// Executables and the per-invocation time limit used by every diagnostic.
#[derive(Debug, Clone)]
pub struct Tools {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub timeout: Duration,
}

impl Default for Tools {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: OsString,
    args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn arguments(&self) -> impl Iterator<Item = &OsStr> {
        self.args.iter().map(OsString::as_os_str)
    }

    /// Name used in error messages: the file name of the program.
    pub fn tool_name(&self) -> String {
        Path::new(&self.program)
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Space-joined command line for display.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_os_str())
            .chain(self.arguments())
            .map(OsStr::to_string_lossy)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Runs `spec` to completion, capturing both streams.
///
/// A non-zero exit becomes [`VideoError::ToolFailed`]. With a `timeout` the
/// child is killed once the limit passes.
pub fn run_captured(
    spec: &CommandSpec,
    timeout: Option<Duration>,
) -> Result<CapturedOutput, VideoError> {
    let tool = spec.tool_name();
    debug!("running {}", spec.display());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let start = Instant::now();
    let output = runtime.block_on(spawn_and_wait(spec, &tool, timeout))?;
    let elapsed = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    if !output.status.success() {
        return Err(VideoError::ToolFailed {
            tool,
            status: output.status.code(),
            stderr,
        });
    }
    Ok(CapturedOutput {
        stdout,
        stderr,
        elapsed,
    })
}

async fn spawn_and_wait(
    spec: &CommandSpec,
    tool: &str,
    timeout: Option<Duration>,
) -> Result<Output, VideoError> {
    let child = Command::new(spec.program())
        .args(spec.arguments())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => VideoError::ToolMissing {
                tool: tool.to_string(),
            },
            _ => VideoError::Io(err),
        })?;

    let wait = child.wait_with_output();
    let output = match timeout {
        // Dropping the pending future drops the child, which kills it.
        Some(limit) => tokio::time::timeout(limit, wait)
            .await
            .map_err(|_| VideoError::Timeout {
                tool: tool.to_string(),
                timeout: limit,
            })??,
        None => wait.await?,
    };
    Ok(output)
}

/// Non-blank lines among the last `n` lines of `text`.
pub fn log_tail(text: &str, n: usize) -> Vec<&str> {
    let lines: Vec<&str> = text.trim().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..]
        .iter()
        .copied()
        .filter(|line| !line.trim().is_empty())
        .collect()
}
