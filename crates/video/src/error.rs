use std::{path::PathBuf, time::Duration};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("video file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("{tool} not found; FFmpeg tools are not installed")]
    ToolMissing { tool: String },
    #[error("{tool} failed ({})", describe_status(*.status))]
    ToolFailed {
        tool: String,
        /// Exit code, `None` when the process was terminated by a signal.
        status: Option<i32>,
        stderr: String,
    },
    #[error("{tool} timed out after {} seconds", .timeout.as_secs())]
    Timeout { tool: String, timeout: Duration },
    #[error("failed to parse ffprobe output: {0}")]
    InvalidProbe(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn describe_status(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}
