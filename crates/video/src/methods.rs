use std::{
    fs,
    path::Path,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::{
    error::VideoError,
    frames::{clear_frames, count_frames},
    runner::{CommandSpec, Tools, log_tail, run_captured},
};

pub const SUCCESS_TAIL_LINES: usize = 5;
pub const FAILURE_TAIL_LINES: usize = 10;

/// ffmpeg flag combination tried against a video that fails to extract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionMethod {
    pub name: &'static str,
    /// Flags placed before `-i`.
    pub input_flags: &'static [&'static str],
    /// Flags placed between the input and the output pattern.
    pub output_flags: &'static [&'static str],
}

pub const METHODS: [ExtractionMethod; 6] = [
    ExtractionMethod {
        name: "Standard extraction",
        input_flags: &[],
        output_flags: &["-vf", "fps=1", "-y", "-v", "debug"],
    },
    ExtractionMethod {
        name: "GoPro optimized (genpts+ignore_index)",
        input_flags: &["-fflags", "+genpts+ignore_index"],
        output_flags: &["-vf", "fps=1", "-f", "image2", "-y", "-v", "debug"],
    },
    ExtractionMethod {
        name: "Error tolerance (ignore_err)",
        input_flags: &["-err_detect", "ignore_err", "-fflags", "+genpts"],
        output_flags: &["-vf", "fps=1", "-f", "image2", "-y", "-v", "debug"],
    },
    ExtractionMethod {
        name: "Force MP4 demuxer",
        input_flags: &["-f", "mp4", "-fflags", "+genpts"],
        output_flags: &["-vf", "fps=1", "-f", "image2", "-y", "-v", "debug"],
    },
    ExtractionMethod {
        name: "Concat demuxer workaround",
        input_flags: &["-fflags", "+genpts+igndts+ignidx"],
        output_flags: &["-r", "1", "-f", "image2", "-y", "-v", "debug"],
    },
    ExtractionMethod {
        name: "Basic with verbose output",
        input_flags: &[],
        output_flags: &["-r", "1", "-y", "-v", "debug"],
    },
];

/// File name prefix of the frames written by the 1-based method `index`.
pub fn frame_prefix(index: usize) -> String {
    format!("method{index}_")
}

/// Full ffmpeg invocation for the 1-based method `index`.
pub fn build_command(
    ffmpeg: &Path,
    index: usize,
    method: &ExtractionMethod,
    video: &Path,
    output_dir: &Path,
) -> CommandSpec {
    let pattern = output_dir.join(format!("{}%06d.png", frame_prefix(index)));
    CommandSpec::new(ffmpeg)
        .args(method.input_flags.iter().copied())
        .arg("-i")
        .arg(video)
        .args(method.output_flags.iter().copied())
        .arg(pattern)
}

#[derive(Debug, Clone)]
pub enum MethodOutcome {
    Success {
        frames: usize,
        elapsed: Duration,
        tail: Vec<String>,
    },
    /// ffmpeg exited cleanly without writing a frame.
    NoFrames { elapsed: Duration, tail: Vec<String> },
    Failed {
        status: Option<i32>,
        elapsed: Duration,
        tail: Vec<String>,
    },
    Timeout { limit: Duration },
    /// Anything else, such as ffmpeg not being installed.
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct MethodReport {
    pub index: usize,
    pub name: &'static str,
    pub command: String,
    pub outcome: MethodOutcome,
}

impl MethodReport {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, MethodOutcome::Success { .. })
    }
}

/// Removes and recreates `output_dir`.
pub fn prepare_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir)
            .with_context(|| format!("failed to remove {}", output_dir.display()))?;
    }
    fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))
}

/// Runs one method after clearing the frames of its previous run.
///
/// Tool failures are folded into the outcome; only filesystem errors on the
/// output directory are returned.
pub fn run_method(
    tools: &Tools,
    index: usize,
    method: &ExtractionMethod,
    video: &Path,
    output_dir: &Path,
) -> Result<MethodReport> {
    let prefix = frame_prefix(index);
    clear_frames(output_dir, &prefix)?;

    let spec = build_command(&tools.ffmpeg, index, method, video, output_dir);
    let start = Instant::now();
    let result = run_captured(&spec, Some(tools.timeout));
    let elapsed = start.elapsed();

    let outcome = match result {
        Ok(output) => {
            let tail = owned_tail(&output.stderr, SUCCESS_TAIL_LINES);
            match count_frames(output_dir, &prefix)? {
                0 => MethodOutcome::NoFrames { elapsed, tail },
                frames => MethodOutcome::Success {
                    frames,
                    elapsed,
                    tail,
                },
            }
        }
        Err(VideoError::ToolFailed { status, stderr, .. }) => MethodOutcome::Failed {
            status,
            elapsed,
            tail: owned_tail(&stderr, FAILURE_TAIL_LINES),
        },
        Err(VideoError::Timeout { timeout, .. }) => MethodOutcome::Timeout { limit: timeout },
        Err(err) => MethodOutcome::Error {
            message: err.to_string(),
        },
    };
    debug!("method {index} ({}) finished: {outcome:?}", method.name);

    Ok(MethodReport {
        index,
        name: method.name,
        command: spec.display(),
        outcome,
    })
}

/// Progress notifications emitted by [`try_methods`].
#[derive(Debug)]
pub enum MethodEvent<'a> {
    Started {
        index: usize,
        method: &'a ExtractionMethod,
        command: &'a str,
    },
    Finished(&'a MethodReport),
}

/// Recreates `output_dir` and runs every method in order.
pub fn try_methods(
    tools: &Tools,
    video: &Path,
    output_dir: &Path,
    mut observer: impl FnMut(MethodEvent<'_>),
) -> Result<Vec<MethodReport>> {
    prepare_output_dir(output_dir)?;
    let mut reports = Vec::with_capacity(METHODS.len());
    for (offset, method) in METHODS.iter().enumerate() {
        let index = offset + 1;
        let command = build_command(&tools.ffmpeg, index, method, video, output_dir).display();
        info!("method {index}: {}", method.name);
        observer(MethodEvent::Started {
            index,
            method,
            command: &command,
        });
        let report = run_method(tools, index, method, video, output_dir)?;
        observer(MethodEvent::Finished(&report));
        reports.push(report);
    }
    Ok(reports)
}

/// Names of the methods that produced frames, in catalogue order.
pub fn successful_methods(reports: &[MethodReport]) -> Vec<&'static str> {
    reports
        .iter()
        .filter(|report| report.succeeded())
        .map(|report| report.name)
        .collect()
}

fn owned_tail(stderr: &str, lines: usize) -> Vec<String> {
    log_tail(stderr, lines)
        .into_iter()
        .map(str::to_owned)
        .collect()
}
