use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    discover::find_recent_upload,
    error::VideoError,
    layout::ContainerLayout,
    methods::{MethodEvent, successful_methods, try_methods},
    probe::{ProbeReport, analyze, file_size},
    runner::Tools,
};

/// Inputs of one debugging session.
#[derive(Debug, Clone)]
pub struct DebugPlan {
    /// Known-good video used to validate the ffmpeg install first.
    pub working_video: PathBuf,
    /// Suspect video; when absent the newest upload under `upload_root` is used.
    pub video: Option<PathBuf>,
    pub upload_root: PathBuf,
    pub upload_prefix: String,
    pub upload_scan_limit: usize,
    pub working_output: PathBuf,
    pub problem_output: PathBuf,
    pub keep_frames: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugStage {
    Baseline,
    Suspect,
}

/// Progress notifications, in the order the session produces them.
#[derive(Debug)]
pub enum DebugEvent<'a> {
    BaselineMissing(&'a Path),
    UploadFound(&'a Path),
    Analyzing { stage: DebugStage, video: &'a Path },
    /// Emitted before ffprobe runs so the size survives a failed probe.
    FileSize(u64),
    Probed(&'a Result<ProbeReport, VideoError>),
    Layout(&'a Result<ContainerLayout, VideoError>),
    MethodsStarted,
    Method(MethodEvent<'a>),
    MethodsFinished {
        stage: DebugStage,
        successful: &'a [&'static str],
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugVerdict {
    /// The working video exists but no method could extract it.
    BaselineFailed,
    NoUpload,
    ProbeFailed { video: PathBuf },
    SolutionFound {
        video: PathBuf,
        methods: Vec<&'static str>,
    },
    NoSolution { video: PathBuf },
}

/// Runs the baseline, locates the suspect video and tries every extraction
/// method on it. Scratch directories are removed unless `keep_frames` is set,
/// including when a step fails.
pub fn debug_video(
    tools: &Tools,
    plan: &DebugPlan,
    mut observer: impl FnMut(DebugEvent<'_>),
) -> Result<DebugVerdict> {
    if plan.working_video.exists() {
        observer(DebugEvent::Analyzing {
            stage: DebugStage::Baseline,
            video: &plan.working_video,
        });
        examine(tools, DebugStage::Baseline, &plan.working_video, &mut observer);
        let successful = in_scratch(&plan.working_output, plan.keep_frames, || {
            extract_all(
                tools,
                DebugStage::Baseline,
                &plan.working_video,
                &plan.working_output,
                &mut observer,
            )
        })?;
        if successful.is_empty() {
            return Ok(DebugVerdict::BaselineFailed);
        }
    } else {
        observer(DebugEvent::BaselineMissing(&plan.working_video));
    }

    let video = match &plan.video {
        Some(video) => video.clone(),
        None => {
            let found = find_recent_upload(
                &plan.upload_root,
                &plan.upload_prefix,
                plan.upload_scan_limit,
            )?;
            let Some(video) = found else {
                return Ok(DebugVerdict::NoUpload);
            };
            observer(DebugEvent::UploadFound(&video));
            video
        }
    };

    observer(DebugEvent::Analyzing {
        stage: DebugStage::Suspect,
        video: &video,
    });
    if !examine(tools, DebugStage::Suspect, &video, &mut observer) {
        return Ok(DebugVerdict::ProbeFailed { video });
    }
    let methods = in_scratch(&plan.problem_output, plan.keep_frames, || {
        extract_all(
            tools,
            DebugStage::Suspect,
            &video,
            &plan.problem_output,
            &mut observer,
        )
    })?;
    if methods.is_empty() {
        Ok(DebugVerdict::NoSolution { video })
    } else {
        Ok(DebugVerdict::SolutionFound { video, methods })
    }
}

/// Size, ffprobe passes and box layout. Returns whether ffprobe succeeded.
///
/// The baseline layout is always inspected; a suspect video stops at a failed probe.
fn examine(
    tools: &Tools,
    stage: DebugStage,
    video: &Path,
    observer: &mut impl FnMut(DebugEvent<'_>),
) -> bool {
    if let Ok(size) = file_size(video) {
        observer(DebugEvent::FileSize(size));
    }
    let probed = analyze(tools, video);
    observer(DebugEvent::Probed(&probed));
    let ok = probed.is_ok();
    if ok || stage == DebugStage::Baseline {
        let layout = ContainerLayout::inspect(video);
        observer(DebugEvent::Layout(&layout));
    }
    ok
}

fn extract_all(
    tools: &Tools,
    stage: DebugStage,
    video: &Path,
    output_dir: &Path,
    observer: &mut impl FnMut(DebugEvent<'_>),
) -> Result<Vec<&'static str>> {
    observer(DebugEvent::MethodsStarted);
    let reports = try_methods(tools, video, output_dir, |event| {
        observer(DebugEvent::Method(event))
    })?;
    let successful = successful_methods(&reports);
    observer(DebugEvent::MethodsFinished {
        stage,
        successful: &successful,
    });
    Ok(successful)
}

/// Runs `step`, then removes `dir` unless `keep` is set. The step's error wins
/// over a cleanup error.
fn in_scratch<T>(dir: &Path, keep: bool, step: impl FnOnce() -> Result<T>) -> Result<T> {
    let result = step();
    let cleaned = remove_scratch(dir, keep);
    let value = result?;
    cleaned?;
    Ok(value)
}

pub fn remove_scratch(dir: &Path, keep: bool) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    if keep {
        info!("Keeping extracted frames in {}", dir.display());
        return Ok(());
    }
    fs::remove_dir_all(dir).with_context(|| format!("failed to remove {}", dir.display()))
}
