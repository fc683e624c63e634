#![cfg(unix)]

use std::{
    fs,
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Result;
use tempfile::TempDir;
use vggt_probe_video::{
    DebugEvent, DebugPlan, DebugVerdict, METHODS, MethodEvent, Tools, VideoError,
    debug_video,
};

// Every method fails on inputs named `broken*`; otherwise two frames are written.
const FAKE_FFMPEG: &str = r#"#!/bin/sh
for last; do :; done
case "$*" in
  *broken*)
    echo "Invalid data found when processing input" >&2
    exit 1
    ;;
esac
: > "$(printf "$last" 1)"
: > "$(printf "$last" 2)"
"#;

// Inputs named `truncated*` are rejected the way ffprobe rejects a camera file
// whose recording was cut off.
const FAKE_FFPROBE: &str = r#"#!/bin/sh
for last; do :; done
case "$last" in
  *truncated*)
    echo "moov atom not found" >&2
    exit 1
    ;;
esac
if [ "$1" = "-v" ]; then
  echo '{"streams":[{"index":0,"codec_type":"video","codec_name":"h264"}],"format":{"format_name":"mov,mp4"}}'
else
  echo "Input #0, mov,mp4" >&2
fi
"#;

fn script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, body)?;
    let mut perms = fs::metadata(&path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms)?;
    Ok(path)
}

struct Session {
    dir: TempDir,
    tools: Tools,
    plan: DebugPlan,
}

impl Session {
    fn new(working_video: &str) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let tools = Tools {
            ffmpeg: script(dir.path(), "ffmpeg", FAKE_FFMPEG)?,
            ffprobe: script(dir.path(), "ffprobe", FAKE_FFPROBE)?,
            timeout: Duration::from_secs(20),
        };
        let uploads = dir.path().join("uploads");
        fs::create_dir_all(&uploads)?;
        let plan = DebugPlan {
            working_video: dir.path().join(working_video),
            video: None,
            upload_root: uploads,
            upload_prefix: "input_images_".to_string(),
            upload_scan_limit: 3,
            working_output: dir.path().join("working_frames"),
            problem_output: dir.path().join("problem_frames"),
            keep_frames: false,
        };
        Ok(Self { dir, tools, plan })
    }

    fn video(&self, relative: &str, len: usize) -> Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, vec![0u8; len])?;
        Ok(path)
    }

    fn run(&self) -> Result<(DebugVerdict, Vec<String>)> {
        let mut events = Vec::new();
        let verdict = debug_video(&self.tools, &self.plan, |event| events.push(label(&event)))?;
        Ok((verdict, events))
    }
}

fn label(event: &DebugEvent<'_>) -> String {
    match event {
        DebugEvent::BaselineMissing(_) => "baseline-missing".to_string(),
        DebugEvent::UploadFound(_) => "upload".to_string(),
        DebugEvent::Analyzing { stage, .. } => format!("analyze {stage:?}"),
        DebugEvent::FileSize(bytes) => format!("size {bytes}"),
        DebugEvent::Probed(Ok(_)) => "ffprobe ok".to_string(),
        DebugEvent::Probed(Err(VideoError::ToolFailed { status, stderr, .. })) => {
            format!("ffprobe failed {status:?} {}", stderr.trim())
        }
        DebugEvent::Probed(Err(err)) => format!("ffprobe error {err}"),
        DebugEvent::Layout(_) => "layout".to_string(),
        DebugEvent::MethodsStarted => "methods".to_string(),
        DebugEvent::Method(MethodEvent::Started { index, .. }) => format!("method {index}"),
        DebugEvent::Method(MethodEvent::Finished(_)) => "finished".to_string(),
        DebugEvent::MethodsFinished { stage, successful } => {
            format!("summary {stage:?} {}", successful.len())
        }
    }
}

fn all_method_names() -> Vec<&'static str> {
    METHODS.iter().map(|method| method.name).collect()
}

#[test]
fn healthy_baseline_then_recent_upload_finds_a_solution() -> Result<()> {
    let session = Session::new("kitchen.mp4")?;
    session.video("kitchen.mp4", 4096)?;
    session.video("uploads/input_images_20240101/clip.mp4", 2048)?;
    let newest = session.video("uploads/input_images_20240301/GX010042.MP4", 8192)?;

    let (verdict, events) = session.run()?;
    assert_eq!(
        verdict,
        DebugVerdict::SolutionFound {
            video: newest,
            methods: all_method_names(),
        }
    );

    let upload = events.iter().position(|e| e == "upload").expect("upload event");
    assert_eq!(
        &events[..4],
        ["analyze Baseline", "size 4096", "ffprobe ok", "layout"]
    );
    assert!(events[..upload].contains(&"summary Baseline 6".to_string()));
    assert_eq!(
        &events[upload + 1..upload + 5],
        ["analyze Suspect", "size 8192", "ffprobe ok", "layout"]
    );
    assert_eq!(events.last().map(String::as_str), Some("summary Suspect 6"));
    assert_eq!(events.iter().filter(|e| *e == "method 6").count(), 2);

    assert!(!session.plan.working_output.exists());
    assert!(!session.plan.problem_output.exists());
    Ok(())
}

#[test]
fn keep_frames_leaves_scratch_directories_in_place() -> Result<()> {
    let mut session = Session::new("kitchen.mp4")?;
    session.video("kitchen.mp4", 1024)?;
    session.plan.video = Some(session.video("clip.mp4", 1024)?);
    session.plan.keep_frames = true;

    let (verdict, _) = session.run()?;
    assert!(matches!(verdict, DebugVerdict::SolutionFound { .. }));
    assert!(session.plan.working_output.join("method1_000001.png").exists());
    assert!(session.plan.problem_output.join("method6_000002.png").exists());
    Ok(())
}

#[test]
fn failing_baseline_stops_before_the_upload_search() -> Result<()> {
    let mut session = Session::new("broken_kitchen.mp4")?;
    session.video("broken_kitchen.mp4", 1024)?;
    session.plan.upload_root = session.dir.path().join("never-created");

    let (verdict, events) = session.run()?;
    assert_eq!(verdict, DebugVerdict::BaselineFailed);
    assert_eq!(events.last().map(String::as_str), Some("summary Baseline 0"));
    assert!(!events.iter().any(|e| e == "analyze Suspect"));
    assert!(!session.plan.working_output.exists());
    Ok(())
}

#[test]
fn file_size_is_reported_when_ffprobe_rejects_the_video() -> Result<()> {
    let mut session = Session::new("missing.mp4")?;
    let video = session.video("truncated.mp4", 123_456)?;
    session.plan.video = Some(video.clone());

    let (verdict, events) = session.run()?;
    assert_eq!(verdict, DebugVerdict::ProbeFailed { video });
    assert_eq!(
        events,
        [
            "baseline-missing",
            "analyze Suspect",
            "size 123456",
            "ffprobe failed Some(1) moov atom not found",
        ]
    );
    assert!(!session.plan.problem_output.exists());
    Ok(())
}

#[test]
fn no_solution_when_every_method_fails() -> Result<()> {
    let mut session = Session::new("missing.mp4")?;
    let video = session.video("broken_upload.mp4", 512)?;
    session.plan.video = Some(video.clone());

    let (verdict, events) = session.run()?;
    assert_eq!(verdict, DebugVerdict::NoSolution { video });
    assert_eq!(events.last().map(String::as_str), Some("summary Suspect 0"));
    assert_eq!(events.iter().filter(|e| e.starts_with("method ")).count(), 6);
    assert!(!session.plan.problem_output.exists());
    Ok(())
}

#[test]
fn empty_upload_root_yields_no_upload() -> Result<()> {
    let session = Session::new("missing.mp4")?;
    fs::create_dir_all(session.dir.path().join("uploads/input_images_empty"))?;

    let (verdict, events) = session.run()?;
    assert_eq!(verdict, DebugVerdict::NoUpload);
    assert_eq!(events, ["baseline-missing"]);
    Ok(())
}
