use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Result;
use vggt_probe_config::VideoSettings;
use vggt_probe_video::{
    ContainerLayout, DebugEvent, DebugPlan, DebugStage, DebugVerdict, MethodEvent, MethodOutcome,
    MethodReport, MoovPlacement, ProbeReport, Tools, VideoError, analyze, debug_video, file_size,
    format_size, remove_scratch, time_extraction,
};

const WORKING_OUTPUT_DIR: &str = "debug_working_output";
const PROBLEM_OUTPUT_DIR: &str = "debug_problem_output";
const SPEED_OUTPUT_DIR: &str = "test_ffmpeg_output";
const BANNER_WIDTH: usize = 50;

fn tools(settings: &VideoSettings) -> Tools {
    Tools {
        ffmpeg: settings.ffmpeg.clone(),
        ffprobe: settings.ffprobe.clone(),
        timeout: Duration::from_secs(settings.method_timeout_secs),
    }
}

/// Baseline on the working video, then the same checks on the suspect one.
pub fn debug(settings: &VideoSettings, explicit: Option<&Path>) -> Result<()> {
    let tools = tools(settings);
    println!("VIDEO PROCESSING DEBUGGER");
    println!("{}", "=".repeat(BANNER_WIDTH));

    let plan = DebugPlan {
        working_video: settings.working_video.clone(),
        video: explicit.map(Path::to_path_buf),
        upload_root: settings.upload_root.clone(),
        upload_prefix: settings.upload_prefix.clone(),
        upload_scan_limit: settings.upload_scan_limit,
        working_output: PathBuf::from(WORKING_OUTPUT_DIR),
        problem_output: PathBuf::from(PROBLEM_OUTPUT_DIR),
        keep_frames: settings.keep_frames,
    };
    match debug_video(&tools, &plan, print_event)? {
        DebugVerdict::BaselineFailed => {
            println!("\nCRITICAL: Working video test failed. Check FFmpeg installation.");
        }
        DebugVerdict::NoUpload => {
            println!("\nNo recent video uploads found.");
            println!(
                "Upload a video first so that {}/{}* holds it.",
                settings.upload_root.display(),
                settings.upload_prefix
            );
        }
        DebugVerdict::ProbeFailed { .. } => {}
        DebugVerdict::NoSolution { .. } => {
            println!("\nNO SOLUTION FOUND");
            println!("The video may be:");
            println!("   - Corrupted or incomplete");
            println!("   - Using an unsupported codec");
            println!("   - Require a specific FFmpeg build");
        }
        DebugVerdict::SolutionFound { methods, .. } => {
            println!("\nSOLUTION FOUND!");
            println!("These methods work with your video:");
            for name in methods {
                println!("   [OK] {name}");
            }
        }
    }
    Ok(())
}

fn print_event(event: DebugEvent<'_>) {
    match event {
        DebugEvent::BaselineMissing(_) => println!("[WARN] No working video found for comparison"),
        DebugEvent::UploadFound(video) => {
            println!("\nFound recent uploaded video: {}", video.display());
        }
        DebugEvent::Analyzing { stage, video } => {
            match stage {
                DebugStage::Baseline => println!("Testing with known working video first..."),
                DebugStage::Suspect => {
                    println!("\nANALYZING PROBLEMATIC VIDEO");
                    println!("{}", "=".repeat(BANNER_WIDTH));
                }
            }
            println!("\n=== ANALYZING VIDEO: {} ===", video.display());
        }
        DebugEvent::FileSize(bytes) => println!("File size: {}", format_size(bytes)),
        DebugEvent::Probed(Ok(report)) => print_probe(report),
        DebugEvent::Probed(Err(err)) => print_probe_error(err),
        DebugEvent::Layout(layout) => {
            println!("\n=== CHECKING FILE STRUCTURE ===");
            match layout {
                Ok(layout) => print_layout(layout),
                Err(err) => println!("[FAIL] Error reading file: {err}"),
            }
        }
        DebugEvent::MethodsStarted => println!("\n=== TESTING FFMPEG METHODS ==="),
        DebugEvent::Method(MethodEvent::Started {
            index,
            method,
            command,
        }) => {
            println!("\n--- Method {index}: {} ---", method.name);
            println!("Command: {command}");
        }
        DebugEvent::Method(MethodEvent::Finished(report)) => print_outcome(report),
        DebugEvent::MethodsFinished { stage, successful } => {
            println!("\n=== SUMMARY ===");
            if successful.is_empty() {
                println!("[FAIL] No methods succeeded");
            } else {
                println!("[OK] Successful methods: {}", successful.join(", "));
            }
            if stage == DebugStage::Baseline {
                if successful.is_empty() {
                    println!("[FAIL] Even working video failed - FFmpeg installation issue");
                } else {
                    println!("[OK] Working video processed successfully with these methods:");
                    for name in successful {
                        println!("   - {name}");
                    }
                }
            }
        }
    }
}

pub fn probe(settings: &VideoSettings, video: &Path) -> Result<()> {
    let tools = tools(settings);
    println!("File size: {}", format_size(file_size(video)?));
    let report = analyze(&tools, video)?;
    print_probe(&report);
    Ok(())
}

pub fn layout(video: &Path) -> Result<()> {
    let layout = ContainerLayout::inspect(video)?;
    print_layout(&layout);
    Ok(())
}

fn print_probe_error(err: &VideoError) {
    match err {
        VideoError::NotFound(path) => {
            println!("[FAIL] Video file not found: {}", path.display());
        }
        VideoError::ToolMissing { tool } => {
            println!("[FAIL] {tool} not found. FFmpeg tools not installed.");
        }
        err => {
            println!("[FAIL] ffprobe failed: {err}");
            if let VideoError::ToolFailed { stderr, .. } = err {
                println!("   stderr: {}", stderr.trim());
            }
        }
    }
}

fn print_probe(report: &ProbeReport) {
    let summary = &report.summary;
    if let Some(format) = &summary.format {
        let name = format.format_name.as_deref().unwrap_or("unknown");
        match summary.duration_secs() {
            Some(secs) => println!("Container: {name}, {secs:.2}s"),
            None => println!("Container: {name}"),
        }
    }
    for stream in summary.video_streams() {
        let codec = stream.codec_name.as_deref().unwrap_or("unknown");
        let size = match (stream.width, stream.height) {
            (Some(w), Some(h)) => format!("{w}x{h}"),
            _ => "unknown size".to_string(),
        };
        match stream.frame_rate() {
            Some(fps) => println!("Video stream #{}: {codec} {size} @ {fps:.2} fps", stream.index),
            None => println!("Video stream #{}: {codec} {size}", stream.index),
        }
    }
    println!("Video Information:");
    println!("{}", report.readable.trim_end());
}

fn print_layout(layout: &ContainerLayout) {
    println!("First 64 bytes (hex): {}", layout.preview_hex());
    println!("First 64 bytes (ascii): {}", layout.preview_ascii());
    if layout.starts_with_size_box {
        println!("[OK] Appears to be MP4/MOV format (starts with size box)");
    }
    if layout.moov_in_header {
        println!("[OK] moov atom found in header (normal structure)");
    } else {
        println!("[WARN] moov atom NOT in header - likely at end of file");
    }
    if layout.moov_in_footer {
        println!("[OK] moov atom found at end of file (GoPro/live recording structure)");
    } else {
        println!("[FAIL] moov atom not found at end either");
    }
    if layout.mdat_in_first_chunk {
        println!("[OK] mdat atom found (media data present)");
    } else {
        println!("[WARN] mdat atom not found in first 8KB");
    }

    println!("Top-level boxes:");
    for entry in &layout.boxes {
        println!(
            "   {} at {} ({})",
            entry.kind_str(),
            entry.offset,
            format_size(entry.size)
        );
    }
    if layout.truncated {
        println!("[WARN] box walk stopped at a malformed or truncated box");
    }
    match layout.moov_placement() {
        MoovPlacement::BeforeMdat => println!("moov placement: before mdat (fast start)"),
        MoovPlacement::AfterMdat => println!("moov placement: after mdat"),
        MoovPlacement::Missing => println!("moov placement: missing"),
    }
}

fn print_outcome(report: &MethodReport) {
    match &report.outcome {
        MethodOutcome::Success {
            frames,
            elapsed,
            tail,
        } => {
            println!(
                "[OK] SUCCESS: {frames} frames in {:.2}s",
                elapsed.as_secs_f64()
            );
            print_tail("Last few log lines:", tail);
        }
        MethodOutcome::NoFrames { tail, .. } => {
            println!("[WARN] Command succeeded but no frames extracted");
            print_tail("Last few log lines:", tail);
        }
        MethodOutcome::Failed {
            status,
            elapsed,
            tail,
        } => {
            let status = status.map_or_else(|| "signal".to_string(), |code| code.to_string());
            println!(
                "[FAIL] FAILED (exit code {status}) after {:.2}s",
                elapsed.as_secs_f64()
            );
            print_tail("Error details:", tail);
        }
        MethodOutcome::Timeout { limit } => {
            println!("[TIMEOUT] TIMEOUT after {} seconds", limit.as_secs());
        }
        MethodOutcome::Error { message } => println!("[FAIL] UNEXPECTED ERROR: {message}"),
    }
}

fn print_tail(heading: &str, tail: &[String]) {
    if tail.is_empty() {
        return;
    }
    println!("{heading}");
    for line in tail {
        println!("   {line}");
    }
}

/// Times the one-frame-per-second extraction on `video` or the working video.
pub fn extract_speed(settings: &VideoSettings, video: Option<&Path>) -> Result<()> {
    let video: PathBuf = video.map_or_else(|| settings.working_video.clone(), Path::to_path_buf);
    if !video.exists() {
        println!("Test video not found: {}", video.display());
        return Ok(());
    }

    println!("Testing FFmpeg extraction with: {}", video.display());
    let output_dir = Path::new(SPEED_OUTPUT_DIR);
    match time_extraction(&tools(settings), &video, output_dir) {
        Ok(timing) => {
            println!("FFmpeg extraction successful!");
            println!("  - Extracted {} frames", timing.frames);
            println!(
                "  - Time taken: {:.3} seconds",
                timing.elapsed.as_secs_f64()
            );
            println!("  - Speed: {:.1} frames/second", timing.frames_per_second());
            println!("  - Performance: {}", timing.grade());
        }
        Err(err) => match err.downcast_ref::<VideoError>() {
            Some(VideoError::ToolFailed { stderr, .. }) => {
                println!("FFmpeg extraction failed: {err}");
                println!("  stderr: {}", stderr.trim());
            }
            _ => println!("Unexpected error: {err:#}"),
        },
    }
    remove_scratch(output_dir, settings.keep_frames)
}
