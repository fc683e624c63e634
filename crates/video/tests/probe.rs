use anyhow::Result;
use vggt_probe_video::{ProbeSummary, Tools, VideoError, analyze, format_size};

const SAMPLE: &str = r#"{
  "streams": [
    {"index": 0, "codec_type": "video", "codec_name": "hevc", "width": 3840,
     "height": 2160, "r_frame_rate": "30000/1001", "nb_frames": "1798"},
    {"index": 1, "codec_type": "audio", "codec_name": "aac"},
    {"index": 2, "codec_type": "data", "codec_name": "bin_data"}
  ],
  "format": {"format_name": "mov,mp4,m4a,3gp,3g2,mj2", "duration": "60.060000",
             "size": "125829120", "bit_rate": "16760000"}
}"#;

#[test]
fn summary_extracts_streams_and_duration() -> Result<()> {
    let summary = ProbeSummary::from_json(SAMPLE)?;
    assert_eq!(summary.streams.len(), 3);
    let video: Vec<_> = summary.video_streams().collect();
    assert_eq!(video.len(), 1);
    assert_eq!(video[0].codec_name.as_deref(), Some("hevc"));
    let fps = video[0].frame_rate().expect("rate present");
    assert!((fps - 29.97).abs() < 0.01);
    assert_eq!(summary.duration_secs(), Some(60.06));
    Ok(())
}

#[test]
fn empty_probe_output_parses_to_nothing() -> Result<()> {
    let summary = ProbeSummary::from_json("{}")?;
    assert!(summary.streams.is_empty());
    assert!(summary.format.is_none());
    assert_eq!(summary.duration_secs(), None);
    assert!(matches!(
        ProbeSummary::from_json("not json"),
        Err(VideoError::InvalidProbe(_))
    ));
    Ok(())
}

#[test]
fn sizes_use_thousands_separators() {
    assert_eq!(format_size(999), "999 bytes (0.00 MB)");
    assert_eq!(format_size(1_000), "1,000 bytes (0.00 MB)");
    assert_eq!(format_size(1_234_567), "1,234,567 bytes (1.18 MB)");
    assert_eq!(format_size(125_829_120), "125,829,120 bytes (120.00 MB)");
}

#[test]
fn missing_video_is_reported_before_running_ffprobe() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("absent.mp4");
    let err = analyze(&Tools::default(), &missing).expect_err("file is missing");
    assert!(matches!(err, VideoError::NotFound(path) if path == missing));
    Ok(())
}

#[cfg(unix)]
#[test]
fn both_ffprobe_passes_are_collected() -> Result<()> {
    use std::{fs, os::unix::fs::PermissionsExt};

    let dir = tempfile::tempdir()?;
    let ffprobe = dir.path().join("ffprobe");
    let script = format!(
        "#!/bin/sh\nif [ \"$1\" = \"-v\" ]; then\ncat <<'JSON'\n{SAMPLE}\nJSON\nelse\necho \"Input #0, mov,mp4,m4a,3gp,3g2,mj2\" >&2\nfi\n"
    );
    fs::write(&ffprobe, script)?;
    let mut perms = fs::metadata(&ffprobe)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&ffprobe, perms)?;

    let video = dir.path().join("clip.mp4");
    fs::write(&video, vec![0u8; 2048])?;

    let tools = Tools {
        ffprobe,
        ..Tools::default()
    };
    let report = analyze(&tools, &video)?;
    assert_eq!(report.file_size, 2048);
    assert_eq!(report.summary.video_streams().count(), 1);
    assert!(report.readable.contains("Input #0"));

    let missing_tool = Tools {
        ffprobe: dir.path().join("not-installed"),
        ..Tools::default()
    };
    assert!(matches!(
        analyze(&missing_tool, &video),
        Err(VideoError::ToolMissing { .. })
    ));
    Ok(())
}

#[cfg(unix)]
#[test]
fn size_is_known_when_ffprobe_rejects_the_file() -> Result<()> {
    use std::{fs, os::unix::fs::PermissionsExt};
    use vggt_probe_video::file_size;

    let dir = tempfile::tempdir()?;
    let ffprobe = dir.path().join("ffprobe");
    fs::write(&ffprobe, "#!/bin/sh\necho \"moov atom not found\" >&2\nexit 1\n")?;
    let mut perms = fs::metadata(&ffprobe)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&ffprobe, perms)?;

    let video = dir.path().join("GX010042.MP4");
    fs::write(&video, vec![0u8; 123_456])?;

    assert_eq!(file_size(&video)?, 123_456);
    assert_eq!(format_size(file_size(&video)?), "123,456 bytes (0.12 MB)");
    let tools = Tools {
        ffprobe,
        ..Tools::default()
    };
    match analyze(&tools, &video) {
        Err(VideoError::ToolFailed { status, stderr, .. }) => {
            assert_eq!(status, Some(1));
            assert_eq!(stderr.trim(), "moov atom not found");
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert!(matches!(
        file_size(&dir.path().join("absent.mp4")),
        Err(VideoError::NotFound(_))
    ));
    Ok(())
}
