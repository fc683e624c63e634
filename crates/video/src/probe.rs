use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::{
    error::VideoError,
    runner::{CommandSpec, Tools, run_captured},
};

/// Subset of `ffprobe -print_format json -show_format -show_streams`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeSummary {
    #[serde(default)]
    pub streams: Vec<ProbeStream>,
    pub format: Option<ProbeFormat>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeStream {
    #[serde(default)]
    pub index: usize,
    pub codec_type: Option<String>,
    pub codec_name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub r_frame_rate: Option<String>,
    pub duration: Option<String>,
    pub nb_frames: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProbeFormat {
    pub format_name: Option<String>,
    pub duration: Option<String>,
    pub size: Option<String>,
    pub bit_rate: Option<String>,
}

impl ProbeSummary {
    pub fn from_json(json: &str) -> Result<Self, VideoError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn video_streams(&self) -> impl Iterator<Item = &ProbeStream> {
        self.streams
            .iter()
            .filter(|stream| stream.codec_type.as_deref() == Some("video"))
    }

    /// Container duration in seconds, falling back to the first video stream.
    pub fn duration_secs(&self) -> Option<f64> {
        self.format
            .as_ref()
            .and_then(|format| format.duration.as_deref())
            .or_else(|| self.video_streams().find_map(|s| s.duration.as_deref()))
            .and_then(|value| value.parse().ok())
    }
}

impl ProbeStream {
    /// `r_frame_rate` as a number; ffprobe reports it as a `num/den` fraction.
    pub fn frame_rate(&self) -> Option<f64> {
        let raw = self.r_frame_rate.as_deref()?;
        match raw.split_once('/') {
            Some((num, den)) => {
                let num: f64 = num.trim().parse().ok()?;
                let den: f64 = den.trim().parse().ok()?;
                (den != 0.0).then(|| num / den)
            }
            None => raw.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub path: PathBuf,
    pub file_size: u64,
    pub summary: ProbeSummary,
    /// `ffprobe -hide_banner` output, which ffprobe writes to stderr.
    pub readable: String,
}

/// Size on disk, available even when ffprobe cannot parse the file.
pub fn file_size(path: &Path) -> Result<u64, VideoError> {
    if !path.exists() {
        return Err(VideoError::NotFound(path.to_path_buf()));
    }
    Ok(std::fs::metadata(path)?.len())
}

/// Stats the file and runs both ffprobe passes over it.
pub fn analyze(tools: &Tools, path: &Path) -> Result<ProbeReport, VideoError> {
    let file_size = file_size(path)?;

    let json = CommandSpec::new(&tools.ffprobe)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path);
    let output = run_captured(&json, Some(tools.timeout))?;
    let summary = ProbeSummary::from_json(&output.stdout)?;

    let readable = CommandSpec::new(&tools.ffprobe)
        .arg("-hide_banner")
        .arg(path);
    let readable = run_captured(&readable, Some(tools.timeout))?.stderr;

    Ok(ProbeReport {
        path: path.to_path_buf(),
        file_size,
        summary,
        readable,
    })
}

/// `1,234,567 bytes (1.18 MB)`, with MB meaning MiB.
pub fn format_size(bytes: u64) -> String {
    let digits = bytes.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!(
        "{grouped} bytes ({:.2} MB)",
        bytes as f64 / 1024.0 / 1024.0
    )
}
