use std::{fmt::Write as _, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::Serialize;

/// Device the published VGGT numbers were measured on.
pub const REFERENCE_DEVICE: &str = "H100";

const REFERENCE_FRAMES: [usize; 7] = [1, 2, 4, 8, 10, 20, 50];
const REFERENCE_TIME_SECS: [f64; 7] = [0.04, 0.05, 0.07, 0.11, 0.14, 0.31, 1.04];
const REFERENCE_MEMORY_GB: [f64; 7] = [1.88, 2.07, 2.45, 3.23, 3.63, 5.58, 11.41];

const RULE_WIDTH: usize = 70;

/// Input counts exercised by default, matching the published table.
pub fn default_batch_sizes() -> Vec<usize> {
    REFERENCE_FRAMES.to_vec()
}

/// Published latency for exactly `num_images` inputs. Sizes outside the table
/// have no reference.
pub fn reference_time(num_images: usize) -> Option<f64> {
    REFERENCE_FRAMES
        .iter()
        .position(|&frames| frames == num_images)
        .map(|idx| REFERENCE_TIME_SECS[idx])
}

pub fn reference_memory_gb(num_images: usize) -> Option<f64> {
    REFERENCE_FRAMES
        .iter()
        .position(|&frames| frames == num_images)
        .map(|idx| REFERENCE_MEMORY_GB[idx])
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunStats {
    pub runs: usize,
    pub mean_secs: f64,
    /// Population standard deviation.
    pub std_secs: f64,
}

impl RunStats {
    pub fn from_durations(samples: &[Duration]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let secs: Vec<f64> = samples.iter().map(Duration::as_secs_f64).collect();
        let mean = secs.iter().sum::<f64>() / n;
        let variance = secs.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            runs: samples.len(),
            mean_secs: mean,
            std_secs: variance.sqrt(),
        })
    }
}

/// One row of benchmark output for a given number of input images.
#[derive(Debug, Clone, Serialize)]
pub struct BatchMeasurement {
    pub num_images: usize,
    pub load_secs: f64,
    pub input_shape: Vec<usize>,
    pub inference: RunStats,
    pub peak_tracked_bytes: usize,
    pub host_peak_rss: Option<u64>,
}

impl BatchMeasurement {
    pub fn memory_gb(&self) -> f64 {
        self.peak_tracked_bytes as f64 / 1e9
    }

    /// Ratio of measured to published latency; `None` without a reference.
    pub fn slowdown(&self) -> Option<f64> {
        reference_time(self.num_images)
            .filter(|reference| *reference > 0.0)
            .map(|reference| self.inference.mean_secs / reference)
    }
}

fn table_rows(out: &mut String, frames: &[usize], times: &[f64], memory: &[f64]) {
    let join_frames = frames
        .iter()
        .map(|n| format!("{n:5}"))
        .collect::<Vec<_>>()
        .join("|");
    let join_f64 = |values: &[f64]| {
        values
            .iter()
            .map(|v| format!("{v:5.2}"))
            .collect::<Vec<_>>()
            .join("|")
    };
    let _ = writeln!(out, "Input Frames |{join_frames}|");
    let _ = writeln!(out, "Time (s)     |{}|", join_f64(times));
    let _ = writeln!(out, "Memory (GB)  |{}|", join_f64(memory));
}

/// Renders the paper comparison table followed by measured results and the
/// per-size slowdown analysis.
pub fn render_summary(results: &[BatchMeasurement], device_label: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "BENCHMARK RESULTS SUMMARY");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "Paper benchmarks ({REFERENCE_DEVICE} GPU):");
    table_rows(
        &mut out,
        &REFERENCE_FRAMES,
        &REFERENCE_TIME_SECS,
        &REFERENCE_MEMORY_GB,
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "Our results ({device_label}):");
    let frames: Vec<usize> = results.iter().map(|r| r.num_images).collect();
    let times: Vec<f64> = results.iter().map(|r| r.inference.mean_secs).collect();
    let memory: Vec<f64> = results.iter().map(BatchMeasurement::memory_gb).collect();
    table_rows(&mut out, &frames, &times, &memory);
    let _ = writeln!(out);
    let _ = writeln!(out, "Analysis:");
    for result in results {
        let Some(ratio) = result.slowdown() else {
            continue;
        };
        if ratio >= 1.0 {
            let _ = writeln!(
                out,
                "  {} images: {ratio:.1}x slower than {REFERENCE_DEVICE}",
                result.num_images
            );
        } else {
            let _ = writeln!(
                out,
                "  {} images: {:.1}x faster than {REFERENCE_DEVICE}",
                result.num_images,
                1.0 / ratio
            );
        }
    }
    out
}

/// Machine-readable copy of a benchmark run.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub model: String,
    pub device: String,
    pub dtype: String,
    pub weights_bytes: usize,
    pub results: Vec<BatchMeasurement>,
}

impl BenchReport {
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create benchmark directory {}", parent.display())
                })?;
            }
        }
        let data = serde_json::to_vec_pretty(self)?;
        fs::write(path, data)
            .with_context(|| format!("failed to write benchmark output {}", path.display()))?;
        Ok(())
    }
}
