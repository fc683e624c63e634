use std::{
    fmt,
    path::Path,
    time::{Duration, Instant},
};

use anyhow::Result;

use crate::{
    frames::count_frames,
    methods::prepare_output_dir,
    runner::{CommandSpec, Tools, run_captured},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedGrade {
    Excellent,
    Good,
    Slow,
}

impl SpeedGrade {
    pub fn from_elapsed(elapsed: Duration) -> Self {
        let secs = elapsed.as_secs_f64();
        if secs < 5.0 {
            Self::Excellent
        } else if secs < 10.0 {
            Self::Good
        } else {
            Self::Slow
        }
    }
}

impl fmt::Display for SpeedGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Excellent => "EXCELLENT (< 5s)",
            Self::Good => "GOOD (< 10s)",
            Self::Slow => "SLOW (> 10s)",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionTiming {
    pub frames: usize,
    pub elapsed: Duration,
}

impl ExtractionTiming {
    pub fn frames_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.frames as f64 / secs
        } else {
            0.0
        }
    }

    pub fn grade(&self) -> SpeedGrade {
        SpeedGrade::from_elapsed(self.elapsed)
    }
}

/// Extracts one frame per second of `video` into a fresh `output_dir` and
/// times the whole ffmpeg run. No timeout applies.
pub fn time_extraction(
    tools: &Tools,
    video: &Path,
    output_dir: &Path,
) -> Result<ExtractionTiming> {
    prepare_output_dir(output_dir)?;
    let spec = CommandSpec::new(&tools.ffmpeg)
        .arg("-i")
        .arg(video)
        .args(["-vf", "fps=1", "-y", "-loglevel", "warning"])
        .arg(output_dir.join("%06d.png"));

    let start = Instant::now();
    run_captured(&spec, None)?;
    let elapsed = start.elapsed();

    Ok(ExtractionTiming {
        frames: count_frames(output_dir, "")?,
        elapsed,
    })
}
