use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use vggt_probe_config::{AppConfig, ConfigOverride, ConfigOverrides};
use vggt_probe_core::runtime::{DeviceKind, Precision};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "VGGT inference benchmark and video extraction diagnostics",
    long_about = None
)]
pub struct Cli {
    /// Optional path to a configuration file (defaults to platform config dir).
    #[arg(long, value_name = "PATH", global = true, help_heading = "Application")]
    pub config: Option<PathBuf>,

    /// Only log errors.
    #[arg(long, global = true, help_heading = "Application")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Time encoder inference across batch sizes and compare with published numbers.
    Bench(BenchArgs),
    /// Try every extraction method on a working video and on the latest upload.
    DebugVideo(DebugVideoArgs),
    /// Time a single one-frame-per-second extraction.
    ExtractSpeed(ExtractSpeedArgs),
    /// Report file size and ffprobe output for a video.
    Probe(InspectArgs),
    /// Inspect the container box layout of a video.
    Layout(LayoutArgs),
}

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Select which model entry to load from the configuration.
    #[arg(long, value_name = "ID")]
    pub model: Option<String>,

    /// Override the model configuration JSON path.
    #[arg(long, value_name = "PATH")]
    pub model_config: Option<PathBuf>,

    /// Override the weights path (defaults to the cached model.safetensors).
    #[arg(long, value_name = "PATH")]
    pub weights: Option<PathBuf>,

    /// Device backend to execute on (cpu/metal/cuda).
    #[arg(long, help_heading = "Inference")]
    pub device: Option<DeviceKind>,

    /// Numeric precision. Defaults to f32 on CPU, f16 on Metal and bf16 on CUDA.
    #[arg(long, help_heading = "Inference")]
    pub dtype: Option<Precision>,

    /// Directory of input images, used in lexical order.
    #[arg(long, value_name = "DIR", help_heading = "Inference")]
    pub image_dir: Option<PathBuf>,

    /// Comma-separated image counts to benchmark.
    #[arg(long, value_delimiter = ',', value_name = "N,...", help_heading = "Inference")]
    pub batch_sizes: Option<Vec<usize>>,

    /// Timed runs per batch size.
    #[arg(long, help_heading = "Inference")]
    pub runs: Option<usize>,

    /// Untimed warmup runs per batch size.
    #[arg(long, help_heading = "Inference")]
    pub warmup: Option<usize>,

    /// Resized image width; must be a multiple of 14.
    #[arg(long, help_heading = "Inference")]
    pub target_size: Option<u32>,

    /// Also write the measurements as JSON.
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub struct ToolArgs {
    /// ffmpeg executable.
    #[arg(long, value_name = "PATH", help_heading = "Tools")]
    pub ffmpeg: Option<PathBuf>,

    /// ffprobe executable.
    #[arg(long, value_name = "PATH", help_heading = "Tools")]
    pub ffprobe: Option<PathBuf>,

    /// Seconds before a single extraction method is killed.
    #[arg(long, value_name = "SECS", help_heading = "Tools")]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct DebugVideoArgs {
    /// Video to debug; defaults to the newest upload.
    pub video: Option<PathBuf>,

    /// Known-good video used as the baseline.
    #[arg(long, value_name = "PATH")]
    pub working_video: Option<PathBuf>,

    /// Directory holding `input_images_*` upload folders.
    #[arg(long, value_name = "DIR")]
    pub upload_root: Option<PathBuf>,

    /// Keep extracted frames instead of removing them at exit.
    #[arg(long)]
    pub keep_frames: bool,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Args, Debug)]
pub struct ExtractSpeedArgs {
    /// Video to extract; defaults to the working video.
    pub video: Option<PathBuf>,

    #[arg(long)]
    pub keep_frames: bool,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    pub video: PathBuf,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Args, Debug)]
pub struct LayoutArgs {
    pub video: PathBuf,
}

impl ToolArgs {
    fn apply_to(&self, overrides: &mut ConfigOverrides) {
        overrides.video.ffmpeg = self.ffmpeg.clone();
        overrides.video.ffprobe = self.ffprobe.clone();
        overrides.video.method_timeout_secs = self.timeout;
    }
}

impl From<&Cli> for ConfigOverrides {
    fn from(cli: &Cli) -> Self {
        let mut overrides = ConfigOverrides {
            config_path: cli.config.clone(),
            ..ConfigOverrides::default()
        };
        match &cli.command {
            Command::Bench(args) => {
                overrides.model_id = args.model.clone();
                overrides.model_config = args.model_config.clone();
                overrides.weights = args.weights.clone();
                overrides.benchmark.device = args.device;
                overrides.benchmark.precision = args.dtype;
                overrides.benchmark.image_dir = args.image_dir.clone();
                overrides.benchmark.batch_sizes = args.batch_sizes.clone();
                overrides.benchmark.warmup_runs = args.warmup;
                overrides.benchmark.timed_runs = args.runs;
                overrides.benchmark.target_size = args.target_size;
            }
            Command::DebugVideo(args) => {
                args.tools.apply_to(&mut overrides);
                overrides.video.working_video = args.working_video.clone();
                overrides.video.upload_root = args.upload_root.clone();
                overrides.video.keep_frames = args.keep_frames;
            }
            Command::ExtractSpeed(args) => {
                args.tools.apply_to(&mut overrides);
                overrides.video.keep_frames = args.keep_frames;
            }
            Command::Probe(args) => args.tools.apply_to(&mut overrides),
            Command::Layout(_) => {}
        }
        overrides
    }
}

impl ConfigOverride for &Cli {
    fn apply(self, config: &mut AppConfig) {
        config.apply_overrides(&ConfigOverrides::from(self));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bench_flags_become_overrides() {
        let cli = Cli::parse_from([
            "vggt-probe",
            "--quiet",
            "bench",
            "--batch-sizes",
            "1,4,8",
            "--runs",
            "5",
            "--device",
            "cpu",
        ]);
        assert!(cli.quiet);
        let overrides = ConfigOverrides::from(&cli);
        assert_eq!(overrides.benchmark.batch_sizes, Some(vec![1, 4, 8]));
        assert_eq!(overrides.benchmark.timed_runs, Some(5));
        assert_eq!(overrides.benchmark.device, Some(DeviceKind::Cpu));
    }

    #[test]
    fn video_flags_become_overrides() {
        let cli = Cli::parse_from([
            "vggt-probe",
            "debug-video",
            "clip.MP4",
            "--timeout",
            "5",
            "--keep-frames",
            "--config",
            "custom.toml",
        ]);
        let overrides = ConfigOverrides::from(&cli);
        assert_eq!(overrides.config_path, Some(PathBuf::from("custom.toml")));
        assert_eq!(overrides.video.method_timeout_secs, Some(5));
        assert!(overrides.video.keep_frames);
        match cli.command {
            Command::DebugVideo(args) => assert_eq!(args.video, Some(PathBuf::from("clip.MP4"))),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
