use std::{
    collections::BTreeMap,
    fs,
    ops::AddAssign,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow, ensure};
use serde::{Deserialize, Serialize};
use vggt_probe_core::{
    benchmark::default_batch_sizes,
    runtime::{DeviceKind, Precision},
    vision::DEFAULT_TARGET_SIZE,
};

use crate::fs::{VirtualFileSystem, VirtualPath};

pub const DEFAULT_MODEL_ID: &str = "dinov2-large";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub models: ModelRegistry,
    pub benchmark: BenchmarkSettings,
    pub video: VideoSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRegistry {
    pub active: String,
    pub entries: BTreeMap<String, ModelEntry>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        let mut entries = BTreeMap::new();
        ensure_default_model_entries(&mut entries);
        Self {
            active: DEFAULT_MODEL_ID.to_string(),
            entries,
        }
    }
}

fn ensure_default_model_entries(entries: &mut BTreeMap<String, ModelEntry>) {
    for size in ["small", "base", "large", "giant"] {
        entries
            .entry(format!("dinov2-{size}"))
            .or_insert_with(|| ModelEntry::for_repo(format!("facebook/dinov2-{size}")));
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelEntry {
    /// Hugging Face repository holding `config.json` and `model.safetensors`.
    pub repo: String,
    pub config: Option<PathBuf>,
    pub weights: Option<PathBuf>,
}

impl ModelEntry {
    fn for_repo(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            ..Self::default()
        }
    }

    fn resolved(&self, model_id: &str) -> ModelResources {
        let config = match &self.config {
            Some(path) => ResourceLocation::Physical(path.clone()),
            None => ResourceLocation::Virtual(VirtualPath::model_config(model_id)),
        };
        let weights = match &self.weights {
            Some(path) => ResourceLocation::Physical(path.clone()),
            None => ResourceLocation::Virtual(VirtualPath::model_weights(model_id)),
        };
        ModelResources {
            id: model_id.to_string(),
            repo: self.repo.clone(),
            config,
            weights,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchmarkSettings {
    pub device: DeviceKind,
    pub precision: Option<Precision>,
    pub image_dir: PathBuf,
    pub batch_sizes: Vec<usize>,
    pub warmup_runs: usize,
    pub timed_runs: usize,
    pub target_size: u32,
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            device: DeviceKind::Cpu,
            precision: None,
            image_dir: PathBuf::from("examples/kitchen/images"),
            batch_sizes: default_batch_sizes(),
            warmup_runs: 1,
            timed_runs: 3,
            target_size: DEFAULT_TARGET_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSettings {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub method_timeout_secs: u64,
    pub working_video: PathBuf,
    pub upload_root: PathBuf,
    pub upload_prefix: String,
    pub upload_scan_limit: usize,
    pub keep_frames: bool,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            method_timeout_secs: 60,
            working_video: PathBuf::from("examples/videos/kitchen.mp4"),
            upload_root: PathBuf::from("."),
            upload_prefix: "input_images_".to_string(),
            upload_scan_limit: 3,
            keep_frames: false,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ResourceLocation {
    Virtual(VirtualPath),
    Physical(PathBuf),
}

impl ResourceLocation {
    pub fn display_with(&self, fs: &impl VirtualFileSystem) -> Result<String> {
        match self {
            ResourceLocation::Virtual(path) => {
                fs.with_physical_path(path, |p| Ok(p.display().to_string()))
            }
            ResourceLocation::Physical(path) => Ok(path.display().to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelResources {
    pub id: String,
    pub repo: String,
    pub config: ResourceLocation,
    pub weights: ResourceLocation,
}

pub struct ConfigDescriptor {
    pub location: ResourceLocation,
}

impl AppConfig {
    /// Reads the config file, writing defaults first when it does not exist yet.
    pub fn load_or_init(
        fs: &impl VirtualFileSystem,
        override_path: Option<&Path>,
    ) -> Result<(Self, ConfigDescriptor)> {
        match override_path {
            Some(path) => load_physical_config(path),
            None => load_virtual_config(fs),
        }
    }

    pub fn normalise(&mut self) -> Result<()> {
        ensure_default_model_entries(&mut self.models.entries);
        let active = self.models.active.clone();
        self.models
            .entries
            .entry(active.clone())
            .or_insert_with(|| ModelEntry::for_repo(active));

        let bench = &self.benchmark;
        ensure!(
            !bench.batch_sizes.is_empty(),
            "benchmark.batch_sizes must list at least one size"
        );
        ensure!(
            bench.batch_sizes.iter().all(|&n| n > 0),
            "benchmark.batch_sizes must be positive"
        );
        ensure!(bench.timed_runs > 0, "benchmark.timed_runs must be at least 1");
        ensure!(
            self.video.method_timeout_secs > 0,
            "video.method_timeout_secs must be at least 1"
        );
        Ok(())
    }

    pub fn active_model_resources(&self) -> Result<ModelResources> {
        self.model_resources(&self.models.active)
    }

    pub fn model_resources(&self, model_id: &str) -> Result<ModelResources> {
        let entry = self
            .models
            .entries
            .get(model_id)
            .ok_or_else(|| anyhow!("model `{model_id}` not found in configuration"))?;
        Ok(entry.resolved(model_id))
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(model_id) = overrides.model_id.as_ref() {
            self.models.active = model_id.clone();
            self.models
                .entries
                .entry(model_id.clone())
                .or_insert_with(|| ModelEntry::for_repo(model_id.clone()));
        }

        if let Some(entry) = self.models.entries.get_mut(&self.models.active) {
            if let Some(path) = overrides.model_config.as_ref() {
                entry.config = Some(path.clone());
            }
            if let Some(path) = overrides.weights.as_ref() {
                entry.weights = Some(path.clone());
            }
        }

        let bench = &overrides.benchmark;
        if let Some(device) = bench.device {
            self.benchmark.device = device;
        }
        if bench.precision.is_some() {
            self.benchmark.precision = bench.precision;
        }
        if let Some(dir) = bench.image_dir.as_ref() {
            self.benchmark.image_dir = dir.clone();
        }
        if let Some(sizes) = bench.batch_sizes.as_ref() {
            self.benchmark.batch_sizes = sizes.clone();
        }
        if let Some(runs) = bench.warmup_runs {
            self.benchmark.warmup_runs = runs;
        }
        if let Some(runs) = bench.timed_runs {
            self.benchmark.timed_runs = runs;
        }
        if let Some(size) = bench.target_size {
            self.benchmark.target_size = size;
        }

        let video = &overrides.video;
        if let Some(path) = video.ffmpeg.as_ref() {
            self.video.ffmpeg = path.clone();
        }
        if let Some(path) = video.ffprobe.as_ref() {
            self.video.ffprobe = path.clone();
        }
        if let Some(secs) = video.method_timeout_secs {
            self.video.method_timeout_secs = secs;
        }
        if let Some(path) = video.working_video.as_ref() {
            self.video.working_video = path.clone();
        }
        if let Some(path) = video.upload_root.as_ref() {
            self.video.upload_root = path.clone();
        }
        if video.keep_frames {
            self.video.keep_frames = true;
        }
    }
}

fn parse_config(contents: &str, origin: &str) -> Result<AppConfig> {
    let mut cfg: AppConfig = toml::from_str(contents)
        .with_context(|| format!("failed to parse configuration at {origin}"))?;
    cfg.normalise()
        .with_context(|| format!("invalid configuration at {origin}"))?;
    Ok(cfg)
}

fn load_virtual_config(fs: &impl VirtualFileSystem) -> Result<(AppConfig, ConfigDescriptor)> {
    let path = VirtualPath::config_file();
    let descriptor = ConfigDescriptor {
        location: ResourceLocation::Virtual(path.clone()),
    };
    if !fs.exists(&path)? {
        let mut cfg = AppConfig::default();
        cfg.normalise()?;
        fs.write(&path, toml::to_string_pretty(&cfg)?.as_bytes())?;
        return Ok((cfg, descriptor));
    }

    let bytes = fs.read(&path)?;
    let contents = String::from_utf8(bytes).context("configuration file is not valid UTF-8")?;
    let origin = descriptor.location.display_with(fs)?;
    Ok((parse_config(&contents, &origin)?, descriptor))
}

fn load_physical_config(path: &Path) -> Result<(AppConfig, ConfigDescriptor)> {
    let descriptor = ConfigDescriptor {
        location: ResourceLocation::Physical(path.to_path_buf()),
    };
    if !path.exists() {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        let mut cfg = AppConfig::default();
        cfg.normalise()?;
        fs::write(path, toml::to_string_pretty(&cfg)?)
            .with_context(|| format!("failed to write configuration to {}", path.display()))?;
        return Ok((cfg, descriptor));
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read configuration from {}", path.display()))?;
    Ok((parse_config(&contents, &path.display().to_string())?, descriptor))
}

#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub model_id: Option<String>,
    pub model_config: Option<PathBuf>,
    pub weights: Option<PathBuf>,
    pub benchmark: BenchmarkOverride,
    pub video: VideoOverride,
}

#[derive(Debug, Default, Clone)]
pub struct BenchmarkOverride {
    pub device: Option<DeviceKind>,
    pub precision: Option<Precision>,
    pub image_dir: Option<PathBuf>,
    pub batch_sizes: Option<Vec<usize>>,
    pub warmup_runs: Option<usize>,
    pub timed_runs: Option<usize>,
    pub target_size: Option<u32>,
}

#[derive(Debug, Default, Clone)]
pub struct VideoOverride {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
    pub method_timeout_secs: Option<u64>,
    pub working_video: Option<PathBuf>,
    pub upload_root: Option<PathBuf>,
    pub keep_frames: bool,
}

pub trait ConfigOverride {
    fn apply(self, config: &mut AppConfig);
}

impl ConfigOverride for ConfigOverrides {
    fn apply(self, config: &mut AppConfig) {
        config.apply_overrides(&self);
    }
}

impl ConfigOverride for &ConfigOverrides {
    fn apply(self, config: &mut AppConfig) {
        config.apply_overrides(self);
    }
}

impl<O: ConfigOverride> AddAssign<O> for AppConfig {
    fn add_assign(&mut self, rhs: O) {
        rhs.apply(self);
    }
}
