use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Hyper-parameters of a Hugging Face `Dinov2Model` checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Dinov2Config {
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub mlp_ratio: f64,
    pub patch_size: usize,
    pub image_size: usize,
    pub num_channels: usize,
    pub layer_norm_eps: f64,
    pub qkv_bias: bool,
    pub use_swiglu_ffn: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RawDinov2Config {
    hidden_size: usize,
    num_hidden_layers: usize,
    num_attention_heads: usize,
    mlp_ratio: Option<f64>,
    patch_size: Option<usize>,
    image_size: Option<usize>,
    num_channels: Option<usize>,
    layer_norm_eps: Option<f64>,
    qkv_bias: Option<bool>,
    use_swiglu_ffn: Option<bool>,
}

impl From<RawDinov2Config> for Dinov2Config {
    fn from(raw: RawDinov2Config) -> Self {
        Self {
            hidden_size: raw.hidden_size,
            num_hidden_layers: raw.num_hidden_layers,
            num_attention_heads: raw.num_attention_heads,
            mlp_ratio: raw.mlp_ratio.unwrap_or(4.0),
            patch_size: raw.patch_size.unwrap_or(14),
            image_size: raw.image_size.unwrap_or(518),
            num_channels: raw.num_channels.unwrap_or(3),
            layer_norm_eps: raw.layer_norm_eps.unwrap_or(1e-6),
            qkv_bias: raw.qkv_bias.unwrap_or(true),
            use_swiglu_ffn: raw.use_swiglu_ffn.unwrap_or(false),
        }
    }
}

impl Dinov2Config {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let raw: RawDinov2Config =
            serde_json::from_slice(bytes).context("DINOv2 config contains invalid JSON")?;
        let config = Self::from(raw);
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.num_attention_heads > 0 && self.hidden_size % self.num_attention_heads == 0,
            "hidden size {} not divisible by heads {}",
            self.hidden_size,
            self.num_attention_heads
        );
        ensure!(
            self.patch_size > 0 && self.image_size % self.patch_size == 0,
            "image size {} is not a multiple of patch size {}",
            self.image_size,
            self.patch_size
        );
        Ok(())
    }

    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }

    /// Patches per side of the pretrained position table.
    pub fn grid_size(&self) -> usize {
        self.image_size / self.patch_size
    }

    pub fn mlp_hidden_size(&self) -> usize {
        (self.hidden_size as f64 * self.mlp_ratio) as usize
    }

    /// Inner width of the SwiGLU feed-forward (giant variant), rounded up to a multiple of 8.
    pub fn swiglu_hidden_size(&self) -> usize {
        (self.mlp_hidden_size() * 2 / 3).div_ceil(8) * 8
    }

    pub fn parameter_count(&self) -> usize {
        let h = self.hidden_size;
        let patch_area = self.patch_size * self.patch_size;
        let positions = 1 + self.grid_size() * self.grid_size();

        // cls + mask tokens, position table, patch projection
        let embeddings = 2 * h + positions * h + self.num_channels * patch_area * h + h;
        let attention = 4 * h * h + if self.qkv_bias { 3 * h } else { 0 } + h;
        let norms_and_scales = 4 * h + 2 * h;
        let mlp = if self.use_swiglu_ffn {
            let inner = self.swiglu_hidden_size();
            h * 2 * inner + 2 * inner + inner * h + h
        } else {
            let inner = self.mlp_hidden_size();
            h * inner + inner + inner * h + h
        };
        let per_layer = attention + norms_and_scales + mlp;
        embeddings + self.num_hidden_layers * per_layer + 2 * h
    }
}

pub fn load_dinov2_config(path: &Path) -> Result<Dinov2Config> {
    let bytes = fs::read(path)
        .with_context(|| format!("failed to read DINOv2 config from {}", path.display()))?;
    Dinov2Config::from_json(&bytes)
        .with_context(|| format!("invalid DINOv2 config at {}", path.display()))
}
