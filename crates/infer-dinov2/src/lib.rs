use std::path::Path;

use anyhow::{Context, Result};
use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use tracing::debug;

pub mod config;
pub mod model;

pub use config::{Dinov2Config, load_dinov2_config};
pub use model::Dinov2Model;

pub struct ModelLoadArgs<'a> {
    pub config_path: &'a Path,
    pub weights_path: &'a Path,
    pub device: Device,
    pub dtype: DType,
}

/// Memory-maps a safetensors checkpoint and builds the encoder in `args.dtype`.
pub fn load_model(args: ModelLoadArgs<'_>) -> Result<Dinov2Model> {
    let config = load_dinov2_config(args.config_path)?;
    debug!(
        hidden = config.hidden_size,
        layers = config.num_hidden_layers,
        params = config.parameter_count(),
        "parsed DINOv2 config"
    );
    let vb = unsafe {
        VarBuilder::from_mmaped_safetensors(&[args.weights_path], args.dtype, &args.device)
            .with_context(|| {
                format!(
                    "failed to mmap DINOv2 weights from {}",
                    args.weights_path.display()
                )
            })?
    };
    Dinov2Model::load(config, vb)
}
