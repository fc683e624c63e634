use anyhow::{Context, Result, ensure};
use candle_core::{DType, Device, Module, Tensor, shape::D};
use candle_nn::{
    Conv2d, Conv2dConfig, LayerNorm, Linear, VarBuilder, conv2d, layer_norm, linear, linear_b,
    ops::softmax_last_dim,
};
use vggt_probe_core::memlog::{self, tensor_bytes};

use crate::config::Dinov2Config;

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// DINOv2 encoder returning the final hidden states `[batch, 1 + patches, hidden]`.
pub struct Dinov2Model {
    config: Dinov2Config,
    embeddings: Dinov2Embeddings,
    layers: Vec<Dinov2Layer>,
    layernorm: LayerNorm,
    pixel_mean: Tensor,
    pixel_std: Tensor,
    dtype: DType,
}

impl Dinov2Model {
    pub fn load(config: Dinov2Config, vb: VarBuilder) -> Result<Self> {
        // Checkpoints exported from wrapper models nest the encoder one level down.
        let vb = if vb.contains_tensor("dinov2.embeddings.cls_token") {
            vb.pp("dinov2")
        } else {
            vb
        };
        let dtype = vb.dtype();
        let device = vb.device().clone();

        let embeddings = Dinov2Embeddings::load(&config, vb.pp("embeddings"))
            .context("failed to load DINOv2 embeddings")?;
        let layers_vb = vb.pp("encoder").pp("layer");
        let layers = (0..config.num_hidden_layers)
            .map(|idx| {
                Dinov2Layer::load(&config, layers_vb.pp(idx.to_string()))
                    .with_context(|| format!("failed to load DINOv2 layer {idx}"))
            })
            .collect::<Result<Vec<_>>>()?;
        let layernorm = layer_norm(config.hidden_size, config.layer_norm_eps, vb.pp("layernorm"))?;

        let pixel_mean = channel_constant(&IMAGENET_MEAN, &device)?;
        let pixel_std = channel_constant(&IMAGENET_STD, &device)?;

        memlog::add_persistent(config.parameter_count() * dtype.size_in_bytes());
        Ok(Self {
            config,
            embeddings,
            layers,
            layernorm,
            pixel_mean,
            pixel_std,
            dtype,
        })
    }

    pub fn config(&self) -> &Dinov2Config {
        &self.config
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Runs the encoder on `[batch, 3, H, W]` pixels in `[0, 1]`.
    ///
    /// `H` and `W` must be multiples of the patch size. ImageNet normalisation is
    /// applied here, so callers pass raw preprocessed images.
    pub fn forward(&self, pixels: &Tensor) -> Result<Tensor> {
        let (_batch, channels, height, width) = pixels
            .dims4()
            .context("DINOv2 pixels must have shape [batch, 3, H, W]")?;
        ensure!(
            channels == self.config.num_channels,
            "DINOv2 expects {} channels, got {channels}",
            self.config.num_channels
        );
        let patch = self.config.patch_size;
        ensure!(
            height % patch == 0 && width % patch == 0,
            "image dims {height}x{width} must align with patch size {patch}"
        );

        let normalized = pixels
            .to_dtype(DType::F32)?
            .broadcast_sub(&self.pixel_mean)?
            .broadcast_div(&self.pixel_std)?
            .to_dtype(self.dtype)?;
        let _input = memlog::transient(tensor_bytes(&normalized));

        let mut hidden = self.embeddings.forward(&normalized)?;
        for layer in &self.layers {
            let _live = memlog::transient(tensor_bytes(&hidden));
            hidden = layer.forward(&hidden)?;
        }
        Ok(self.layernorm.forward(&hidden)?)
    }
}

fn channel_constant(values: &[f32; 3], device: &Device) -> Result<Tensor> {
    Ok(Tensor::new(values, device)?.reshape((1, 3, 1, 1))?)
}

struct Dinov2Embeddings {
    cls_token: Tensor,
    position_embeddings: Tensor,
    patch_embeddings: Conv2d,
    grid_size: usize,
}

impl Dinov2Embeddings {
    fn load(config: &Dinov2Config, vb: VarBuilder) -> Result<Self> {
        let hidden = config.hidden_size;
        let grid_size = config.grid_size();
        let cls_token = vb
            .get((1, 1, hidden), "cls_token")
            .context("missing DINOv2 cls_token")?;
        let position_embeddings = vb
            .get((1, 1 + grid_size * grid_size, hidden), "position_embeddings")
            .context("missing DINOv2 position_embeddings")?;
        let conv_config = Conv2dConfig {
            stride: config.patch_size,
            ..Default::default()
        };
        let patch_embeddings = conv2d(
            config.num_channels,
            hidden,
            config.patch_size,
            conv_config,
            vb.pp("patch_embeddings").pp("projection"),
        )?;
        Ok(Self {
            cls_token,
            position_embeddings,
            patch_embeddings,
            grid_size,
        })
    }

    fn forward(&self, pixels: &Tensor) -> Result<Tensor> {
        let patches = self.patch_embeddings.forward(pixels)?;
        let (batch, hidden, grid_h, grid_w) = patches.dims4()?;
        let patches = patches.flatten_from(2)?.transpose(1, 2)?;
        let cls = self.cls_token.expand((batch, 1, hidden))?;
        let tokens = Tensor::cat(&[&cls, &patches], 1)?;
        let positions = self.positions_for(grid_h, grid_w)?;
        Ok(tokens.broadcast_add(&positions)?.contiguous()?)
    }

    /// Position table for a `grid_h x grid_w` patch grid; nearest resampling off the
    /// pretrained square grid.
    fn positions_for(&self, grid_h: usize, grid_w: usize) -> Result<Tensor> {
        if grid_h == self.grid_size && grid_w == self.grid_size {
            return Ok(self.position_embeddings.clone());
        }
        let (_, tokens, hidden) = self.position_embeddings.dims3()?;
        let dtype = self.position_embeddings.dtype();
        let cls_pos = self.position_embeddings.narrow(1, 0, 1)?;
        let patch_pos = self
            .position_embeddings
            .narrow(1, 1, tokens - 1)?
            .to_dtype(DType::F32)?
            .reshape((1, self.grid_size, self.grid_size, hidden))?
            .permute((0, 3, 1, 2))?
            .contiguous()?;
        let resized = patch_pos
            .upsample_nearest2d(grid_h, grid_w)?
            .permute((0, 2, 3, 1))?
            .reshape((1, grid_h * grid_w, hidden))?
            .to_dtype(dtype)?;
        Ok(Tensor::cat(&[&cls_pos, &resized], 1)?)
    }
}

struct Dinov2Layer {
    norm1: LayerNorm,
    attention: Dinov2Attention,
    layer_scale1: Tensor,
    norm2: LayerNorm,
    mlp: Dinov2Mlp,
    layer_scale2: Tensor,
}

impl Dinov2Layer {
    fn load(config: &Dinov2Config, vb: VarBuilder) -> Result<Self> {
        let hidden = config.hidden_size;
        let eps = config.layer_norm_eps;
        Ok(Self {
            norm1: layer_norm(hidden, eps, vb.pp("norm1"))?,
            attention: Dinov2Attention::load(config, vb.pp("attention"))?,
            layer_scale1: vb.pp("layer_scale1").get(hidden, "lambda1")?,
            norm2: layer_norm(hidden, eps, vb.pp("norm2"))?,
            mlp: Dinov2Mlp::load(config, vb.pp("mlp"))?,
            layer_scale2: vb.pp("layer_scale2").get(hidden, "lambda1")?,
        })
    }

    fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        let attn = self.attention.forward(&self.norm1.forward(hidden)?)?;
        let hidden = hidden.add(&attn.broadcast_mul(&self.layer_scale1)?)?;
        let mlp = self.mlp.forward(&self.norm2.forward(&hidden)?)?;
        Ok(hidden.add(&mlp.broadcast_mul(&self.layer_scale2)?)?)
    }
}

struct Dinov2Attention {
    query: Linear,
    key: Linear,
    value: Linear,
    output: Linear,
    num_heads: usize,
    head_dim: usize,
}

impl Dinov2Attention {
    fn load(config: &Dinov2Config, vb: VarBuilder) -> Result<Self> {
        let hidden = config.hidden_size;
        let inner = vb.pp("attention");
        Ok(Self {
            query: linear_b(hidden, hidden, config.qkv_bias, inner.pp("query"))?,
            key: linear_b(hidden, hidden, config.qkv_bias, inner.pp("key"))?,
            value: linear_b(hidden, hidden, config.qkv_bias, inner.pp("value"))?,
            output: linear(hidden, hidden, vb.pp("output").pp("dense"))?,
            num_heads: config.num_attention_heads,
            head_dim: config.head_dim(),
        })
    }

    fn split_heads(&self, x: &Tensor) -> Result<Tensor> {
        let (batch, seq, _) = x.dims3()?;
        Ok(x.reshape((batch, seq, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()?)
    }

    fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        let (batch, seq, dim) = hidden.dims3()?;
        let q = self.split_heads(&self.query.forward(hidden)?)?;
        let k = self.split_heads(&self.key.forward(hidden)?)?;
        let v = self.split_heads(&self.value.forward(hidden)?)?;
        let _qkv = memlog::transient(3 * tensor_bytes(&q));

        let scale = 1.0 / (self.head_dim as f64).sqrt();
        let scores = (q.matmul(&k.transpose(D::Minus2, D::Minus1)?)? * scale)?;
        let _scores = memlog::transient(tensor_bytes(&scores));
        let probs = softmax_last_dim(&scores)?;
        let context = probs
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, seq, dim))?;
        Ok(self.output.forward(&context)?)
    }
}

enum Dinov2Mlp {
    Gelu { fc1: Linear, fc2: Linear },
    SwiGlu { weights_in: Linear, weights_out: Linear },
}

impl Dinov2Mlp {
    fn load(config: &Dinov2Config, vb: VarBuilder) -> Result<Self> {
        let hidden = config.hidden_size;
        if config.use_swiglu_ffn {
            let inner = config.swiglu_hidden_size();
            Ok(Self::SwiGlu {
                weights_in: linear(hidden, 2 * inner, vb.pp("weights_in"))?,
                weights_out: linear(inner, hidden, vb.pp("weights_out"))?,
            })
        } else {
            let inner = config.mlp_hidden_size();
            Ok(Self::Gelu {
                fc1: linear(hidden, inner, vb.pp("fc1"))?,
                fc2: linear(inner, hidden, vb.pp("fc2"))?,
            })
        }
    }

    fn forward(&self, hidden: &Tensor) -> Result<Tensor> {
        match self {
            Self::Gelu { fc1, fc2 } => {
                let x = fc1.forward(hidden)?;
                let _live = memlog::transient(tensor_bytes(&x));
                Ok(fc2.forward(&x.gelu_erf()?)?)
            }
            Self::SwiGlu {
                weights_in,
                weights_out,
            } => {
                let x = weights_in.forward(hidden)?;
                let _live = memlog::transient(tensor_bytes(&x));
                let halves = x.chunk(2, D::Minus1)?;
                let gated = halves[0].silu()?.mul(&halves[1])?;
                Ok(weights_out.forward(&gated)?)
            }
        }
    }
}
