//! ConvNeXt architecture.
//!
//! Liu et al., "A ConvNet for the 2020s". Layout follows the torchvision
//! implementation so that exported records map one to one: a patchify stem,
//! four stages of depthwise/inverted-bottleneck blocks separated by
//! downsampling layers, then pooling, LayerNorm and a linear head.

use burn::module::Param;
use burn::nn::{
    conv::{Conv2d, Conv2dConfig},
    pool::{AdaptiveAvgPool2d, AdaptiveAvgPool2dConfig},
    LayerNorm, LayerNormConfig, Linear, LinearConfig, PaddingConfig2d,
};
use burn::prelude::*;
use burn::tensor::activation::gelu;
use serde::{Deserialize, Serialize};

use imgeval_core::{ImageClassifier, ModelSize};

use crate::error::{ModelError, Result};

/// Configuration for a ConvNeXt network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvNextConfig {
    /// Number of input channels.
    pub in_channels: usize,
    /// Number of output classes.
    pub n_classes: usize,
    /// Blocks per stage.
    pub depths: Vec<usize>,
    /// Channel width per stage.
    pub dims: Vec<usize>,
    /// Initial value of the per-channel layer scale.
    pub layer_scale: f32,
    /// LayerNorm epsilon.
    pub eps: f64,
}

impl Default for ConvNextConfig {
    fn default() -> Self {
        Self::for_size(ModelSize::Tiny, 1000)
    }
}

impl ConvNextConfig {
    /// Preset for a capacity variant.
    pub fn for_size(size: ModelSize, n_classes: usize) -> Self {
        let (depths, dims) = match size {
            ModelSize::Tiny => (vec![3, 3, 9, 3], vec![96, 192, 384, 768]),
            ModelSize::Small => (vec![3, 3, 27, 3], vec![96, 192, 384, 768]),
            ModelSize::Base => (vec![3, 3, 27, 3], vec![128, 256, 512, 1024]),
            ModelSize::Large => (vec![3, 3, 27, 3], vec![192, 384, 768, 1536]),
        };
        Self {
            in_channels: 3,
            n_classes,
            depths,
            dims,
            layer_scale: 1e-6,
            eps: 1e-6,
        }
    }

    /// Custom stage layout, mainly for small test networks.
    pub fn new(n_classes: usize, depths: Vec<usize>, dims: Vec<usize>) -> Self {
        Self {
            n_classes,
            depths,
            dims,
            ..Default::default()
        }
    }

    /// Check the stage layout.
    pub fn validate(&self) -> Result<()> {
        if self.n_classes == 0 {
            return Err(ModelError::InvalidConfig(
                "n_classes must be at least 1".to_string(),
            ));
        }
        if self.depths.is_empty() || self.depths.len() != self.dims.len() {
            return Err(ModelError::InvalidConfig(format!(
                "depths ({}) and dims ({}) must be non-empty and of equal length",
                self.depths.len(),
                self.dims.len()
            )));
        }
        if self.dims.contains(&0) || self.in_channels == 0 {
            return Err(ModelError::InvalidConfig(
                "channel widths must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Initialize the model.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ConvNext<B>> {
        self.validate()?;
        Ok(ConvNext::new(self.clone(), device))
    }
}

/// LayerNorm over the channel axis of a `(B, C, H, W)` tensor.
#[derive(Module, Debug)]
pub struct LayerNorm2d<B: Backend> {
    norm: LayerNorm<B>,
}

impl<B: Backend> LayerNorm2d<B> {
    /// Create a channel LayerNorm.
    pub fn new(channels: usize, eps: f64, device: &B::Device) -> Self {
        Self {
            norm: LayerNormConfig::new(channels).with_epsilon(eps).init(device),
        }
    }

    /// Forward pass.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = x.permute([0, 2, 3, 1]);
        self.norm.forward(x).permute([0, 3, 1, 2])
    }
}

/// Depthwise 7x7 conv followed by an inverted bottleneck, with layer scale and skip.
#[derive(Module, Debug)]
pub struct ConvNextBlock<B: Backend> {
    dwconv: Conv2d<B>,
    norm: LayerNorm<B>,
    pwconv1: Linear<B>,
    pwconv2: Linear<B>,
    gamma: Param<Tensor<B, 1>>,
}

impl<B: Backend> ConvNextBlock<B> {
    /// Create a block of width `dim`.
    pub fn new(dim: usize, layer_scale: f32, eps: f64, device: &B::Device) -> Self {
        let dwconv = Conv2dConfig::new([dim, dim], [7, 7])
            .with_padding(PaddingConfig2d::Explicit(3, 3))
            .with_groups(dim)
            .init(device);
        let norm = LayerNormConfig::new(dim).with_epsilon(eps).init(device);
        let pwconv1 = LinearConfig::new(dim, 4 * dim).init(device);
        let pwconv2 = LinearConfig::new(4 * dim, dim).init(device);
        let gamma = Param::from_tensor(Tensor::full([dim], layer_scale, device));

        Self {
            dwconv,
            norm,
            pwconv1,
            pwconv2,
            gamma,
        }
    }

    /// Forward pass.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let residual = x.clone();

        let out = self.dwconv.forward(x);
        // channels last for the pointwise layers
        let out = out.permute([0, 2, 3, 1]);
        let out = self.norm.forward(out);
        let out = self.pwconv1.forward(out);
        let out = gelu(out);
        let out = self.pwconv2.forward(out);

        let [_, _, _, channels] = out.dims();
        let out = out * self.gamma.val().reshape([1, 1, 1, channels]);
        let out = out.permute([0, 3, 1, 2]);

        residual + out
    }
}

/// One resolution stage: optional downsampling, then a run of blocks.
#[derive(Module, Debug)]
pub struct ConvNextStage<B: Backend> {
    downsample_norm: Option<LayerNorm2d<B>>,
    downsample_conv: Option<Conv2d<B>>,
    blocks: Vec<ConvNextBlock<B>>,
}

impl<B: Backend> ConvNextStage<B> {
    fn new(
        in_dim: Option<usize>,
        dim: usize,
        depth: usize,
        config: &ConvNextConfig,
        device: &B::Device,
    ) -> Self {
        let (downsample_norm, downsample_conv) = match in_dim {
            Some(in_dim) => (
                Some(LayerNorm2d::new(in_dim, config.eps, device)),
                Some(
                    Conv2dConfig::new([in_dim, dim], [2, 2])
                        .with_stride([2, 2])
                        .init(device),
                ),
            ),
            None => (None, None),
        };
        let blocks = (0..depth)
            .map(|_| ConvNextBlock::new(dim, config.layer_scale, config.eps, device))
            .collect();

        Self {
            downsample_norm,
            downsample_conv,
            blocks,
        }
    }

    /// Forward pass.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let mut out = x;
        if let (Some(norm), Some(conv)) = (&self.downsample_norm, &self.downsample_conv) {
            out = conv.forward(norm.forward(out));
        }
        for block in &self.blocks {
            out = block.forward(out);
        }
        out
    }
}

/// ConvNeXt image classifier.
#[derive(Module, Debug)]
pub struct ConvNext<B: Backend> {
    stem_conv: Conv2d<B>,
    stem_norm: LayerNorm2d<B>,
    stages: Vec<ConvNextStage<B>>,
    gap: AdaptiveAvgPool2d,
    head_norm: LayerNorm<B>,
    head: Linear<B>,
    n_classes: usize,
}

impl<B: Backend> ConvNext<B> {
    /// Create a new ConvNeXt model. The config is expected to be valid.
    pub fn new(config: ConvNextConfig, device: &B::Device) -> Self {
        let first = config.dims[0];
        let stem_conv = Conv2dConfig::new([config.in_channels, first], [4, 4])
            .with_stride([4, 4])
            .init(device);
        let stem_norm = LayerNorm2d::new(first, config.eps, device);

        let mut stages = Vec::with_capacity(config.dims.len());
        let mut prev: Option<usize> = None;
        for (&dim, &depth) in config.dims.iter().zip(&config.depths) {
            stages.push(ConvNextStage::new(prev, dim, depth, &config, device));
            prev = Some(dim);
        }

        let last = *config.dims.last().unwrap_or(&first);
        let gap = AdaptiveAvgPool2dConfig::new([1, 1]).init();
        let head_norm = LayerNormConfig::new(last).with_epsilon(config.eps).init(device);
        let head = LinearConfig::new(last, config.n_classes).init(device);

        Self {
            stem_conv,
            stem_norm,
            stages,
            gap,
            head_norm,
            head,
            n_classes: config.n_classes,
        }
    }

    /// Forward pass returning logits of shape `(batch, n_classes)`.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let mut out = self.stem_norm.forward(self.stem_conv.forward(x));
        for stage in &self.stages {
            out = stage.forward(out);
        }

        let out = self.gap.forward(out);
        let [batch, channels, _, _] = out.dims();
        let out = out.reshape([batch, channels]);
        let out = self.head_norm.forward(out);
        self.head.forward(out)
    }

    /// Number of output classes.
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

impl<B: Backend> ImageClassifier<B> for ConvNext<B> {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        ConvNext::forward(self, x)
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_presets() {
        let tiny = ConvNextConfig::for_size(ModelSize::Tiny, 10);
        assert_eq!(tiny.depths, vec![3, 3, 9, 3]);
        assert_eq!(tiny.dims, vec![96, 192, 384, 768]);

        let large = ConvNextConfig::for_size(ModelSize::Large, 10);
        assert_eq!(large.depths, vec![3, 3, 27, 3]);
        assert_eq!(large.dims[3], 1536);
    }

    #[test]
    fn test_validate() {
        assert!(ConvNextConfig::new(3, vec![1, 1], vec![8, 16]).validate().is_ok());
        assert!(ConvNextConfig::new(0, vec![1], vec![8]).validate().is_err());
        assert!(ConvNextConfig::new(3, vec![1, 1], vec![8]).validate().is_err());
        assert!(ConvNextConfig::new(3, vec![], vec![]).validate().is_err());
    }

    #[test]
    fn test_forward_shape() {
        let device = Default::default();
        let model = ConvNextConfig::new(5, vec![1, 1], vec![8, 16])
            .init::<TestBackend>(&device)
            .unwrap();

        let x = Tensor::<TestBackend, 4>::random(
            [2, 3, 32, 32],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let logits = model.forward(x);

        assert_eq!(logits.dims(), [2, 5]);
        assert_eq!(model.n_classes(), 5);
    }

    #[test]
    fn test_block_preserves_shape() {
        let device = Default::default();
        let block = ConvNextBlock::<TestBackend>::new(4, 1e-6, 1e-6, &device);
        let x = Tensor::<TestBackend, 4>::ones([1, 4, 6, 6], &device);
        let out = block.forward(x.clone());

        assert_eq!(out.dims(), [1, 4, 6, 6]);
        // layer scale of 1e-6 keeps the block close to identity
        let diff: f32 = (out - x).abs().max().into_scalar().elem();
        assert!(diff < 1e-2);
    }
}
