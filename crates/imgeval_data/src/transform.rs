//! Classifier preprocessing: resize, center crop, normalize.
//!
//! Mirrors the evaluation transform shipped with ImageNet-trained ConvNeXt
//! weights: the shorter side is resized with bilinear filtering, a square
//! center crop is taken, pixels are scaled to `[0, 1]` and normalized per
//! channel.

use std::path::Path;

use burn::prelude::*;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

use imgeval_core::ModelSize;

use crate::error::{DataError, Result};

/// ImageNet channel means (RGB).
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// ImageNet channel standard deviations (RGB).
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// A single preprocessed image in `(C, H, W)` layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    /// Pixel values, channel-major.
    pub data: Vec<f32>,
    /// Number of channels.
    pub channels: usize,
    /// Height in pixels.
    pub height: usize,
    /// Width in pixels.
    pub width: usize,
}

impl ImageData {
    /// Shape as `(C, H, W)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize, usize) {
        (self.channels, self.height, self.width)
    }

    /// Convert into a batch of one: `(1, C, H, W)`.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 4> {
        let data = TensorData::new(
            self.data.clone(),
            [1, self.channels, self.height, self.width],
        );
        Tensor::from_data(data, device)
    }
}

/// Evaluation-time preprocessing for an image classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTransform {
    /// Target length of the shorter side after resizing.
    pub resize_size: u32,
    /// Side of the square center crop.
    pub crop_size: u32,
    /// Per-channel mean subtracted after scaling.
    pub mean: [f32; 3],
    /// Per-channel standard deviation divided after centering.
    pub std: [f32; 3],
}

impl ImageTransform {
    /// Create a transform with ImageNet statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if either size is zero or the crop is larger than the resize.
    pub fn new(resize_size: u32, crop_size: u32) -> Result<Self> {
        if resize_size == 0 || crop_size == 0 {
            return Err(DataError::InvalidTransform(
                "resize and crop sizes must be non-zero".to_string(),
            ));
        }
        if crop_size > resize_size {
            return Err(DataError::InvalidTransform(format!(
                "crop size {} exceeds resize size {}",
                crop_size, resize_size
            )));
        }
        Ok(Self {
            resize_size,
            crop_size,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        })
    }

    /// The bundled preprocessing for a ConvNeXt capacity variant.
    #[must_use]
    pub fn for_size(size: ModelSize) -> Self {
        let resize_size = match size {
            ModelSize::Tiny => 236,
            ModelSize::Small => 230,
            ModelSize::Base | ModelSize::Large => 232,
        };
        Self {
            resize_size,
            crop_size: 224,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
        }
    }

    /// Override the normalization statistics.
    #[must_use]
    pub fn with_stats(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.mean = mean;
        self.std = std;
        self
    }

    /// Decode an image file and preprocess it.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<ImageData> {
        let path = path.as_ref();
        let img = image::open(path).map_err(|source| DataError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.apply(&img))
    }

    /// Preprocess an already decoded image.
    pub fn apply(&self, img: &DynamicImage) -> ImageData {
        let rgb = img.to_rgb8();
        let resized = self.resize_shorter_side(&rgb);
        let cropped = self.center_crop(&resized);
        self.normalize(&cropped)
    }

    fn resize_shorter_side(&self, img: &RgbImage) -> RgbImage {
        let (w, h) = img.dimensions();
        let target = self.resize_size;
        let (new_w, new_h) = if w <= h {
            let long = (target as u64 * h as u64 / w.max(1) as u64) as u32;
            (target, long.max(1))
        } else {
            let long = (target as u64 * w as u64 / h.max(1) as u64) as u32;
            (long.max(1), target)
        };
        if (new_w, new_h) == (w, h) {
            return img.clone();
        }
        imageops::resize(img, new_w, new_h, FilterType::Triangle)
    }

    fn center_crop(&self, img: &RgbImage) -> RgbImage {
        let (w, h) = img.dimensions();
        let crop = self.crop_size;
        // halves round to even
        let top = ((h.saturating_sub(crop)) as f64 / 2.0).round_ties_even() as u32;
        let left = ((w.saturating_sub(crop)) as f64 / 2.0).round_ties_even() as u32;
        imageops::crop_imm(img, left, top, crop.min(w), crop.min(h)).to_image()
    }

    fn normalize(&self, img: &RgbImage) -> ImageData {
        let (w, h) = img.dimensions();
        let (w, h) = (w as usize, h as usize);
        let plane = w * h;
        let mut data = vec![0.0f32; 3 * plane];

        for (x, y, pixel) in img.enumerate_pixels() {
            let offset = y as usize * w + x as usize;
            for c in 0..3 {
                let v = pixel.0[c] as f32 / 255.0;
                data[c * plane + offset] = (v - self.mean[c]) / self.std[c];
            }
        }

        ImageData {
            data,
            channels: 3,
            height: h,
            width: w,
        }
    }
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self::for_size(ModelSize::default())
    }
}
