//! # imgeval_data
//!
//! Dataset and preprocessing implementations for imgeval.
//!
//! This crate provides:
//! - [`ImageFolder`] for folder-per-class labelled image datasets
//! - [`ImageTransform`] for the resize, crop and normalize pipeline a classifier expects
//! - [`ImageData`] holding one preprocessed image in CHW layout
//!
//! ## Example
//!
//! ```rust,ignore
//! use imgeval_core::ModelSize;
//! use imgeval_data::{ImageFolder, ImageTransform};
//!
//! let transform = ImageTransform::for_size(ModelSize::Tiny);
//! let dataset = ImageFolder::new("data/val", transform)?;
//! println!("{} images, classes: {:?}", dataset.len(), dataset.classes());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod folder;
mod transform;

pub use error::{DataError, Result};
pub use folder::{has_image_extension, ImageFolder, Sample, IMG_EXTENSIONS};
pub use transform::{ImageData, ImageTransform, IMAGENET_MEAN, IMAGENET_STD};
