//! # imgeval_models
//!
//! Model zoo for imgeval: the ConvNeXt family of image classifiers.
//!
//! - [`ConvNext`] - ConvNeXt network with Tiny, Small, Base and Large presets
//! - [`registry`] - create networks from names such as `convnext_tiny`
//! - [`checkpoint`] - load and save burn records
//!
//! ## Example
//!
//! ```rust,ignore
//! use imgeval_core::ModelSize;
//! use imgeval_models::ConvNextConfig;
//!
//! let model = ConvNextConfig::for_size(ModelSize::Tiny, 10).init::<NdArray>(&device)?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod checkpoint;
mod convnext;
mod error;
pub mod registry;

pub use checkpoint::{load_checkpoint, save_checkpoint, CheckpointMetadata};
pub use convnext::{ConvNext, ConvNextBlock, ConvNextConfig, ConvNextStage, LayerNorm2d};
pub use error::{ModelError, Result};
pub use registry::{create, list_models, model_name, parse_model_name};
