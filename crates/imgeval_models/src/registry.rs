//! Model registry for creating networks by name.
//!
//! Names follow the `<family>_<size>` convention, e.g. `convnext_tiny`.
//!
//! # Example
//!
//! ```rust,ignore
//! use imgeval_models::registry;
//!
//! let model = registry::create::<NdArray>("convnext_small", 10, &device)?;
//! ```

use burn::prelude::*;

use imgeval_core::ModelSize;

use crate::convnext::{ConvNext, ConvNextConfig};
use crate::error::{ModelError, Result};

/// Architecture families known to the registry.
pub const FAMILIES: &[&str] = &["convnext"];

/// Registry name for a ConvNeXt capacity variant.
#[must_use]
pub fn model_name(size: ModelSize) -> String {
    format!("convnext_{}", size.tag())
}

/// Split a registry name into its size.
pub fn parse_model_name(name: &str) -> Result<ModelSize> {
    let lower = name.to_lowercase();
    let (family, size) = lower
        .split_once('_')
        .ok_or_else(|| ModelError::ModelNotFound(name.to_string()))?;
    if !FAMILIES.contains(&family) {
        return Err(ModelError::ModelNotFound(name.to_string()));
    }
    Ok(size.parse()?)
}

/// Create a freshly initialised network by registry name.
pub fn create<B: Backend>(name: &str, n_classes: usize, device: &B::Device) -> Result<ConvNext<B>> {
    let size = parse_model_name(name)?;
    let config = ConvNextConfig::for_size(size, n_classes);
    tracing::info!(model = %name, n_classes, "creating model");
    config.init(device)
}

/// All registry names, smallest first.
#[must_use]
pub fn list_models() -> Vec<String> {
    ModelSize::ALL.iter().map(|&s| model_name(s)).collect()
}
