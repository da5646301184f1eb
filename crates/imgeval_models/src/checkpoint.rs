//! Model checkpointing using Burn's record system.
//!
//! Weights are stored as named MessagePack (`*.mpk`) with full precision.
//! A JSON sidecar ([`CheckpointMetadata`]) records which architecture and
//! class list the weights belong to.
//!
//! # Example
//!
//! ```rust,ignore
//! use imgeval_models::checkpoint::{load_checkpoint, save_checkpoint};
//!
//! save_checkpoint(&model, "weights.mpk")?;
//! let model = load_checkpoint(model, "weights.mpk", &device)?;
//! ```

use std::path::Path;

use burn::module::Module;
use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

type Recorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Save a model's weights.
pub fn save_checkpoint<B, M>(model: &M, path: impl AsRef<Path>) -> Result<()>
where
    B: Backend,
    M: Module<B>,
{
    let path = path.as_ref();
    model
        .clone()
        .save_file(path.to_path_buf(), &Recorder::new())
        .map_err(|e| ModelError::Checkpoint(e.to_string()))?;
    tracing::info!(path = %path.display(), "saved checkpoint");
    Ok(())
}

/// Load weights into an initialised model of matching architecture.
pub fn load_checkpoint<B, M>(model: M, path: impl AsRef<Path>, device: &B::Device) -> Result<M>
where
    B: Backend,
    M: Module<B>,
{
    let path = path.as_ref();
    let model = model
        .load_file(path.to_path_buf(), &Recorder::new(), device)
        .map_err(|e| ModelError::Checkpoint(format!("{}: {}", path.display(), e)))?;
    tracing::info!(path = %path.display(), "loaded checkpoint");
    Ok(model)
}

/// Metadata stored next to a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    /// Registry name of the architecture, e.g. `convnext_tiny`.
    pub arch: String,
    /// Class labels in index order.
    pub classes: Vec<String>,
}

impl CheckpointMetadata {
    /// Create new metadata.
    pub fn new(arch: impl Into<String>, classes: Vec<String>) -> Self {
        Self {
            arch: arch.into(),
            classes,
        }
    }

    /// Sidecar path for a checkpoint: `weights.mpk` -> `weights.json`.
    pub fn sidecar_path(checkpoint: impl AsRef<Path>) -> std::path::PathBuf {
        checkpoint.as_ref().with_extension("json")
    }

    /// Save metadata to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ModelError::Checkpoint(e.to_string()))?;
        std::fs::write(path, json).map_err(|e| ModelError::Checkpoint(e.to_string()))?;
        Ok(())
    }

    /// Load metadata from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json =
            std::fs::read_to_string(path).map_err(|e| ModelError::Checkpoint(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| ModelError::Checkpoint(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConvNextConfig;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_save_load_preserves_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.mpk");
        let device = Default::default();
        let config = ConvNextConfig::new(3, vec![1], vec![8]);

        let model = config.init::<TestBackend>(&device).unwrap();
        save_checkpoint(&model, &path).unwrap();

        let fresh = config.init::<TestBackend>(&device).unwrap();
        let restored = load_checkpoint(fresh, &path, &device).unwrap();

        let x = Tensor::<TestBackend, 4>::ones([1, 3, 16, 16], &device);
        let a: Vec<f32> = model.forward(x.clone()).into_data().to_vec().unwrap();
        let b: Vec<f32> = restored.forward(x).into_data().to_vec().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_missing_checkpoint() {
        let device = Default::default();
        let model = ConvNextConfig::new(3, vec![1], vec![8])
            .init::<TestBackend>(&device)
            .unwrap();
        let err = load_checkpoint(model, "/nonexistent/weights.mpk", &device).unwrap_err();
        assert!(matches!(err, ModelError::Checkpoint(_)));
    }

    #[test]
    fn test_metadata_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = CheckpointMetadata::sidecar_path(dir.path().join("w.mpk"));
        assert!(path.ends_with("w.json"));

        let meta = CheckpointMetadata::new("convnext_tiny", vec!["a".into(), "b".into()]);
        meta.save(&path).unwrap();
        assert_eq!(CheckpointMetadata::load(&path).unwrap(), meta);
    }
}
