//! Error types for imgeval_models.

use thiserror::Error;

/// Result type alias using [`ModelError`].
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while building or restoring a model.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Architecture name not known to the registry.
    #[error("Model '{0}' not found in registry")]
    ModelNotFound(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error saving or loading a checkpoint.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Core error.
    #[error("Core error: {0}")]
    CoreError(#[from] imgeval_core::CoreError),
}
