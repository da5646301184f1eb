//! Error types for imgeval_infer.

use thiserror::Error;

/// Result type alias using [`InferError`].
pub type Result<T> = std::result::Result<T, InferError>;

/// Errors raised while running inference.
#[derive(Error, Debug)]
pub enum InferError {
    /// Model output does not line up with the dataset.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Tensor data could not be read back.
    #[error("Tensor error: {0}")]
    Tensor(String),

    /// Core error.
    #[error(transparent)]
    Core(#[from] imgeval_core::CoreError),

    /// Dataset error.
    #[error(transparent)]
    Data(#[from] imgeval_data::DataError),

    /// Model error.
    #[error(transparent)]
    Model(#[from] imgeval_models::ModelError),

    /// Analysis error.
    #[error(transparent)]
    Analysis(#[from] imgeval_analysis::AnalysisError),
}
