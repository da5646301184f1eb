//! Error types for imgeval_analysis.

use thiserror::Error;

/// Result type alias using [`AnalysisError`].
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Errors raised while building or rendering analysis artifacts.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Predictions and targets differ in length.
    #[error("Length mismatch: {predictions} predictions but {targets} targets")]
    LengthMismatch {
        /// Number of predictions.
        predictions: usize,
        /// Number of targets.
        targets: usize,
    },

    /// Drawing backend failure.
    #[error("Render error: {0}")]
    Render(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
