//! Error types for imgeval_core.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur in imgeval_core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Model size tag not in the supported set.
    #[error("Unsupported model size '{0}': expected one of tiny, small, base, large")]
    UnsupportedModelSize(String),
}
