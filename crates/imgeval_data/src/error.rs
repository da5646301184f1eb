//! Error types for imgeval_data.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;

/// Errors that can occur in data operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Dataset root is not a directory.
    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// No class folders under the dataset root.
    #[error("Couldn't find any class folder in {}", .0.display())]
    NoClasses(PathBuf),

    /// A class folder contains no readable image.
    #[error("Found no valid file for the class '{0}'")]
    EmptyClass(String),

    /// Index out of bounds.
    #[error("Index {index} out of bounds for length {length}")]
    IndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// The length of the collection.
        length: usize,
    },

    /// Image decode error.
    #[error("Failed to decode {}: {source}", path.display())]
    Decode {
        /// The offending file.
        path: PathBuf,
        /// Underlying decoder error.
        #[source]
        source: image::ImageError,
    },

    /// Invalid preprocessing parameters.
    #[error("Invalid transform: {0}")]
    InvalidTransform(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
