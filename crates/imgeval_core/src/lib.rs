//! # imgeval_core
//!
//! Core types and traits for imgeval image classifier evaluation.
//!
//! This crate provides:
//! - [`ModelSize`] for selecting the capacity variant of a classifier
//! - [`ImageClassifier`] trait implemented by every evaluable network
//! - Error types and common utilities
//!
//! ## Shape Convention
//!
//! Image batches follow the convention `(B, C, H, W)`:
//! - `B`: Batch size (number of images)
//! - `C`: Colour channels
//! - `H`, `W`: Height and width in pixels
//!
//! ## Example
//!
//! ```rust,ignore
//! use imgeval_core::ModelSize;
//!
//! let size: ModelSize = "tiny".parse()?;
//! assert_eq!(size.to_string(), "Tiny");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod model_trait;
mod size;

pub use error::{CoreError, Result};
pub use model_trait::ImageClassifier;
pub use size::ModelSize;
