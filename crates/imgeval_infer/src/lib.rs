//! # imgeval_infer
//!
//! Runs a classifier over an [`ImageFolder`](imgeval_data::ImageFolder) one
//! image at a time and records, for every sample in dataset order, the
//! predicted class, its softmax confidence and whether it was correct.
//!
//! ## Example
//!
//! ```rust,ignore
//! use burn_ndarray::NdArray;
//! use imgeval_infer::Inference;
//!
//! let mut runner = Inference::<NdArray, _>::new("data/val", "tiny", &Default::default())?;
//! runner.infer()?;
//! let plot = runner.confusion_plot("runs/", true)?;
//! plot.plot_conf_matrix()?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod record;
mod runner;

pub use error::{InferError, Result};
pub use record::{calibration_components, PredictionRecord, PredictionRow};
pub use runner::{EvaluationSummary, Inference};
