//! # imgeval_analysis
//!
//! Analysis utilities for imgeval: confusion matrix, heatmap rendering,
//! calibration and classification reports.
//!
//! This crate provides tools for analyzing classifier performance:
//! - Confusion matrix computation and per-class metrics
//! - Annotated heatmap rendering to SVG or the terminal
//! - Reliability bins with Expected/Maximum Calibration Error
//! - Precision, recall and F1 per class

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod calibration;
mod confusion;
mod error;
mod plot;
pub mod report;

pub use calibration::{compute_calibration, CalibrationResult, ReliabilityBin};
pub use confusion::{confusion_matrix, ConfusionMatrix};
pub use error::{AnalysisError, Result};
pub use plot::{
    render_svg, render_terminal, ConfusionMatrixPlot, PlotOutput, CONFUSION_MATRIX_FILE,
    DPI_HINT, FIGURE_INCHES,
};
pub use report::{classification_report, ClassMetrics, ClassificationReport};
