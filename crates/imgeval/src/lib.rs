//! # imgeval
//!
//! Evaluate image classifiers on folder-per-class datasets.
//!
//! - **Data**: ImageFolder discovery and ImageNet-style preprocessing
//! - **Models**: the ConvNeXt family in four sizes, checkpoint loading
//! - **Inference**: per-sample prediction, confidence and correctness
//! - **Analysis**: confusion matrix, calibration, classification report
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use imgeval::prelude::*;
//! use burn_ndarray::NdArray;
//!
//! let mut runner = Inference::<NdArray, _>::new("data/val", "tiny", &Default::default())?;
//! runner.infer()?;
//!
//! let (cm, _) = runner.confusion_plot("runs", true)?.plot_conf_matrix()?;
//! println!("accuracy {:.3}", cm.accuracy());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Re-export all crates
pub use imgeval_analysis as analysis;
pub use imgeval_core as core;
pub use imgeval_data as data;
pub use imgeval_infer as infer;
pub use imgeval_models as models;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use imgeval::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use imgeval_core::{ImageClassifier, ModelSize};

    // Data
    pub use imgeval_data::{ImageData, ImageFolder, ImageTransform};

    // Models
    pub use imgeval_models::{load_checkpoint, save_checkpoint, ConvNext, ConvNextConfig};

    // Inference
    pub use imgeval_infer::{EvaluationSummary, Inference, PredictionRecord};

    // Analysis
    pub use imgeval_analysis::{
        classification_report, compute_calibration, confusion_matrix, ConfusionMatrix,
        ConfusionMatrixPlot, PlotOutput,
    };
}
