//! Per-sample prediction records.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{InferError, Result};

/// Outcome of classifying one sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Index of the most probable class.
    pub prediction: usize,
    /// Probability of that class, in `[0, 1]`.
    pub confidence: f32,
    /// Whether `prediction` equals the true class.
    pub correct: bool,
}

/// A prediction record joined with its sample, as written to `predictions.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    /// Position in dataset order.
    pub index: usize,
    /// Image file.
    pub path: PathBuf,
    /// True class index.
    pub target: usize,
    /// Predicted class index.
    pub prediction: usize,
    /// Confidence of the prediction.
    pub confidence: f32,
    /// Whether the prediction was correct.
    pub correct: bool,
}

/// Reduce a probability vector to (prediction, confidence, correctness).
///
/// Ties resolve to the lowest class index.
pub fn calibration_components(probs: &[f32], target: usize) -> Result<PredictionRecord> {
    let (prediction, confidence) = probs
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best: Option<(usize, f32)>, (i, p)| match best {
            Some((_, bp)) if bp >= p => best,
            _ => Some((i, p)),
        })
        .ok_or_else(|| InferError::ShapeMismatch("model produced no class scores".to_string()))?;

    Ok(PredictionRecord {
        prediction,
        confidence,
        correct: prediction == target,
    })
}
