//! Confidence calibration.
//!
//! Predictions are grouped into equal-width confidence bins over `[0, 1]`;
//! a calibrated classifier is right about as often as it claims to be in
//! every bin.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

/// Gap below which a bin counts as calibrated.
const GAP_TOLERANCE: f32 = 0.01;

/// One confidence interval of a reliability diagram.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityBin {
    /// Inclusive lower bound.
    pub lower: f32,
    /// Upper bound; inclusive only for the last bin.
    pub upper: f32,
    /// Mean confidence of the samples in the bin.
    pub confidence: f32,
    /// Fraction of correct samples in the bin.
    pub accuracy: f32,
    /// Number of samples.
    pub count: usize,
}

impl ReliabilityBin {
    /// Confidence minus accuracy; positive when overconfident.
    #[must_use]
    pub fn gap(&self) -> f32 {
        self.confidence - self.accuracy
    }

    /// Whether any sample fell into the bin.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Reliability bins with expected and maximum calibration error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResult {
    /// Expected Calibration Error: count-weighted mean of bin gaps.
    pub ece: f32,
    /// Maximum Calibration Error over non-empty bins.
    pub mce: f32,
    /// Bins in increasing confidence order.
    pub bins: Vec<ReliabilityBin>,
    /// Total number of samples.
    pub total_samples: usize,
}

impl CalibrationResult {
    /// Number of bins.
    #[must_use]
    pub fn n_bins(&self) -> usize {
        self.bins.len()
    }

    /// `true` when ECE is below `threshold`.
    #[must_use]
    pub fn is_well_calibrated(&self, threshold: f32) -> bool {
        self.ece < threshold
    }

    /// Indices of non-empty bins whose confidence exceeds their accuracy.
    pub fn overconfident_bins(&self) -> Vec<usize> {
        self.bins_where(|gap| gap > GAP_TOLERANCE)
    }

    /// Indices of non-empty bins whose accuracy exceeds their confidence.
    pub fn underconfident_bins(&self) -> Vec<usize> {
        self.bins_where(|gap| gap < -GAP_TOLERANCE)
    }

    fn bins_where(&self, pred: impl Fn(f32) -> bool) -> Vec<usize> {
        self.bins
            .iter()
            .enumerate()
            .filter(|(_, b)| !b.is_empty() && pred(b.gap()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Text summary with a row per non-empty bin.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Calibration ({} bins, {} samples)", self.n_bins(), self.total_samples);
        let _ = writeln!(out, "  Expected Calibration Error: {:.4}", self.ece);
        let _ = writeln!(out, "  Maximum Calibration Error:  {:.4}", self.mce);
        let _ = writeln!(out);
        let _ = writeln!(out, "  {:<13} {:>10} {:>9} {:>6} {:>7}", "range", "confidence", "accuracy", "count", "gap");

        for bin in self.bins.iter().filter(|b| !b.is_empty()) {
            let gap = bin.gap();
            let gap = if gap.abs() <= GAP_TOLERANCE {
                "~0".to_string()
            } else {
                format!("{:+.3}", gap)
            };
            let _ = writeln!(
                out,
                "  [{:.2}, {:.2}]  {:>10.3} {:>9.3} {:>6} {:>7}",
                bin.lower, bin.upper, bin.confidence, bin.accuracy, bin.count, gap
            );
        }

        let over = self.overconfident_bins();
        if !over.is_empty() {
            let _ = writeln!(out, "\n  Overconfident bins: {:?}", over);
        }
        let under = self.underconfident_bins();
        if !under.is_empty() {
            let _ = writeln!(out, "  Underconfident bins: {:?}", under);
        }
        out
    }
}

/// Bin per-sample confidences and correctness flags.
///
/// `n_bins` of zero is treated as one bin. Confidences are clamped to
/// `[0, 1]`; a confidence of exactly 1 lands in the last bin.
///
/// # Errors
///
/// Returns [`AnalysisError::LengthMismatch`] if the inputs differ in length.
///
/// # Example
///
/// ```rust,ignore
/// use imgeval_analysis::compute_calibration;
///
/// let result = compute_calibration(&[0.9, 0.8, 0.7], &[true, true, false], 10)?;
/// println!("ECE: {:.4}", result.ece);
/// ```
pub fn compute_calibration(
    confidences: &[f32],
    correct: &[bool],
    n_bins: usize,
) -> Result<CalibrationResult> {
    if confidences.len() != correct.len() {
        return Err(AnalysisError::LengthMismatch {
            predictions: confidences.len(),
            targets: correct.len(),
        });
    }
    let n_bins = n_bins.max(1);
    let width = 1.0 / n_bins as f32;

    // (sum of confidences, correct count, count) per bin
    let mut acc = vec![(0.0f32, 0usize, 0usize); n_bins];
    for (&conf, &hit) in confidences.iter().zip(correct) {
        let conf = conf.clamp(0.0, 1.0);
        let idx = ((conf * n_bins as f32) as usize).min(n_bins - 1);
        let slot = &mut acc[idx];
        slot.0 += conf;
        slot.1 += usize::from(hit);
        slot.2 += 1;
    }

    let total = confidences.len();
    let bins: Vec<ReliabilityBin> = acc
        .into_iter()
        .enumerate()
        .map(|(i, (sum, hits, count))| {
            let (confidence, accuracy) = if count > 0 {
                (sum / count as f32, hits as f32 / count as f32)
            } else {
                (0.0, 0.0)
            };
            ReliabilityBin {
                lower: i as f32 * width,
                upper: if i + 1 == n_bins { 1.0 } else { (i + 1) as f32 * width },
                confidence,
                accuracy,
                count,
            }
        })
        .collect();

    let ece = bins
        .iter()
        .filter(|b| !b.is_empty())
        .map(|b| b.count as f32 / total as f32 * b.gap().abs())
        .sum::<f32>();
    let mce = bins
        .iter()
        .filter(|b| !b.is_empty())
        .map(|b| b.gap().abs())
        .fold(0.0f32, f32::max);

    Ok(CalibrationResult {
        ece,
        mce,
        bins,
        total_samples: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_confidence() {
        let result = compute_calibration(&[1.0; 4], &[true; 4], 10).unwrap();

        assert!(result.ece < 1e-6);
        assert_eq!(result.total_samples, 4);
        assert_eq!(result.bins[9].count, 4);
        assert_eq!(result.bins[9].upper, 1.0);
    }

    #[test]
    fn test_overconfident() {
        // claims 90%, right half the time
        let result =
            compute_calibration(&[0.9, 0.9, 0.9, 0.9], &[true, true, false, false], 10).unwrap();

        assert!((result.ece - 0.4).abs() < 1e-5);
        assert!((result.mce - 0.4).abs() < 1e-5);
        assert_eq!(result.overconfident_bins(), vec![9]);
        assert!(result.underconfident_bins().is_empty());
    }

    #[test]
    fn test_underconfident() {
        let result = compute_calibration(&[0.55, 0.55], &[true, true], 2).unwrap();

        assert_eq!(result.underconfident_bins(), vec![1]);
        assert!((result.bins[1].gap() + 0.45).abs() < 1e-5);
    }

    #[test]
    fn test_empty_inputs() {
        let result = compute_calibration(&[], &[], 5).unwrap();

        assert_eq!(result.ece, 0.0);
        assert_eq!(result.mce, 0.0);
        assert_eq!(result.n_bins(), 5);
        assert!(result.bins.iter().all(ReliabilityBin::is_empty));
    }

    #[test]
    fn test_zero_bins_means_one() {
        let result = compute_calibration(&[0.3], &[false], 0).unwrap();
        assert_eq!(result.n_bins(), 1);
        assert_eq!(result.bins[0].count, 1);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            compute_calibration(&[0.5], &[], 5),
            Err(AnalysisError::LengthMismatch { predictions: 1, targets: 0 })
        ));
    }

    #[test]
    fn test_summary_lists_only_filled_bins() {
        let result = compute_calibration(&[0.8, 0.7, 0.6, 0.5], &[true, false, true, false], 4)
            .unwrap();
        let text = result.summary();

        assert!(result.is_well_calibrated(0.5));
        assert!(text.contains("Expected Calibration Error"));
        assert_eq!(text.matches("[0.").count(), 2);
    }
}
