//! Per-class precision, recall and F1, with macro and weighted averages.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::confusion::{confusion_matrix, ConfusionMatrix};
use crate::error::{AnalysisError, Result};

/// Metrics for one class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Class index.
    pub class: usize,
    /// Class label.
    pub name: String,
    /// TP / (TP + FP)
    pub precision: f32,
    /// TP / (TP + FN)
    pub recall: f32,
    /// Harmonic mean of precision and recall.
    pub f1_score: f32,
    /// Number of samples whose true class is this one.
    pub support: usize,
}

/// Per-class metrics plus aggregates.
///
/// Macro averages only include classes with non-zero support; weighted
/// averages weight each class by its support.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Per-class metrics, in class index order.
    pub classes: Vec<ClassMetrics>,
    /// Overall accuracy.
    pub accuracy: f32,
    /// Macro-averaged precision.
    pub macro_precision: f32,
    /// Macro-averaged recall.
    pub macro_recall: f32,
    /// Macro-averaged F1.
    pub macro_f1: f32,
    /// Support-weighted precision.
    pub weighted_precision: f32,
    /// Support-weighted recall.
    pub weighted_recall: f32,
    /// Support-weighted F1.
    pub weighted_f1: f32,
    /// Number of counted samples.
    pub total_samples: usize,
}

impl ClassificationReport {
    /// Build the report from a tallied confusion matrix.
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let classes: Vec<ClassMetrics> = cm
            .labels
            .iter()
            .enumerate()
            .map(|(c, name)| ClassMetrics {
                class: c,
                name: name.clone(),
                precision: cm.precision(c),
                recall: cm.recall(c),
                f1_score: cm.f1(c),
                support: cm.row_sum(c),
            })
            .collect();

        let supported: Vec<&ClassMetrics> = classes.iter().filter(|c| c.support > 0).collect();
        let total = cm.total();

        let macro_avg = |metric: fn(&ClassMetrics) -> f32| -> f32 {
            if supported.is_empty() {
                return 0.0;
            }
            supported.iter().map(|&c| metric(c)).sum::<f32>() / supported.len() as f32
        };
        let weighted_avg = |metric: fn(&ClassMetrics) -> f32| -> f32 {
            if total == 0 {
                return 0.0;
            }
            supported
                .iter()
                .map(|&c| metric(c) * c.support as f32)
                .sum::<f32>()
                / total as f32
        };

        Self {
            accuracy: cm.accuracy(),
            macro_precision: macro_avg(|c| c.precision),
            macro_recall: macro_avg(|c| c.recall),
            macro_f1: macro_avg(|c| c.f1_score),
            weighted_precision: weighted_avg(|c| c.precision),
            weighted_recall: weighted_avg(|c| c.recall),
            weighted_f1: weighted_avg(|c| c.f1_score),
            total_samples: total,
            classes,
        }
    }

    /// Render as an aligned text table.
    pub fn to_string_table(&self) -> String {
        let width = self
            .classes
            .iter()
            .map(|c| c.name.chars().count())
            .chain(["weighted avg".len()])
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>w$} {:>10} {:>9} {:>9} {:>9}\n",
            "", "precision", "recall", "f1-score", "support",
            w = width
        );
        for c in &self.classes {
            let _ = writeln!(
                out,
                "{:>w$} {:>10.2} {:>9.2} {:>9.2} {:>9}",
                c.name, c.precision, c.recall, c.f1_score, c.support,
                w = width
            );
        }

        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:>w$} {:>10} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total_samples,
            w = width
        );
        for (label, p, r, f) in [
            ("macro avg", self.macro_precision, self.macro_recall, self.macro_f1),
            ("weighted avg", self.weighted_precision, self.weighted_recall, self.weighted_f1),
        ] {
            let _ = writeln!(
                out,
                "{:>w$} {:>10.2} {:>9.2} {:>9.2} {:>9}",
                label, p, r, f, self.total_samples,
                w = width
            );
        }
        out
    }

    /// Lowest-F1 class among those with support.
    pub fn worst_class(&self) -> Option<&ClassMetrics> {
        self.supported().min_by(|a, b| a.f1_score.total_cmp(&b.f1_score))
    }

    /// Highest-F1 class among those with support.
    pub fn best_class(&self) -> Option<&ClassMetrics> {
        self.supported().max_by(|a, b| a.f1_score.total_cmp(&b.f1_score))
    }

    /// Supported classes with F1 below `threshold`.
    pub fn low_performing_classes(&self, threshold: f32) -> Vec<&ClassMetrics> {
        self.supported().filter(|c| c.f1_score < threshold).collect()
    }

    fn supported(&self) -> impl Iterator<Item = &ClassMetrics> {
        self.classes.iter().filter(|c| c.support > 0)
    }
}

/// Compute a classification report from aligned predictions and targets.
///
/// `class_names` fixes the class count; pairs with an index outside it are
/// not counted.
///
/// # Errors
///
/// Returns [`AnalysisError::LengthMismatch`] if the inputs differ in length.
///
/// # Example
///
/// ```rust,ignore
/// use imgeval_analysis::classification_report;
///
/// let names = vec!["cat".to_string(), "dog".to_string()];
/// let report = classification_report(&[0, 1, 1], &[0, 1, 0], &names)?;
/// println!("{}", report.to_string_table());
/// ```
pub fn classification_report(
    predictions: &[usize],
    targets: &[usize],
    class_names: &[String],
) -> Result<ClassificationReport> {
    if predictions.len() != targets.len() {
        return Err(AnalysisError::LengthMismatch {
            predictions: predictions.len(),
            targets: targets.len(),
        });
    }
    let cm = confusion_matrix(predictions, targets, class_names);
    Ok(ClassificationReport::from_confusion(&cm))
}
