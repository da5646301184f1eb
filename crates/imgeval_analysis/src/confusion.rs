//! Confusion matrix tallying and derived per-class metrics.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

/// Square count matrix: row = true class, column = predicted class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Cell counts, `matrix[true][predicted]`.
    pub matrix: Vec<Vec<usize>>,
    /// Number of classes.
    pub n_classes: usize,
    /// Class labels, indexing both rows and columns.
    pub labels: Vec<String>,
}

fn ratio(num: usize, den: usize) -> f32 {
    if den == 0 {
        0.0
    } else {
        num as f32 / den as f32
    }
}

impl ConfusionMatrix {
    /// An all-zero matrix for the given labels.
    pub fn new(labels: Vec<String>) -> Self {
        let n_classes = labels.len();
        Self {
            matrix: vec![vec![0; n_classes]; n_classes],
            n_classes,
            labels,
        }
    }

    /// Count one sample. Indices outside the label range are ignored.
    pub fn add(&mut self, true_class: usize, pred_class: usize) {
        if let Some(cell) = self
            .matrix
            .get_mut(true_class)
            .and_then(|row| row.get_mut(pred_class))
        {
            *cell += 1;
        }
    }

    /// Sum of all cells.
    pub fn total(&self) -> usize {
        self.matrix.iter().flatten().sum()
    }

    /// Sum of the diagonal.
    pub fn correct(&self) -> usize {
        self.matrix.iter().enumerate().map(|(i, row)| row[i]).sum()
    }

    /// Samples whose true class is `class`.
    pub fn row_sum(&self, class: usize) -> usize {
        self.matrix[class].iter().sum()
    }

    /// Samples predicted as `class`.
    pub fn col_sum(&self, class: usize) -> usize {
        self.matrix.iter().map(|row| row[class]).sum()
    }

    /// Diagonal over total; zero for an empty matrix.
    pub fn accuracy(&self) -> f32 {
        ratio(self.correct(), self.total())
    }

    /// Column-wise hit rate for `class`.
    pub fn precision(&self, class: usize) -> f32 {
        ratio(self.matrix[class][class], self.col_sum(class))
    }

    /// Row-wise hit rate for `class`.
    pub fn recall(&self, class: usize) -> f32 {
        ratio(self.matrix[class][class], self.row_sum(class))
    }

    /// F1 for `class`.
    pub fn f1(&self, class: usize) -> f32 {
        let (p, r) = (self.precision(class), self.recall(class));
        if p + r > 0.0 {
            2.0 * p * r / (p + r)
        } else {
            0.0
        }
    }

    /// Unweighted mean of per-class F1.
    pub fn macro_f1(&self) -> f32 {
        if self.n_classes == 0 {
            return 0.0;
        }
        (0..self.n_classes).map(|c| self.f1(c)).sum::<f32>() / self.n_classes as f32
    }

    /// Counts as floats.
    pub fn as_f32(&self) -> Vec<Vec<f32>> {
        self.matrix
            .iter()
            .map(|row| row.iter().map(|&v| v as f32).collect())
            .collect()
    }

    /// Row-normalised counts; empty rows stay zero.
    pub fn normalize(&self) -> Vec<Vec<f32>> {
        self.matrix
            .iter()
            .map(|row| {
                let sum: usize = row.iter().sum();
                row.iter().map(|&v| ratio(v, sum)).collect()
            })
            .collect()
    }

    /// Largest cell value.
    pub fn max_count(&self) -> usize {
        self.matrix.iter().flatten().copied().max().unwrap_or(0)
    }

    /// Every row and column, labels never truncated.
    pub fn to_string_table(&self) -> String {
        let label_width = self.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let digits = self.max_count().to_string().len();
        let widths: Vec<usize> = self
            .labels
            .iter()
            .map(|l| l.chars().count().max(digits) + 2)
            .collect();

        let mut out = String::new();
        let _ = write!(out, "{:w$}", "", w = label_width);
        for (label, &w) in self.labels.iter().zip(&widths) {
            let _ = write!(out, "{:>w$}", label, w = w);
        }
        out.push('\n');

        for (label, row) in self.labels.iter().zip(&self.matrix) {
            let _ = write!(out, "{:<w$}", label, w = label_width);
            for (count, &w) in row.iter().zip(&widths) {
                let _ = write!(out, "{:>w$}", count, w = w);
            }
            out.push('\n');
        }
        out
    }
}

/// Tally a matrix from aligned predictions and targets.
///
/// The label count fixes the matrix size. Pairs beyond the shorter input
/// are ignored, as are out-of-range indices.
pub fn confusion_matrix(preds: &[usize], targets: &[usize], labels: &[String]) -> ConfusionMatrix {
    let mut cm = ConfusionMatrix::new(labels.to_vec());
    for (&pred, &target) in preds.iter().zip(targets) {
        cm.add(target, pred);
    }
    cm
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_confusion_matrix() {
        let preds = vec![0, 0, 1, 1, 2, 2];
        let targets = vec![0, 1, 1, 1, 2, 0];

        let cm = confusion_matrix(&preds, &targets, &labels(&["a", "b", "c"]));

        assert_eq!(cm.matrix[0][0], 1);
        // true 1 predicted 0
        assert_eq!(cm.matrix[1][0], 1);
        assert_eq!(cm.matrix[1][1], 2);
        assert_eq!(cm.col_sum(0), 2);
    }

    #[test]
    fn test_cat_dog_fish() {
        // cat=0, dog=1, fish=2
        let targets = vec![0, 0, 1, 1, 2, 2];
        let preds = vec![0, 1, 1, 1, 2, 0];

        let cm = confusion_matrix(&preds, &targets, &labels(&["cat", "dog", "fish"]));

        assert_eq!(cm.matrix, vec![vec![1, 1, 0], vec![0, 2, 0], vec![1, 0, 1]]);
        assert_eq!(cm.total(), 6);
        assert_eq!(cm.correct(), 4);
        assert!((cm.accuracy() - 4.0 / 6.0).abs() < 1e-6);
        assert_eq!(cm.row_sum(0), 2);
        assert_eq!(cm.row_sum(1), 2);
        assert_eq!(cm.row_sum(2), 2);
    }

    #[test]
    fn test_empty_inputs() {
        let cm = confusion_matrix(&[], &[], &labels(&["a", "b"]));

        assert_eq!(cm.matrix, vec![vec![0, 0], vec![0, 0]]);
        assert_eq!(cm.accuracy(), 0.0);
        assert_eq!(cm.normalize(), vec![vec![0.0, 0.0], vec![0.0, 0.0]]);
    }

    #[test]
    fn test_out_of_range_ignored() {
        let cm = confusion_matrix(&[0, 5], &[0, 1], &labels(&["a", "b"]));
        assert_eq!(cm.total(), 1);
    }

    #[test]
    fn test_accuracy() {
        let preds = vec![0, 1, 2];
        let targets = vec![0, 1, 2];
        let cm = confusion_matrix(&preds, &targets, &labels(&["a", "b", "c"]));
        assert!((cm.accuracy() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_metrics() {
        let preds = vec![0, 0, 1, 1];
        let targets = vec![0, 1, 0, 1];
        let cm = confusion_matrix(&preds, &targets, &labels(&["a", "b"]));

        assert!((cm.precision(0) - 0.5).abs() < 1e-6);
        assert!((cm.recall(0) - 0.5).abs() < 1e-6);
        assert!((cm.macro_f1() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_table_keeps_full_labels() {
        let names = labels(&["a_very_long_label_name", "b"]);
        let cm = confusion_matrix(&[0, 1, 1], &[0, 1, 0], &names);
        let table = cm.to_string_table();

        assert_eq!(table.lines().count(), 3);
        assert_eq!(table.matches("a_very_long_label_name").count(), 2);
        let row: Vec<&str> = table.lines().nth(1).unwrap().split_whitespace().collect();
        assert_eq!(row, vec!["a_very_long_label_name", "1", "1"]);
    }
}
