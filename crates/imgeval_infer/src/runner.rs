//! The inference runner.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Instant;

use burn::prelude::*;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use imgeval_analysis::{
    classification_report, compute_calibration, CalibrationResult, ClassificationReport,
    ConfusionMatrixPlot,
};
use imgeval_core::{ImageClassifier, ModelSize};
use imgeval_data::{ImageFolder, ImageTransform};
use imgeval_models::{load_checkpoint, ConvNext, ConvNextConfig};

use crate::error::{InferError, Result};
use crate::record::{calibration_components, PredictionRecord, PredictionRow};

/// Aggregate metrics over one inference pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationSummary {
    /// Fraction of correct predictions.
    pub accuracy: f32,
    /// Number of correct predictions.
    pub correct: usize,
    /// Total number of samples.
    pub total: usize,
    /// Reliability bins and calibration error.
    pub calibration: CalibrationResult,
    /// Per-class precision, recall and F1.
    pub report: ClassificationReport,
}

/// Runs a classifier over every image of a dataset, one forward pass per image.
///
/// Results are kept in dataset order so they stay aligned with
/// [`Inference::true_targets`].
pub struct Inference<B: Backend, M: ImageClassifier<B>> {
    dataset: ImageFolder,
    model: M,
    device: B::Device,
    model_size: Option<ModelSize>,
    confidences: Vec<f32>,
    predictions: Vec<usize>,
    accuracies: Vec<bool>,
    show_progress: bool,
    _backend: PhantomData<B>,
}

impl<B: Backend> Inference<B, ConvNext<B>> {
    /// Load the dataset at `data_path` and build a ConvNeXt of the requested size.
    ///
    /// The size selects both the network capacity and its preprocessing.
    /// The classifier head is sized to the number of class folders found.
    ///
    /// # Errors
    ///
    /// Fails on an unsupported size tag or an unusable dataset directory.
    pub fn new(data_path: impl AsRef<Path>, model_size: &str, device: &B::Device) -> Result<Self> {
        let size: ModelSize = model_size.parse()?;
        let transform = ImageTransform::for_size(size);
        let dataset = ImageFolder::new(data_path, transform)?;

        let config = ConvNextConfig::for_size(size, dataset.n_classes());
        let model = config.init::<B>(device)?;
        tracing::info!(
            size = %size,
            classes = dataset.n_classes(),
            samples = dataset.len(),
            "initialised ConvNeXt"
        );

        let mut runner = Self::with_model(dataset, model, device.clone())?;
        runner.model_size = Some(size);
        Ok(runner)
    }

    /// Replace the network weights with those stored at `path`.
    pub fn with_checkpoint(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.model = load_checkpoint::<B, _>(self.model, path, &self.device)?;
        Ok(self)
    }
}

impl<B: Backend, M: ImageClassifier<B>> Inference<B, M> {
    /// Drive an arbitrary classifier over `dataset`.
    ///
    /// # Errors
    ///
    /// Returns [`InferError::ShapeMismatch`] if the model's class count differs from the dataset's.
    pub fn with_model(dataset: ImageFolder, model: M, device: B::Device) -> Result<Self> {
        if model.n_classes() != dataset.n_classes() {
            return Err(InferError::ShapeMismatch(format!(
                "model has {} outputs but dataset has {} classes",
                model.n_classes(),
                dataset.n_classes()
            )));
        }
        Ok(Self {
            dataset,
            model,
            device,
            model_size: None,
            confidences: Vec::new(),
            predictions: Vec::new(),
            accuracies: Vec::new(),
            show_progress: true,
            _backend: PhantomData,
        })
    }

    /// Enable or disable the progress bar.
    #[must_use]
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Classify every sample once, in order.
    ///
    /// Results from a previous call are discarded.
    pub fn infer(&mut self) -> Result<()> {
        let n = self.dataset.len();
        let mut confidences = Vec::with_capacity(n);
        let mut predictions = Vec::with_capacity(n);
        let mut accuracies = Vec::with_capacity(n);

        let pb = if self.show_progress {
            let pb = ProgressBar::new(n as u64);
            let style = ProgressStyle::with_template(
                "[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");
            pb.set_style(style);
            pb
        } else {
            ProgressBar::hidden()
        };

        let start = Instant::now();
        for index in 0..n {
            let (image, target) = self.dataset.get(index)?;
            let x = image.to_tensor::<B>(&self.device);
            let probs = self.model.forward_probs(x);

            let [batch, classes] = probs.dims();
            if batch != 1 || classes != self.dataset.n_classes() {
                return Err(InferError::ShapeMismatch(format!(
                    "expected output [1, {}], got [{}, {}]",
                    self.dataset.n_classes(),
                    batch,
                    classes
                )));
            }

            let probs: Vec<f32> = probs
                .into_data()
                .convert::<f32>()
                .to_vec()
                .map_err(|e| InferError::Tensor(format!("{:?}", e)))?;
            let record = calibration_components(&probs, target)?;
            tracing::trace!(index, target, prediction = record.prediction, "classified");

            confidences.push(record.confidence);
            predictions.push(record.prediction);
            accuracies.push(record.correct);
            pb.inc(1);
        }
        pb.finish_with_message("inference complete");

        self.confidences = confidences;
        self.predictions = predictions;
        self.accuracies = accuracies;

        tracing::info!(
            samples = n,
            accuracy = self.accuracy(),
            secs = start.elapsed().as_secs_f32(),
            "inference finished"
        );
        Ok(())
    }

    /// True class indices, in dataset order.
    pub fn true_targets(&self) -> Vec<usize> {
        self.dataset.targets()
    }

    /// Predicted class indices, in dataset order.
    pub fn predictions(&self) -> &[usize] {
        &self.predictions
    }

    /// Confidence of each prediction, in dataset order.
    pub fn confidences(&self) -> &[f32] {
        &self.confidences
    }

    /// Whether each prediction was correct, in dataset order.
    pub fn accuracies(&self) -> &[bool] {
        &self.accuracies
    }

    /// Per-sample records, in dataset order.
    pub fn records(&self) -> Vec<PredictionRecord> {
        self.predictions
            .iter()
            .zip(&self.confidences)
            .zip(&self.accuracies)
            .map(|((&prediction, &confidence), &correct)| PredictionRecord {
                prediction,
                confidence,
                correct,
            })
            .collect()
    }

    /// Records joined with sample paths and targets.
    pub fn prediction_rows(&self) -> Vec<PredictionRow> {
        self.dataset
            .samples()
            .iter()
            .zip(self.records())
            .enumerate()
            .map(|(index, (sample, record))| PredictionRow {
                index,
                path: sample.path.clone(),
                target: sample.target,
                prediction: record.prediction,
                confidence: record.confidence,
                correct: record.correct,
            })
            .collect()
    }

    /// Class labels in index order.
    pub fn class_labels(&self) -> &[String] {
        self.dataset.classes()
    }

    /// Number of classes.
    pub fn number_of_classes(&self) -> usize {
        self.dataset.n_classes()
    }

    /// The dataset being evaluated.
    pub fn dataset(&self) -> &ImageFolder {
        &self.dataset
    }

    /// The network being evaluated.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Size selector, when the network came from [`Inference::new`].
    pub fn model_size(&self) -> Option<ModelSize> {
        self.model_size
    }

    /// Number of correct predictions.
    pub fn correct(&self) -> usize {
        self.accuracies.iter().filter(|&&c| c).count()
    }

    /// Fraction of correct predictions; zero before inference or on an empty dataset.
    pub fn accuracy(&self) -> f32 {
        if self.accuracies.is_empty() {
            0.0
        } else {
            self.correct() as f32 / self.accuracies.len() as f32
        }
    }

    /// Hand the results to a confusion matrix builder.
    pub fn confusion_plot(
        &self,
        save_path: impl Into<PathBuf>,
        save_svg: bool,
    ) -> Result<ConfusionMatrixPlot> {
        Ok(ConfusionMatrixPlot::new(
            self.predictions.clone(),
            self.true_targets_checked()?,
            self.class_labels().to_vec(),
            save_path,
            save_svg,
        )?)
    }

    /// Accuracy, calibration and per-class report.
    pub fn summary(&self, n_bins: usize) -> Result<EvaluationSummary> {
        let targets = self.true_targets_checked()?;
        let calibration = compute_calibration(&self.confidences, &self.accuracies, n_bins)?;
        let report = classification_report(&self.predictions, &targets, self.class_labels())?;
        Ok(EvaluationSummary {
            accuracy: self.accuracy(),
            correct: self.correct(),
            total: self.predictions.len(),
            calibration,
            report,
        })
    }

    fn true_targets_checked(&self) -> Result<Vec<usize>> {
        let targets = self.true_targets();
        if targets.len() != self.predictions.len() {
            return Err(InferError::ShapeMismatch(format!(
                "{} predictions for {} samples; run infer() first",
                self.predictions.len(),
                targets.len()
            )));
        }
        Ok(targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use image::{Rgb, RgbImage};

    type TestBackend = NdArray;

    /// Predicts the class whose index matches the image's mean brightness bucket.
    struct Brightness {
        n_classes: usize,
    }

    impl ImageClassifier<TestBackend> for Brightness {
        fn forward(&self, x: Tensor<TestBackend, 4>) -> Tensor<TestBackend, 2> {
            let [batch, _, _, _] = x.dims();
            let mean: f32 = x.mean().into_scalar().elem();
            let device = Default::default();
            let bucket = if mean > 0.0 { self.n_classes - 1 } else { 0 };
            let mut logits = vec![0.0f32; self.n_classes];
            logits[bucket] = 5.0;
            let data = TensorData::new(logits, [1, self.n_classes]);
            Tensor::<TestBackend, 2>::from_data(data, &device).repeat_dim(0, batch)
        }

        fn n_classes(&self) -> usize {
            self.n_classes
        }
    }

    fn write_png(path: &Path, shade: u8) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        RgbImage::from_pixel(8, 8, Rgb([shade, shade, shade]))
            .save(path)
            .unwrap();
    }

    fn dataset(root: &Path) -> ImageFolder {
        // dark = 0, light = 1
        write_png(&root.join("dark/a.png"), 0);
        write_png(&root.join("dark/b.png"), 255);
        write_png(&root.join("light/c.png"), 255);
        write_png(&root.join("light/d.png"), 250);
        ImageFolder::new(root, ImageTransform::new(8, 8).unwrap()).unwrap()
    }

    fn runner(root: &Path) -> Inference<TestBackend, Brightness> {
        Inference::with_model(dataset(root), Brightness { n_classes: 2 }, Default::default())
            .unwrap()
            .with_progress(false)
    }

    #[test]
    fn test_infer_aligned_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner(dir.path());
        runner.infer().unwrap();

        assert_eq!(runner.true_targets(), vec![0, 0, 1, 1]);
        assert_eq!(runner.predictions(), &[0, 1, 1, 1]);
        assert_eq!(runner.accuracies(), &[true, false, true, true]);
        assert_eq!(runner.confidences().len(), 4);
        for &c in runner.confidences() {
            assert!((0.0..=1.0).contains(&c));
            // softmax of [5, 0]
            let expected = 1.0 / (1.0 + (-5.0f32).exp());
            assert!((c - expected).abs() < 1e-5);
        }
        assert_eq!(runner.correct(), 3);
        assert!((runner.accuracy() - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_infer_twice_replaces_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner(dir.path());
        runner.infer().unwrap();
        runner.infer().unwrap();

        assert_eq!(runner.predictions().len(), 4);
        assert_eq!(runner.records().len(), 4);
    }

    #[test]
    fn test_class_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            Inference::with_model(dataset(dir.path()), Brightness { n_classes: 3 }, Default::default());
        assert!(matches!(result, Err(InferError::ShapeMismatch(_))));
    }

    #[test]
    fn test_new_builds_sized_convnext() {
        let dir = tempfile::tempdir().unwrap();
        for (path, shade) in [("cat/a.png", 30), ("dog/b.png", 220)] {
            let path = dir.path().join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            RgbImage::from_pixel(16, 16, Rgb([shade, shade, shade]))
                .save(&path)
                .unwrap();
        }

        let mut runner = Inference::<TestBackend, _>::new(dir.path(), "TINY", &Default::default())
            .unwrap()
            .with_progress(false);

        assert_eq!(runner.model().n_classes(), 2);
        assert_eq!(runner.model_size(), Some(ModelSize::Tiny));
        assert_eq!(
            runner.dataset().transform(),
            &ImageTransform::for_size(ModelSize::Tiny)
        );

        runner.infer().unwrap();
        assert_eq!(runner.true_targets(), vec![0, 1]);
        assert_eq!(runner.predictions().len(), 2);
        assert_eq!(runner.accuracies().len(), 2);
        assert!(runner.predictions().iter().all(|&p| p < 2));
        for &c in runner.confidences() {
            assert!((0.0..=1.0).contains(&c));
        }
        assert_eq!(runner.confidences().len(), 2);
    }

    #[test]
    fn test_unsupported_size() {
        let dir = tempfile::tempdir().unwrap();
        dataset(dir.path());
        let result = Inference::<TestBackend, _>::new(dir.path(), "gigantic", &Default::default());
        assert!(matches!(result, Err(InferError::Core(_))));
    }

    #[test]
    fn test_plot_before_infer() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(dir.path());
        assert!(matches!(
            runner.confusion_plot(dir.path().join("out"), true),
            Err(InferError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn test_summary_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner(dir.path());
        runner.infer().unwrap();

        let summary = runner.summary(10).unwrap();
        assert_eq!(summary.total, 4);
        assert_eq!(summary.correct, 3);
        assert_eq!(summary.report.classes[0].name, "dark");
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"ece\""));

        let rows = runner.prediction_rows();
        assert_eq!(rows.len(), 4);
        assert!(rows[1].path.ends_with("dark/b.png"));
        assert!(!rows[1].correct);

        let cm = runner
            .confusion_plot(dir.path().join("out"), true)
            .unwrap()
            .generate_conf_matrix();
        assert_eq!(cm.matrix, vec![vec![1, 1], vec![0, 2]]);
        assert_eq!(cm.correct(), runner.correct());
    }
}
