//! Integration tests for the evaluation pipeline.
//!
//! These tests build small ImageFolder trees on disk and run them end to end.

use std::path::Path;

use burn::prelude::*;
use burn_ndarray::NdArray;
use image::{Rgb, RgbImage};

use imgeval::prelude::*;

type TestBackend = NdArray;

/// Classifies by mean normalised intensity: dark, mid-grey, bright.
struct ShadeClassifier;

impl ImageClassifier<TestBackend> for ShadeClassifier {
    fn forward(&self, x: Tensor<TestBackend, 4>) -> Tensor<TestBackend, 2> {
        let mean: f32 = x.mean().into_scalar().elem();
        let class = if mean < -1.0 {
            0
        } else if mean < 1.2 {
            1
        } else {
            2
        };
        let mut logits = vec![0.0f32; 3];
        logits[class] = 4.0;
        Tensor::from_data(TensorData::new(logits, [1, 3]), &Default::default())
    }

    fn n_classes(&self) -> usize {
        3
    }
}

fn write_png(path: &Path, shade: u8) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(16, 16, Rgb([shade, shade, shade]))
        .save(path)
        .unwrap();
}

/// cat/dog/fish with shades chosen so the classifier predicts
/// [cat, dog, dog, dog, fish, cat].
fn pets(root: &Path) -> ImageFolder {
    write_png(&root.join("cat/a.png"), 0);
    write_png(&root.join("cat/b.png"), 128);
    write_png(&root.join("dog/c.png"), 128);
    write_png(&root.join("dog/d.png"), 128);
    write_png(&root.join("fish/e.png"), 255);
    write_png(&root.join("fish/f.png"), 0);
    ImageFolder::new(root, ImageTransform::new(16, 16).unwrap()).unwrap()
}

#[test]
fn test_pets_confusion_matrix() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = pets(&dir.path().join("data"));
    assert_eq!(dataset.classes(), &["cat", "dog", "fish"]);

    let mut runner = Inference::with_model(dataset, ShadeClassifier, Default::default())
        .unwrap()
        .with_progress(false);
    runner.infer().unwrap();

    assert_eq!(runner.true_targets(), vec![0, 0, 1, 1, 2, 2]);
    assert_eq!(runner.predictions(), &[0, 1, 1, 1, 2, 0]);
    assert_eq!(runner.confidences().len(), 6);
    assert_eq!(runner.accuracies(), &[true, false, true, true, true, false]);

    let out = dir.path().join("runs/nested");
    let plot = runner.confusion_plot(&out, true).unwrap();
    let (cm, output) = plot.plot_conf_matrix().unwrap();

    assert_eq!(cm.matrix, vec![vec![1, 1, 0], vec![0, 2, 0], vec![1, 0, 1]]);
    assert_eq!(cm.total(), 6);
    assert_eq!(cm.correct(), 4);
    assert!((cm.accuracy() - 4.0 / 6.0).abs() < 1e-6);
    for (i, count) in [2, 2, 2].into_iter().enumerate() {
        assert_eq!(cm.row_sum(i), count);
    }

    let svg = out.join("confusion_matrix.svg");
    assert!(matches!(output, PlotOutput::Svg(ref p) if *p == svg));
    let text = std::fs::read_to_string(&svg).unwrap();
    assert!(text.contains("fish"));

    // Plotting again yields the same matrix and the same file.
    let (again, _) = plot.plot_conf_matrix().unwrap();
    assert_eq!(again, cm);
    assert_eq!(std::fs::read_to_string(&svg).unwrap(), text);
}

#[test]
fn test_summary_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = Inference::with_model(pets(dir.path()), ShadeClassifier, Default::default())
        .unwrap()
        .with_progress(false);
    runner.infer().unwrap();

    let summary = runner.summary(5).unwrap();
    assert_eq!(summary.total, 6);
    assert_eq!(summary.correct, 4);
    assert!((summary.report.accuracy - 4.0 / 6.0).abs() < 1e-6);
    assert_eq!(summary.calibration.total_samples, 6);
    // Every prediction carries the same confidence, so all land in one bin.
    let occupied = summary.calibration.bins.iter().filter(|b| b.count > 0).count();
    assert_eq!(occupied, 1);
}

#[test]
fn test_convnext_checkpoint_reproduces_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("data");
    let device: <TestBackend as Backend>::Device = Default::default();
    let config = ConvNextConfig::new(3, vec![1], vec![8]);

    let model = config.init::<TestBackend>(&device).unwrap();
    let weights = dir.path().join("weights.mpk");
    save_checkpoint(&model, &weights).unwrap();

    let mut first = Inference::with_model(pets(&data), model, device.clone())
        .unwrap()
        .with_progress(false);
    first.infer().unwrap();

    let fresh = config.init::<TestBackend>(&device).unwrap();
    let mut second = Inference::with_model(pets(&data), fresh, device.clone())
        .unwrap()
        .with_checkpoint(&weights)
        .unwrap()
        .with_progress(false);
    second.infer().unwrap();

    assert_eq!(first.predictions(), second.predictions());
    for (a, b) in first.confidences().iter().zip(second.confidences()) {
        assert!((a - b).abs() < 1e-5);
    }
    for &c in second.confidences() {
        assert!((1.0 / 3.0 - 1e-6..=1.0).contains(&c));
    }
}

#[test]
fn test_terminal_heatmap_writes_no_file() {
    let dir = tempfile::tempdir().unwrap();
    let dataset = pets(&dir.path().join("data"));
    let mut runner = Inference::with_model(dataset, ShadeClassifier, Default::default())
        .unwrap()
        .with_progress(false);
    runner.infer().unwrap();

    let out = dir.path().join("out");
    let (_, output) = runner
        .confusion_plot(&out, false)
        .unwrap()
        .plot_conf_matrix()
        .unwrap();
    assert!(matches!(output, PlotOutput::Terminal(_)));
    assert!(!out.join("confusion_matrix.svg").exists());
}
