//! imgeval CLI for evaluating image classifiers on ImageFolder datasets.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use burn_ndarray::NdArray;
use imgeval_core::ModelSize;
use imgeval_data::{ImageFolder, ImageTransform};
use imgeval_infer::Inference;
use imgeval_models::{model_name, registry, CheckpointMetadata};

/// Backend type for evaluation.
type EvalBackend = NdArray;

#[derive(Parser)]
#[command(name = "imgeval")]
#[command(author, version)]
#[command(about = "Evaluate ConvNeXt image classifiers on ImageFolder datasets")]
#[command(long_about = "imgeval: run a ConvNeXt classifier over an ImageFolder dataset and
report predictions, confidences, a confusion matrix and calibration.

EXAMPLES:
  # Evaluate the tiny model on a validation split
  imgeval evaluate --data data/val

  # Evaluate trained weights and print the matrix instead of writing an SVG
  imgeval evaluate --data data/val --model-size base --checkpoint base.mpk --no-export

  # Inspect a dataset
  imgeval datasets info data/val

MODEL SIZES:
  tiny [default], small, base, large")]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run inference and write predictions, metrics and a confusion matrix
    Evaluate {
        /// ImageFolder root: one subdirectory per class
        #[arg(long, value_name = "DIR")]
        data: PathBuf,

        /// Model capacity: tiny, small, base, large
        #[arg(long, default_value = "tiny", value_name = "SIZE")]
        model_size: String,

        /// Output directory for the plot and result files
        #[arg(long, default_value = "./runs", value_name = "DIR")]
        output: PathBuf,

        /// Weights to load instead of random initialisation
        #[arg(long, value_name = "FILE")]
        checkpoint: Option<PathBuf>,

        /// Print the confusion matrix to the terminal instead of writing an SVG
        #[arg(long, default_value = "false")]
        no_export: bool,

        /// Number of calibration bins
        #[arg(long, default_value = "10", value_name = "N")]
        n_bins: usize,
    },
    /// Inspect ImageFolder datasets
    Datasets {
        #[command(subcommand)]
        command: DatasetCommands,
    },
    /// List available models
    Models,
}

#[derive(Subcommand)]
enum DatasetCommands {
    /// Show classes and per-class sample counts
    Info {
        /// Dataset root
        path: PathBuf,
    },
}

/// Evaluation settings, echoed to `config.json`.
#[derive(Debug, Serialize)]
struct EvalConfig {
    data: PathBuf,
    model: String,
    model_size: ModelSize,
    checkpoint: Option<PathBuf>,
    output: PathBuf,
    export_svg: bool,
    n_bins: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::filter::LevelFilter::from_level(log_level))
        .init();

    match cli.command {
        Commands::Evaluate {
            data,
            model_size,
            output,
            checkpoint,
            no_export,
            n_bins,
        } => handle_evaluate(data, model_size, output, checkpoint, !no_export, n_bins),
        Commands::Datasets { command } => handle_datasets(command),
        Commands::Models => handle_models(),
    }
}

fn handle_evaluate(
    data: PathBuf,
    model_size: String,
    output: PathBuf,
    checkpoint: Option<PathBuf>,
    export_svg: bool,
    n_bins: usize,
) -> Result<()> {
    if n_bins == 0 {
        bail!("--n-bins must be at least 1");
    }
    let size: ModelSize = model_size
        .parse()
        .with_context(|| format!("Invalid model size '{}'", model_size))?;

    let config = EvalConfig {
        data: data.clone(),
        model: model_name(size),
        model_size: size,
        checkpoint: checkpoint.clone(),
        output: output.clone(),
        export_svg,
        n_bins,
    };

    println!("=== imgeval Evaluation ===\n");
    println!("Configuration:");
    println!("  Data: {}", config.data.display());
    println!("  Model: {}", config.model);
    match &config.checkpoint {
        Some(path) => println!("  Checkpoint: {}", path.display()),
        None => println!("  Checkpoint: none (random initialisation)"),
    }
    println!("  Output: {}", config.output.display());
    println!("  Export SVG: {}\n", if export_svg { "yes" } else { "no" });

    let device = burn_ndarray::NdArrayDevice::Cpu;
    let mut runner = Inference::<EvalBackend, _>::new(&data, size.tag(), &device)
        .with_context(|| format!("Failed to prepare evaluation of '{}'", data.display()))?;

    if let Some(path) = &checkpoint {
        check_metadata(path, &config.model, runner.class_labels());
        runner = runner
            .with_checkpoint(path)
            .with_context(|| format!("Failed to load checkpoint '{}'", path.display()))?;
    }

    println!(
        "Dataset: {} samples, {} classes",
        runner.dataset().len(),
        runner.number_of_classes()
    );
    println!();

    runner.infer().context("Inference failed")?;

    println!();
    println!(
        "Accuracy: {:.2}% ({}/{})",
        runner.accuracy() * 100.0,
        runner.correct(),
        runner.predictions().len()
    );
    println!();

    std::fs::create_dir_all(&output)
        .with_context(|| format!("Failed to create output directory '{}'", output.display()))?;

    let plot = runner.confusion_plot(&output, export_svg)?;
    let (_, rendered) = plot
        .plot_conf_matrix()
        .context("Failed to plot confusion matrix")?;
    if let imgeval_analysis::PlotOutput::Svg(path) = rendered {
        println!("\nConfusion matrix saved to {}", path.display());
    }

    let summary = runner.summary(n_bins)?;
    println!("\n{}", summary.report.to_string_table());
    println!("{}", summary.calibration.summary());

    write_json(&output.join("config.json"), &config)?;
    write_json(&output.join("predictions.json"), &runner.prediction_rows())?;
    write_json(&output.join("metrics.json"), &summary)?;
    println!("Results written to {}", output.display());

    Ok(())
}

/// Warn when a checkpoint sidecar disagrees with the requested model or dataset.
fn check_metadata(checkpoint: &Path, model: &str, classes: &[String]) {
    let sidecar = CheckpointMetadata::sidecar_path(checkpoint);
    if !sidecar.exists() {
        return;
    }
    match CheckpointMetadata::load(&sidecar) {
        Ok(meta) => {
            if meta.arch != model {
                tracing::warn!(expected = %model, found = %meta.arch, "checkpoint architecture differs");
            }
            if meta.classes != classes {
                tracing::warn!("checkpoint class labels differ from dataset classes");
            }
        }
        Err(e) => tracing::warn!(error = %e, "ignoring unreadable checkpoint metadata"),
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write '{}'", path.display()))?;
    tracing::debug!(path = %path.display(), "wrote results");
    Ok(())
}

fn handle_datasets(command: DatasetCommands) -> Result<()> {
    match command {
        DatasetCommands::Info { path } => {
            let dataset = ImageFolder::new(&path, ImageTransform::default())
                .with_context(|| format!("Failed to read dataset '{}'", path.display()))?;
            print_dataset_info(&dataset);
            Ok(())
        }
    }
}

/// Print dataset information.
fn print_dataset_info(dataset: &ImageFolder) {
    println!("Dataset: {}", dataset.root().display());
    println!("─────────────────────────────────────────");
    println!("  Classes:        {}", dataset.n_classes());
    println!("  Total samples:  {}", dataset.len());
    println!();
    let width = dataset
        .classes()
        .iter()
        .map(|c| c.len())
        .max()
        .unwrap_or(0)
        .max(5);
    for (class, count) in dataset.classes().iter().zip(dataset.class_counts()) {
        println!("  {:<width$}  {}", class, count, width = width);
    }
}

fn handle_models() -> Result<()> {
    println!("Available models:\n");
    for name in registry::list_models() {
        let size = registry::parse_model_name(&name)?;
        let transform = ImageTransform::for_size(size);
        println!(
            "  {:<16} resize {} / crop {}",
            name, transform.resize_size, transform.crop_size
        );
    }
    Ok(())
}
