//! Confusion matrix rendering.
//!
//! Every call to [`ConfusionMatrixPlot::plot_conf_matrix`] builds its own
//! drawing area and drops it before returning, so repeated calls never share
//! figure state.

use std::path::{Path, PathBuf};

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::confusion::{confusion_matrix, ConfusionMatrix};
use crate::error::{AnalysisError, Result};

/// File name written into the output directory.
pub const CONFUSION_MATRIX_FILE: &str = "confusion_matrix.svg";

const TITLE: &str = "Confusion Matrix";

/// Figure size in inches.
pub const FIGURE_INCHES: (u32, u32) = (15, 8);

/// Resolution requested for raster exports of the figure. The SVG canvas
/// does not use it.
pub const DPI_HINT: u32 = 400;

const PX_PER_INCH: u32 = 100;
const CANVAS: (u32, u32) = (FIGURE_INCHES.0 * PX_PER_INCH, FIGURE_INCHES.1 * PX_PER_INCH);
const TITLE_BAND: i32 = 60;
const LABEL_BAND: i32 = 60;
const COLORBAR_BAND: i32 = 120;
const MARGIN: i32 = 20;

const TERMINAL_SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

/// Where a rendered confusion matrix ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlotOutput {
    /// Written as a vector image.
    Svg(PathBuf),
    /// Printed to the terminal; holds the rendered text.
    Terminal(String),
}

/// Builds and renders a labelled confusion matrix from aligned predictions and targets.
#[derive(Debug, Clone)]
pub struct ConfusionMatrixPlot {
    predictions: Vec<usize>,
    targets: Vec<usize>,
    class_labels: Vec<String>,
    save_path: PathBuf,
    save_svg: bool,
}

impl ConfusionMatrixPlot {
    /// Create a plot job.
    ///
    /// `save_svg` selects file export; when false the heatmap is printed to the terminal.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::LengthMismatch`] if the sequences are not aligned.
    pub fn new(
        predictions: Vec<usize>,
        targets: Vec<usize>,
        class_labels: Vec<String>,
        save_path: impl Into<PathBuf>,
        save_svg: bool,
    ) -> Result<Self> {
        if predictions.len() != targets.len() {
            return Err(AnalysisError::LengthMismatch {
                predictions: predictions.len(),
                targets: targets.len(),
            });
        }
        Ok(Self {
            predictions,
            targets,
            class_labels,
            save_path: save_path.into(),
            save_svg,
        })
    }

    /// Output directory.
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Tally the matrix: row `i` is the histogram of predictions for samples of true class `i`.
    pub fn generate_conf_matrix(&self) -> ConfusionMatrix {
        confusion_matrix(&self.predictions, &self.targets, &self.class_labels)
    }

    /// Print the matrix, then render it as an annotated heatmap.
    ///
    /// The output directory is created if needed even when rendering to the terminal.
    pub fn plot_conf_matrix(&self) -> Result<(ConfusionMatrix, PlotOutput)> {
        let cm = self.generate_conf_matrix();
        println!("Confusion Matrix:\n");
        println!("{}", cm.to_string_table());

        std::fs::create_dir_all(&self.save_path)?;

        let output = if self.save_svg {
            let path = self.save_path.join(CONFUSION_MATRIX_FILE);
            render_svg(&cm, &path)?;
            tracing::info!(path = %path.display(), "wrote confusion matrix");
            PlotOutput::Svg(path)
        } else {
            let text = render_terminal(&cm);
            println!("{}", text);
            PlotOutput::Terminal(text)
        };

        Ok((cm, output))
    }
}

fn render_err<E: std::fmt::Display>(e: E) -> AnalysisError {
    AnalysisError::Render(e.to_string())
}

/// Render an annotated heatmap with a colour bar to an SVG file.
pub fn render_svg(cm: &ConfusionMatrix, path: &Path) -> Result<()> {
    let (width, height) = CANVAS;
    let root = SVGBackend::new(path, (width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let centered = Pos::new(HPos::Center, VPos::Center);
    let title_style = ("sans-serif", 28).into_font().color(&BLACK).pos(centered);
    root.draw(&Text::new(TITLE, (width as i32 / 2, TITLE_BAND / 2), title_style))
        .map_err(render_err)?;

    let n = cm.n_classes.max(1) as i32;
    let longest = cm.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as i32;
    let left = MARGIN + (longest * 8).clamp(40, 300);
    let grid_w = width as i32 - left - COLORBAR_BAND - MARGIN;
    let grid_h = height as i32 - TITLE_BAND - LABEL_BAND - MARGIN;
    let cell_w = grid_w / n;
    let cell_h = grid_h / n;
    let top = TITLE_BAND;

    let max = cm.max_count().max(1) as f64;
    let font_px = (cell_h.min(cell_w) / 3).clamp(8, 24);

    for (i, row) in cm.matrix.iter().enumerate() {
        for (j, &count) in row.iter().enumerate() {
            let x0 = left + j as i32 * cell_w;
            let y0 = top + i as i32 * cell_h;
            let t = count as f64 / max;
            let color = heat_color(t);
            root.draw(&Rectangle::new(
                [(x0, y0), (x0 + cell_w, y0 + cell_h)],
                color.filled(),
            ))
            .map_err(render_err)?;

            let ink = if t > 0.6 { &BLACK } else { &WHITE };
            let style = ("sans-serif", font_px).into_font().color(ink).pos(centered);
            root.draw(&Text::new(
                count.to_string(),
                (x0 + cell_w / 2, y0 + cell_h / 2),
                style,
            ))
            .map_err(render_err)?;
        }
    }

    let label_px = font_px.clamp(10, 16);
    for (k, label) in cm.labels.iter().enumerate() {
        let row_style = ("sans-serif", label_px)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Right, VPos::Center));
        root.draw(&Text::new(
            label.as_str(),
            (left - 8, top + k as i32 * cell_h + cell_h / 2),
            row_style,
        ))
        .map_err(render_err)?;

        let col_style = ("sans-serif", label_px)
            .into_font()
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Top));
        root.draw(&Text::new(
            label.as_str(),
            (left + k as i32 * cell_w + cell_w / 2, top + n * cell_h + 8),
            col_style,
        ))
        .map_err(render_err)?;
    }

    draw_colorbar(&root, left + n * cell_w + 40, top, n * cell_h, cm.max_count())?;

    root.present().map_err(render_err)?;
    Ok(())
}

fn draw_colorbar<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    x: i32,
    top: i32,
    height: i32,
    max_count: usize,
) -> Result<()> {
    const STEPS: i32 = 64;
    let bar_w = 20;
    let step_h = (height / STEPS).max(1);
    for s in 0..STEPS {
        // top of the bar is the maximum
        let t = 1.0 - s as f64 / (STEPS - 1) as f64;
        let y0 = top + s * step_h;
        root.draw(&Rectangle::new(
            [(x, y0), (x + bar_w, y0 + step_h)],
            heat_color(t).filled(),
        ))
        .map_err(render_err)?;
    }

    let style = ("sans-serif", 14)
        .into_font()
        .color(&BLACK)
        .pos(Pos::new(HPos::Left, VPos::Center));
    root.draw(&Text::new(max_count.to_string(), (x + bar_w + 6, top), style.clone()))
        .map_err(render_err)?;
    root.draw(&Text::new("0", (x + bar_w + 6, top + STEPS * step_h), style))
        .map_err(render_err)?;
    Ok(())
}

/// Dark-to-light ramp: black purple, magenta, red, cream.
fn heat_color(t: f64) -> RGBColor {
    const STOPS: [(f64, (f64, f64, f64)); 4] = [
        (0.0, (3.0, 5.0, 26.0)),
        (0.35, (118.0, 32.0, 91.0)),
        (0.7, (225.0, 61.0, 66.0)),
        (1.0, (250.0, 235.0, 221.0)),
    ];
    let t = t.clamp(0.0, 1.0);
    for pair in STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = (t - t0) / (t1 - t0);
            let lerp = |a: f64, b: f64| (a + (b - a) * f).round() as u8;
            return RGBColor(lerp(c0.0, c1.0), lerp(c0.1, c1.1), lerp(c0.2, c1.2));
        }
    }
    let (_, c) = STOPS[STOPS.len() - 1];
    RGBColor(c.0 as u8, c.1 as u8, c.2 as u8)
}

/// Shaded text heatmap: one block per cell, denser glyphs for larger counts.
pub fn render_terminal(cm: &ConfusionMatrix) -> String {
    let max = cm.max_count().max(1);
    let label_width = cm.labels.iter().map(|l| l.chars().count()).max().unwrap_or(0);
    let digits = cm.max_count().to_string().len();

    let mut s = String::new();
    s.push_str(TITLE);
    s.push('\n');
    for (i, label) in cm.labels.iter().enumerate() {
        s.push_str(&format!("{:<w$} ", label, w = label_width));
        for &count in &cm.matrix[i] {
            let level = (count * (TERMINAL_SHADES.len() - 1) + max - 1) / max;
            let shade = TERMINAL_SHADES[level.min(TERMINAL_SHADES.len() - 1)];
            s.push_str(&format!("{}{}{:>d$} ", shade, shade, count, d = digits));
        }
        s.push('\n');
    }
    s
}
