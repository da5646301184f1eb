//! Folder-per-class image datasets.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{DataError, Result};
use crate::transform::{ImageData, ImageTransform};

/// File extensions recognised as images (compared case-insensitively).
pub const IMG_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "ppm", "bmp", "pgm", "tif", "tiff", "webp",
];

/// Whether a path carries one of [`IMG_EXTENSIONS`].
#[must_use]
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_lowercase();
            IMG_EXTENSIONS.iter().any(|ext| *ext == e)
        })
        .unwrap_or(false)
}

/// A labelled image: file path and class index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    /// Path to the image file.
    pub path: PathBuf,
    /// Class index (position of the class folder in sorted order).
    pub target: usize,
}

/// A dataset whose classes are the subdirectories of a root folder.
///
/// ```text
/// root/
///   cat/ 001.png 002.png
///   dog/ a.jpg
///   fish/ nested/b.png
/// ```
///
/// Class indices follow sorted folder names. Samples are ordered by class,
/// then by containing folder path and file name (searched recursively).
#[derive(Debug, Clone)]
pub struct ImageFolder {
    root: PathBuf,
    classes: Vec<String>,
    class_to_idx: HashMap<String, usize>,
    samples: Vec<Sample>,
    transform: ImageTransform,
}

impl ImageFolder {
    /// Scan `root` and build the sample index.
    ///
    /// Images are decoded lazily by [`ImageFolder::get`].
    ///
    /// # Errors
    ///
    /// Fails if `root` is not a readable directory, has no class folders,
    /// or any class folder contains no image file.
    pub fn new(root: impl AsRef<Path>, transform: ImageTransform) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(DataError::NotADirectory(root));
        }

        let classes = find_classes(&root)?;
        let class_to_idx: HashMap<String, usize> = classes
            .iter()
            .enumerate()
            .map(|(i, c)| (c.clone(), i))
            .collect();

        let mut samples = Vec::new();
        for (target, class) in classes.iter().enumerate() {
            let mut files = Vec::new();
            collect_images(&root.join(class), &mut files)?;
            if files.is_empty() {
                return Err(DataError::EmptyClass(class.clone()));
            }
            tracing::debug!(class = %class, count = files.len(), "indexed class folder");
            samples.extend(files.into_iter().map(|path| Sample { path, target }));
        }

        tracing::info!(
            root = %root.display(),
            classes = classes.len(),
            samples = samples.len(),
            "loaded image folder"
        );

        Ok(Self {
            root,
            classes,
            class_to_idx,
            samples,
            transform,
        })
    }

    /// Root directory of the dataset.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Class labels in index order.
    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Number of classes.
    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Index of a class label.
    #[must_use]
    pub fn class_to_idx(&self, label: &str) -> Option<usize> {
        self.class_to_idx.get(label).copied()
    }

    /// Get the number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples in iteration order.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// True class indices in iteration order.
    #[must_use]
    pub fn targets(&self) -> Vec<usize> {
        self.samples.iter().map(|s| s.target).collect()
    }

    /// Number of samples per class, in class index order.
    #[must_use]
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.classes.len()];
        for s in &self.samples {
            counts[s.target] += 1;
        }
        counts
    }

    /// The preprocessing applied by [`ImageFolder::get`].
    #[must_use]
    pub fn transform(&self) -> &ImageTransform {
        &self.transform
    }

    /// Decode and preprocess the sample at `index`.
    pub fn get(&self, index: usize) -> Result<(ImageData, usize)> {
        let sample = self
            .samples
            .get(index)
            .ok_or(DataError::IndexOutOfBounds {
                index,
                length: self.samples.len(),
            })?;
        let image = self.transform.load(&sample.path)?;
        Ok((image, sample.target))
    }

    /// Iterate over preprocessed samples in order.
    pub fn iter(&self) -> impl Iterator<Item = Result<(ImageData, usize)>> + '_ {
        (0..self.samples.len()).map(move |i| self.get(i))
    }
}

fn find_classes(root: &Path) -> Result<Vec<String>> {
    let mut classes = Vec::new();
    for entry in fs::read_dir(root)? {
        let entry = entry?;
        // fs::metadata follows symlinks
        if fs::metadata(entry.path())?.is_dir() {
            classes.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    if classes.is_empty() {
        return Err(DataError::NoClasses(root.to_path_buf()));
    }
    classes.sort();
    Ok(classes)
}

/// Image files under `dir`, directories visited in whole-path string order
/// and files sorted by name within each directory.
fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    let mut dirs = Vec::new();
    collect_dirs(dir, &mut dirs)?;
    // `a-b` sorts before `a/c` on the full path
    dirs.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

    for d in dirs {
        let mut files: Vec<PathBuf> = fs::read_dir(&d)?
            .map(|e| e.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?
            .into_iter()
            .filter(|p| p.is_file() && has_image_extension(p))
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        out.extend(files);
    }
    Ok(())
}

fn collect_dirs(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    out.push(dir.to_path_buf());
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_dirs(&path, out)?;
        }
    }
    Ok(())
}
