//! VehiDE annotation conversion.
//!
//! Reads per-split JSON annotation files with pixel corner boxes and writes
//! the YOLO training layout: copied images, normalized center-form label
//! files, and a `data.yaml` naming the splits and classes.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

use crate::detect::{DamageClass, PixelBBox, KNOWN_CLASSES};
use crate::label;

pub const SPLITS: [&str; 3] = ["train", "val", "test"];

/// One annotated image. Field aliases absorb the two naming conventions seen
/// in VehiDE exports.
#[derive(Debug, Deserialize)]
struct ImageAnnotation {
    #[serde(alias = "image_name")]
    filename: String,
    #[serde(default, alias = "annotations")]
    damages: Vec<DamageAnnotation>,
}

#[derive(Debug, Deserialize)]
struct DamageAnnotation {
    #[serde(rename = "type", alias = "class")]
    class: String,
    /// Pixel corner box: [x1, y1, x2, y2].
    #[serde(alias = "bounding_box")]
    bbox: [f32; 4],
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SplitSummary {
    /// Images copied with a label file written.
    pub images: usize,
    /// Label lines written.
    pub labels: usize,
    /// Annotations referencing missing or unreadable images.
    pub skipped_images: usize,
    /// Annotations with a class outside the vocabulary.
    pub skipped_annotations: usize,
}

#[derive(Clone, Debug, Default)]
pub struct ConvertSummary {
    /// Per-split results, in `SPLITS` order. `None` when the split had no
    /// annotation file.
    pub splits: Vec<(String, Option<SplitSummary>)>,
}

pub struct DatasetConverter {
    dataset_root: PathBuf,
    output_root: PathBuf,
}

impl DatasetConverter {
    pub fn new(dataset_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            dataset_root: dataset_root.into(),
            output_root: output_root.into(),
        }
    }

    /// Convert every split that has an annotation file, then write data.yaml.
    pub fn convert(&self) -> Result<ConvertSummary> {
        if !self.dataset_root.exists() {
            anyhow::bail!(
                "dataset not found at {}; download it first",
                self.dataset_root.display()
            );
        }
        self.setup_layout()?;

        let mut summary = ConvertSummary::default();
        for split in SPLITS {
            let annotations = self
                .dataset_root
                .join("annotations")
                .join(format!("{split}.json"));
            if !annotations.exists() {
                log::warn!("no {split} annotations at {}", annotations.display());
                summary.splits.push((split.to_string(), None));
                continue;
            }
            let image_dir = self.dataset_root.join("images").join(split);
            let split_summary = self.process_split(&annotations, &image_dir, split)?;
            log::info!(
                "{split}: {} images, {} labels, {} image skips, {} annotation skips",
                split_summary.images,
                split_summary.labels,
                split_summary.skipped_images,
                split_summary.skipped_annotations
            );
            summary.splits.push((split.to_string(), Some(split_summary)));
        }

        self.write_data_yaml()?;
        Ok(summary)
    }

    fn setup_layout(&self) -> Result<()> {
        for split in SPLITS {
            for folder in ["images", "labels"] {
                fs::create_dir_all(self.output_root.join(split).join(folder))?;
            }
        }
        Ok(())
    }

    fn process_split(
        &self,
        annotation_file: &Path,
        image_dir: &Path,
        split: &str,
    ) -> Result<SplitSummary> {
        let raw = fs::read_to_string(annotation_file)
            .with_context(|| format!("failed to read {}", annotation_file.display()))?;
        let annotations: Vec<ImageAnnotation> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid annotation file {}", annotation_file.display()))?;

        let progress = ProgressBar::new(annotations.len() as u64);
        progress.set_style(
            ProgressStyle::with_template("{msg} [{bar:30}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        progress.set_message(split.to_string());

        let mut summary = SplitSummary::default();
        for annotation in annotations {
            progress.inc(1);
            let image_path = image_dir.join(&annotation.filename);
            let (img_w, img_h) = match image::image_dimensions(&image_path) {
                Ok(dims) => dims,
                Err(err) => {
                    log::debug!("skipping {}: {}", image_path.display(), err);
                    summary.skipped_images += 1;
                    continue;
                }
            };

            let mut lines = Vec::new();
            for damage in &annotation.damages {
                let Some(class_id) =
                    DamageClass::parse(&damage.class).and_then(|class| class.class_id())
                else {
                    summary.skipped_annotations += 1;
                    continue;
                };
                let [x1, y1, x2, y2] = damage.bbox;
                let Ok(norm) = label::normalize(
                    PixelBBox::new(x1, y1, x2, y2),
                    img_w as f32,
                    img_h as f32,
                ) else {
                    summary.skipped_annotations += 1;
                    continue;
                };
                lines.push(label::format_label_line(class_id, norm));
            }

            fs::copy(
                &image_path,
                self.output_root
                    .join(split)
                    .join("images")
                    .join(&annotation.filename),
            )
            .with_context(|| format!("failed to copy {}", image_path.display()))?;

            let stem = Path::new(&annotation.filename)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| annotation.filename.clone());
            let label_path = self
                .output_root
                .join(split)
                .join("labels")
                .join(format!("{stem}.txt"));
            let mut file = fs::File::create(&label_path)
                .with_context(|| format!("failed to create {}", label_path.display()))?;
            for line in &lines {
                writeln!(file, "{line}")?;
            }

            summary.images += 1;
            summary.labels += lines.len();
        }
        progress.finish_and_clear();
        Ok(summary)
    }

    fn write_data_yaml(&self) -> Result<()> {
        let names: Vec<String> = KNOWN_CLASSES
            .iter()
            .map(|class| format!("'{class}'"))
            .collect();
        let yaml = format!(
            "# Vehicle damage detection dataset\n\
             path: {path}\n\
             train: train/images\n\
             val: val/images\n\
             test: test/images\n\
             \n\
             nc: {nc}\n\
             names: [{names}]\n",
            path = self.output_root.display(),
            nc = KNOWN_CLASSES.len(),
            names = names.join(", "),
        );
        fs::write(self.output_root.join("data.yaml"), yaml)?;
        Ok(())
    }

    pub fn data_yaml_path(&self) -> PathBuf {
        self.output_root.join("data.yaml")
    }
}
