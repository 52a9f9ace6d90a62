use clap::Parser;
use std::path::PathBuf;

use crate::census::CensusOptions;
use crate::counts::{CountEntry, CountTable};
use crate::error::{Error, Result};
use crate::subset::SubsetOptions;

/// Classes kept when no target class is given on the command line
pub const DEFAULT_TARGET_CLASSES: &[&str] = &[
    "cat", "dog", "horse", "bird", "sheep", "cow", "elephant", "bear", "zebra", "giraffe",
];

/// Extract the images and annotations of a few COCO categories into a new dataset.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct SubsetArgs {
    /// COCO annotation file of the full dataset
    #[arg(long = "annotations", default_value = "annotations/instances_train2017.json")]
    pub annotations: PathBuf,

    /// Directory holding the images of the full dataset
    #[arg(long = "images", default_value = "train2017")]
    pub images_dir: PathBuf,

    /// Where to write the filtered annotation file
    #[arg(
        long = "output_annotations",
        visible_alias = "output-annotations",
        default_value = "coco10/annotations/instances_train2017_subset.json"
    )]
    pub output_annotations: PathBuf,

    /// Where to copy the selected images
    #[arg(
        long = "output_images",
        visible_alias = "output-images",
        default_value = "coco10/train2017_subset"
    )]
    pub output_images_dir: PathBuf,

    /// Number of threads used to copy images (0 = one per core)
    #[arg(long = "workers", default_value_t = 0)]
    pub workers: usize,

    /// Report what would be extracted without copying or writing anything
    #[arg(long = "dry_run", visible_alias = "dry-run")]
    pub dry_run: bool,

    /// Category names to keep (defaults to ten animal classes)
    #[arg(value_delimiter = ',')]
    pub target_classes: Vec<String>,
}

impl SubsetArgs {
    pub fn to_options(&self) -> SubsetOptions {
        let target_classes = if self.target_classes.is_empty() {
            DEFAULT_TARGET_CLASSES
                .iter()
                .map(|name| name.to_string())
                .collect()
        } else {
            self.target_classes.clone()
        };

        SubsetOptions {
            annotations: self.annotations.clone(),
            images_dir: self.images_dir.clone(),
            output_annotations: self.output_annotations.clone(),
            output_images_dir: self.output_images_dir.clone(),
            target_classes,
            workers: self.workers,
            dry_run: self.dry_run,
        }
    }
}

/// Write the number of images per category of a COCO subset to a CSV file.
#[derive(Parser, Debug, Clone)]
#[command(version, long_about = None)]
pub struct CensusArgs {
    /// Filtered COCO annotation file
    #[arg(
        long = "annotations",
        default_value = "coco10/annotations/instances_train2017_subset.json"
    )]
    pub annotations: PathBuf,

    /// CSV report to write
    #[arg(long = "output", short = 'o', default_value = "category_images.csv")]
    pub output: PathBuf,

    /// Image count per category id as ID=COUNT (repeatable or comma separated)
    #[arg(long = "count", value_delimiter = ',', value_parser = parse_count_entry)]
    pub counts: Vec<CountEntry>,

    /// JSON object mapping category ids to image counts
    #[arg(long = "counts_file", visible_alias = "counts-file", conflicts_with = "counts")]
    pub counts_file: Option<PathBuf>,

    /// Check that every annotation resolves its image and category first
    #[arg(long = "verify")]
    pub verify: bool,
}

impl CensusArgs {
    /// Resolve the count table: explicit pairs, then a file, then the built-in snapshot
    pub fn to_options(&self) -> Result<CensusOptions> {
        let counts = match (&self.counts_file, self.counts.is_empty()) {
            (Some(_), false) => {
                return Err(Error::InvalidCounts(
                    "--count and --counts_file cannot be combined".to_string(),
                ))
            }
            (Some(path), true) => CountTable::from_json_file(path)?,
            (None, false) => self
                .counts
                .iter()
                .map(|entry| (entry.category_id, entry.count))
                .collect(),
            (None, true) => CountTable::snapshot(),
        };

        Ok(CensusOptions {
            annotations: self.annotations.clone(),
            output: self.output.clone(),
            counts,
            verify: self.verify,
        })
    }
}

// Validate one ID=COUNT pair
fn parse_count_entry(s: &str) -> Result<CountEntry, String> {
    s.parse()
}
