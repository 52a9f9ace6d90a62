//! Subset extraction
//!
//! Filters a COCO annotation collection down to a set of target categories,
//! copies the images those categories appear in and writes the filtered
//! collection next to them.

use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::coco::{
    read_collection, write_collection, Annotation, AnnotationCollection, Category, CocoIndex,
    Image,
};
use crate::error::{Error, Result};
use crate::utils::{create_io_thread_pool, create_progress_bar, ensure_directory};

/// Everything the extractor needs to know about one run
#[derive(Debug, Clone)]
pub struct SubsetOptions {
    pub annotations: PathBuf,
    pub images_dir: PathBuf,
    pub output_annotations: PathBuf,
    pub output_images_dir: PathBuf,
    pub target_classes: Vec<String>,
    pub workers: usize,
    pub dry_run: bool,
}

/// The parts of a collection that belong to the target categories.
///
/// Each sequence keeps the order of the source collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubsetSelection {
    pub categories: Vec<Category>,
    pub annotations: Vec<Annotation>,
    pub images: Vec<Image>,
}

/// Sizes of the extracted subset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsetSummary {
    pub categories: usize,
    pub annotations: usize,
    pub images: usize,
}

impl From<&SubsetSelection> for SubsetSummary {
    fn from(selection: &SubsetSelection) -> Self {
        Self {
            categories: selection.categories.len(),
            annotations: selection.annotations.len(),
            images: selection.images.len(),
        }
    }
}

/// Select the categories named in `targets` with their annotations and images.
///
/// Names match exactly and case-sensitively. A name with no matching category
/// contributes nothing. An annotation of a selected category whose image is
/// missing from the collection is an error.
pub fn select_subset(
    collection: &AnnotationCollection,
    targets: &[String],
) -> Result<SubsetSelection> {
    let index = CocoIndex::build(collection)?;
    let targets: HashSet<&str> = targets.iter().map(String::as_str).collect();

    let categories: Vec<Category> = collection
        .categories
        .iter()
        .filter(|category| targets.contains(category.name.as_str()))
        .cloned()
        .collect();
    let category_ids: HashSet<u64> = categories.iter().map(|category| category.id).collect();

    let matched: HashSet<&str> = categories.iter().map(|c| c.name.as_str()).collect();
    let mut unmatched: Vec<&str> = targets.difference(&matched).copied().collect();
    if !unmatched.is_empty() {
        unmatched.sort_unstable();
        warn!("No category named {:?} in the collection", unmatched);
    }

    let annotations: Vec<Annotation> = collection
        .annotations
        .iter()
        .filter(|annotation| category_ids.contains(&annotation.category_id))
        .cloned()
        .collect();

    let mut image_ids = HashSet::new();
    for annotation in &annotations {
        if image_ids.insert(annotation.image_id) && index.image(annotation.image_id).is_none() {
            return Err(Error::DanglingReference {
                annotation_id: annotation.id,
                kind: "image",
                id: annotation.image_id,
            });
        }
    }

    let images: Vec<Image> = collection
        .images
        .iter()
        .filter(|image| image_ids.contains(&image.id))
        .cloned()
        .collect();

    Ok(SubsetSelection {
        categories,
        annotations,
        images,
    })
}

/// Assemble the output collection, keeping `info` and `licenses` untouched
pub fn build_subset_collection(
    collection: &AnnotationCollection,
    selection: SubsetSelection,
) -> AnnotationCollection {
    AnnotationCollection {
        info: collection.info.clone(),
        licenses: collection.licenses.clone(),
        images: selection.images,
        annotations: selection.annotations,
        categories: selection.categories,
    }
}

/// Copy every image file from `images_dir` to `output_dir` under the same name.
///
/// Copies run on their own pool; the first failure aborts the whole batch.
pub fn copy_images(
    images: &[Image],
    images_dir: &Path,
    output_dir: &Path,
    workers: usize,
) -> Result<()> {
    ensure_directory(output_dir)?;

    // Two records may share a file; copy it once so no two threads write one destination.
    let mut seen = HashSet::new();
    let file_names: Vec<&str> = images
        .iter()
        .map(|image| image.file_name.as_str())
        .filter(|name| seen.insert(*name))
        .collect();

    // Copying a file onto itself truncates it; refuse before any copy starts.
    for file_name in &file_names {
        check_distinct_files(&images_dir.join(file_name), &output_dir.join(file_name))?;
    }

    let pool = create_io_thread_pool(workers)?;
    let pb = create_progress_bar(file_names.len() as u64, "Copy");

    let result = pool.install(|| {
        file_names.par_iter().try_for_each(|file_name| -> Result<()> {
            copy_image(file_name, images_dir, output_dir)?;
            pb.inc(1);
            Ok(())
        })
    });

    match result {
        Ok(()) => pb.finish_with_message("Image copy complete"),
        Err(_) => pb.abandon(),
    }
    result
}

fn check_distinct_files(source: &Path, dest: &Path) -> Result<()> {
    if !dest.exists() {
        return Ok(());
    }
    match (fs::canonicalize(source), fs::canonicalize(dest)) {
        (Ok(from), Ok(to)) if from == to => Err(Error::Copy {
            from: source.to_path_buf(),
            to: dest.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "source and destination are the same file",
            ),
        }),
        _ => Ok(()),
    }
}

fn copy_image(file_name: &str, images_dir: &Path, output_dir: &Path) -> Result<()> {
    let source = images_dir.join(file_name);
    let dest = output_dir.join(file_name);

    if let Some(parent) = dest.parent() {
        if parent != output_dir {
            ensure_directory(parent)?;
        }
    }

    debug!("Copying {} -> {}", source.display(), dest.display());
    fs::copy(&source, &dest).map_err(|e| Error::Copy {
        from: source,
        to: dest,
        source: e,
    })?;
    Ok(())
}

/// Run the whole extraction: read, select, copy, then write the annotation file.
///
/// The annotation file is only written once every image has been copied.
pub fn extract_subset(options: &SubsetOptions) -> Result<SubsetSummary> {
    info!("Reading annotations from {}", options.annotations.display());
    let collection = read_collection(&options.annotations)?;
    info!(
        "Loaded {} categories, {} images, {} annotations",
        collection.categories.len(),
        collection.images.len(),
        collection.annotations.len()
    );

    let selection = select_subset(&collection, &options.target_classes)?;
    let summary = SubsetSummary::from(&selection);
    info!(
        "Selected {} categories, {} annotations, {} images",
        summary.categories, summary.annotations, summary.images
    );
    for category in &selection.categories {
        debug!("Keeping category {} ({})", category.id, category.name);
    }
    if summary.images == 0 {
        warn!("The subset is empty");
    }

    if options.dry_run {
        info!("Dry run; nothing copied or written");
        return Ok(summary);
    }

    info!(
        "Copying {} images to {}",
        summary.images,
        options.output_images_dir.display()
    );
    copy_images(
        &selection.images,
        &options.images_dir,
        &options.output_images_dir,
        options.workers,
    )?;

    let subset = build_subset_collection(&collection, selection);
    if let Some(parent) = options.output_annotations.parent() {
        ensure_directory(parent)?;
    }
    write_collection(&options.output_annotations, &subset)?;
    info!("Wrote {}", options.output_annotations.display());

    Ok(summary)
}
