//! Category census
//!
//! Relabels an externally computed per-category image count table with the
//! category names of a (filtered) annotation file and writes it as CSV.

use log::{debug, info};
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::coco::{read_collection, AnnotationCollection};
use crate::counts::CountTable;
use crate::error::{Error, Result};

pub const CSV_HEADER: [&str; 2] = ["category", "count"];

#[derive(Debug, Clone)]
pub struct CensusOptions {
    pub annotations: PathBuf,
    pub output: PathBuf,
    pub counts: CountTable,
    pub verify: bool,
}

/// Outcome of a census run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CensusReport {
    /// `(category name, count)` in count table order
    pub rows: Vec<(String, u64)>,
    pub image_count: usize,
    pub annotation_count: usize,
}

/// Map category ids to names; ids must be unique
pub fn category_names(collection: &AnnotationCollection) -> Result<HashMap<u64, String>> {
    let mut names = HashMap::with_capacity(collection.categories.len());
    for category in &collection.categories {
        if names.insert(category.id, category.name.clone()).is_some() {
            return Err(Error::DuplicateId {
                kind: "category",
                id: category.id,
            });
        }
    }
    Ok(names)
}

/// Replace the ids of `counts` with category names.
///
/// An id without a category fails the whole census. Ids sharing a name end up
/// in one row, placed where the name first appeared, holding the last count.
pub fn relabel_counts(
    names: &HashMap<u64, String>,
    counts: &CountTable,
) -> Result<Vec<(String, u64)>> {
    let mut rows: Vec<(String, u64)> = Vec::with_capacity(counts.len());
    for (id, count) in counts.iter() {
        let name = names.get(&id).ok_or(Error::UnknownCategory { id })?;
        match rows.iter_mut().find(|(existing, _)| existing == name) {
            Some(row) => row.1 = count,
            None => rows.push((name.clone(), count)),
        }
    }
    Ok(rows)
}

/// Write the `category,count` report to `sink`.
///
/// Fields are never quoted, so names containing a comma or a line break are
/// refused before anything is written.
pub fn write_rows<W: Write>(sink: W, rows: &[(String, u64)]) -> Result<W> {
    check_names(rows)?;

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Never)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(sink);
    writer.write_record(CSV_HEADER)?;
    for (name, count) in rows {
        writer.write_record([name.as_str(), count.to_string().as_str()])?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Csv(e.into_error().into()))
}

fn check_names(rows: &[(String, u64)]) -> Result<()> {
    match rows
        .iter()
        .find(|(name, _)| name.contains([',', '\n', '\r']))
    {
        Some((name, _)) => Err(Error::UnrepresentableName { name: name.clone() }),
        None => Ok(()),
    }
}

/// Render the report as a string
pub fn render_csv(rows: &[(String, u64)]) -> Result<String> {
    let bytes = write_rows(Vec::new(), rows)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn write_csv(path: &Path, rows: &[(String, u64)]) -> Result<()> {
    // refuse bad names before the file is created
    check_names(rows)?;
    let file = File::create(path).map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;
    write_rows(file, rows)?;
    Ok(())
}

/// Read the annotation file, write the CSV report and count images and annotations
pub fn run_census(options: &CensusOptions) -> Result<CensusReport> {
    info!("Reading annotations from {}", options.annotations.display());
    let collection = read_collection(&options.annotations)?;

    if options.verify {
        collection.check_references()?;
        info!("All annotations resolve to an image and a category");
    }

    let names = category_names(&collection)?;
    for category in &collection.categories {
        debug!("Category {}: {}", category.id, category.name);
    }

    let rows = relabel_counts(&names, &options.counts)?;
    write_csv(&options.output, &rows)?;
    info!(
        "Wrote {} category rows to {}",
        rows.len(),
        options.output.display()
    );

    let report = CensusReport {
        rows,
        image_count: collection.images.len(),
        annotation_count: collection.annotations.len(),
    };
    info!("Number of images: {}", report.image_count);
    info!("Number of annotations: {}", report.annotation_count);

    Ok(report)
}
