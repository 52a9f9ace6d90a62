use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use coco_subset::{extract_subset, SubsetArgs};

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = SubsetArgs::parse();
    let options = args.to_options();

    info!(
        "Extracting {} target classes from {}",
        options.target_classes.len(),
        options.annotations.display()
    );

    let summary = extract_subset(&options).context("subset extraction failed")?;
    info!(
        "Subset complete: {} categories, {} images, {} annotations",
        summary.categories, summary.images, summary.annotations
    );
    Ok(())
}
