use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use coco_subset::{run_census, CensusArgs};

fn main() -> Result<()> {
    // Initialize the logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = CensusArgs::parse();

    let options = args
        .to_options()
        .context("failed to load category counts")?;
    let report = run_census(&options).context("category census failed")?;

    info!("Census complete: {} categories reported", report.rows.len());
    Ok(())
}
