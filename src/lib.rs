//! COCO subset toolkit
//!
//! This library extracts the images and annotations of selected categories from
//! a COCO dataset and reports per-category image counts for the result.

pub mod census;
pub mod coco;
pub mod config;
pub mod counts;
pub mod error;
pub mod subset;
pub mod utils;

// Re-export commonly used types and functions
pub use config::{CensusArgs, SubsetArgs};
pub use error::{Error, Result};

pub use coco::{read_collection, write_collection, AnnotationCollection, CocoIndex};
pub use counts::CountTable;

pub use census::{run_census, CensusOptions, CensusReport};
pub use subset::{extract_subset, select_subset, SubsetOptions, SubsetSelection, SubsetSummary};
