//! COCO format data structures and lookups
//!
//! This module defines the annotation collection shared by the subset extractor
//! and the category census, together with the id indexes both tools use to
//! resolve cross-references.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// COCO category information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supercategory: Option<String>,
    /// Any further fields (e.g. keypoint names), kept verbatim and in order
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Category {
    pub fn new(id: u64, name: &str, supercategory: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            supercategory: Some(supercategory.to_string()),
            extra: Map::new(),
        }
    }
}

/// COCO image information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: u64,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    /// license, coco_url, flickr_url, date_captured, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Image {
    pub fn new(id: u64, file_name: &str, width: u32, height: u32) -> Self {
        Self {
            id,
            file_name: file_name.to_string(),
            width,
            height,
            extra: Map::new(),
        }
    }
}

/// COCO annotation information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u64,
    /// bbox, area, iscrowd, segmentation, ...
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Annotation {
    pub fn new(id: u64, image_id: u64, category_id: u64) -> Self {
        Self {
            id,
            image_id,
            category_id,
            extra: Map::new(),
        }
    }
}

/// Complete COCO annotation file
///
/// `info` and `licenses` are never interpreted, only carried from input to output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationCollection {
    pub info: Value,
    pub licenses: Value,
    pub images: Vec<Image>,
    pub annotations: Vec<Annotation>,
    pub categories: Vec<Category>,
}

impl AnnotationCollection {
    /// Verify that every annotation resolves its image and its category.
    ///
    /// Returns the first dangling reference found, in annotation order.
    pub fn check_references(&self) -> Result<()> {
        let index = CocoIndex::build(self)?;
        for annotation in &self.annotations {
            if index.image(annotation.image_id).is_none() {
                return Err(Error::DanglingReference {
                    annotation_id: annotation.id,
                    kind: "image",
                    id: annotation.image_id,
                });
            }
            if index.category(annotation.category_id).is_none() {
                return Err(Error::DanglingReference {
                    annotation_id: annotation.id,
                    kind: "category",
                    id: annotation.category_id,
                });
            }
        }
        Ok(())
    }
}

/// Id lookups over a collection, built once per run
#[derive(Debug)]
pub struct CocoIndex<'a> {
    categories: HashMap<u64, &'a Category>,
    images: HashMap<u64, &'a Image>,
}

impl<'a> CocoIndex<'a> {
    /// Index categories and images by id, rejecting duplicate ids
    pub fn build(collection: &'a AnnotationCollection) -> Result<Self> {
        let mut categories = HashMap::with_capacity(collection.categories.len());
        for category in &collection.categories {
            if categories.insert(category.id, category).is_some() {
                return Err(Error::DuplicateId {
                    kind: "category",
                    id: category.id,
                });
            }
        }

        let mut images = HashMap::with_capacity(collection.images.len());
        for image in &collection.images {
            if images.insert(image.id, image).is_some() {
                return Err(Error::DuplicateId {
                    kind: "image",
                    id: image.id,
                });
            }
        }

        Ok(Self { categories, images })
    }

    pub fn category(&self, id: u64) -> Option<&'a Category> {
        self.categories.get(&id).copied()
    }

    pub fn image(&self, id: u64) -> Option<&'a Image> {
        self.images.get(&id).copied()
    }
}

/// Read and parse a COCO annotation file
pub fn read_collection(path: &Path) -> Result<AnnotationCollection> {
    let file = File::open(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;

    serde_json::from_reader(BufReader::new(file)).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Serialize a collection as compact JSON
pub fn write_collection(path: &Path, collection: &AnnotationCollection) -> Result<()> {
    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(path).map_err(write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, collection)
        .map_err(std::io::Error::from)
        .map_err(write_err)?;
    writer.flush().map_err(write_err)
}
