use coco_subset::coco::{read_collection, write_collection, AnnotationCollection};
use coco_subset::subset::{build_subset_collection, copy_images, select_subset};
use coco_subset::{extract_subset, Error, SubsetOptions};
use serde_json::json;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

fn animals() -> AnnotationCollection {
    serde_json::from_value(json!({
        "info": {"description": "animals", "year": 2017},
        "licenses": [{"id": 1, "name": "CC", "url": "http://example.com"}],
        "images": [
            {"id": 10, "file_name": "10.jpg", "width": 640, "height": 480, "license": 1},
            {"id": 11, "file_name": "11.jpg", "width": 640, "height": 480, "license": 1},
            {"id": 12, "file_name": "12.jpg", "width": 320, "height": 240, "license": 1}
        ],
        "annotations": [
            {"id": 1, "image_id": 10, "category_id": 1, "bbox": [1.5, 2.0, 30.0, 40.25], "area": 1207.5, "iscrowd": 0},
            {"id": 2, "image_id": 11, "category_id": 2, "bbox": [0, 0, 5, 5], "area": 25, "iscrowd": 0},
            {"id": 3, "image_id": 12, "category_id": 3, "bbox": [3, 3, 8, 8], "area": 64, "iscrowd": 0}
        ],
        "categories": [
            {"id": 1, "name": "cat", "supercategory": "animal"},
            {"id": 2, "name": "dog", "supercategory": "animal"},
            {"id": 3, "name": "bird", "supercategory": "animal"}
        ]
    }))
    .unwrap()
}

fn targets(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn write_images(dir: &Path, collection: &AnnotationCollection) {
    fs::create_dir_all(dir).unwrap();
    for image in &collection.images {
        fs::write(dir.join(&image.file_name), format!("pixels of {}", image.id)).unwrap();
    }
}

fn options(root: &Path, output: &str, target_classes: Vec<String>) -> SubsetOptions {
    SubsetOptions {
        annotations: root.join("annotations/instances_train2017.json"),
        images_dir: root.join("train2017"),
        output_annotations: root.join(output).join("annotations/subset.json"),
        output_images_dir: root.join(output).join("images"),
        target_classes,
        workers: 2,
        dry_run: false,
    }
}

fn setup_dataset(root: &Path) -> AnnotationCollection {
    let collection = animals();
    fs::create_dir_all(root.join("annotations")).unwrap();
    write_collection(&root.join("annotations/instances_train2017.json"), &collection).unwrap();
    write_images(&root.join("train2017"), &collection);
    collection
}

#[test]
fn test_select_cat_and_bird() {
    let collection = animals();
    let selection = select_subset(&collection, &targets(&["cat", "bird"])).unwrap();

    let category_ids: Vec<u64> = selection.categories.iter().map(|c| c.id).collect();
    let annotation_ids: Vec<u64> = selection.annotations.iter().map(|a| a.id).collect();
    let image_ids: Vec<u64> = selection.images.iter().map(|i| i.id).collect();

    assert_eq!(category_ids, vec![1, 3]);
    assert_eq!(annotation_ids, vec![1, 3]);
    assert_eq!(image_ids, vec![10, 12]);
    assert_eq!(selection.categories[1].name, "bird");
}

#[test]
fn test_selection_is_referentially_closed() {
    let mut collection = animals();
    // a second cat in the dog image, and a second cat in the first image
    let mut extra = collection.annotations[0].clone();
    extra.id = 4;
    extra.image_id = 11;
    collection.annotations.push(extra);
    let mut extra = collection.annotations[0].clone();
    extra.id = 5;
    collection.annotations.push(extra);

    let selection = select_subset(&collection, &targets(&["cat"])).unwrap();
    let subset = build_subset_collection(&collection, selection);

    assert!(subset.categories.iter().all(|c| c.name == "cat"));
    subset.check_references().unwrap();

    let referenced: HashSet<u64> = subset.annotations.iter().map(|a| a.image_id).collect();
    let images: HashSet<u64> = subset.images.iter().map(|i| i.id).collect();
    assert_eq!(referenced, images);
    assert_eq!(subset.images.len(), 2);
}

#[test]
fn test_names_are_case_sensitive() {
    let collection = animals();
    let selection = select_subset(&collection, &targets(&["Cat", "unicorn"])).unwrap();

    assert!(selection.categories.is_empty());
    assert!(selection.annotations.is_empty());
    assert!(selection.images.is_empty());
}

#[test]
fn test_missing_image_record_is_an_error() {
    let mut collection = animals();
    collection.images.retain(|image| image.id != 12);

    let err = select_subset(&collection, &targets(&["bird"])).unwrap_err();
    assert!(matches!(
        err,
        Error::DanglingReference {
            annotation_id: 3,
            kind: "image",
            id: 12
        }
    ));

    // the dangling annotation is irrelevant when its category is not selected
    assert!(select_subset(&collection, &targets(&["cat"])).is_ok());
}

#[test]
fn test_subset_keeps_metadata_and_extra_fields() {
    let collection = animals();
    let selection = select_subset(&collection, &targets(&["cat"])).unwrap();
    let subset = build_subset_collection(&collection, selection);

    assert_eq!(subset.info, collection.info);
    assert_eq!(subset.licenses, collection.licenses);
    assert_eq!(subset.images[0].extra["license"], json!(1));
    assert_eq!(
        subset.annotations[0].extra["bbox"],
        json!([1.5, 2.0, 30.0, 40.25])
    );
}

#[test]
fn test_extract_subset_end_to_end() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    setup_dataset(root);

    let opts = options(root, "coco10", targets(&["cat", "bird"]));
    let summary = extract_subset(&opts).unwrap();
    assert_eq!(summary.categories, 2);
    assert_eq!(summary.annotations, 2);
    assert_eq!(summary.images, 2);

    let subset = read_collection(&opts.output_annotations).unwrap();
    subset.check_references().unwrap();
    let names: Vec<&str> = subset.categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["cat", "bird"]);

    let copied = fs::read_to_string(opts.output_images_dir.join("12.jpg")).unwrap();
    assert_eq!(copied, "pixels of 12");
    assert!(opts.output_images_dir.join("10.jpg").exists());
    assert!(!opts.output_images_dir.join("11.jpg").exists());
}

#[test]
fn test_extract_subset_is_idempotent() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    setup_dataset(root);

    let first = options(root, "run1", targets(&["cat", "dog", "bird"]));
    let second = options(root, "run2", targets(&["cat", "dog", "bird"]));
    extract_subset(&first).unwrap();
    extract_subset(&second).unwrap();
    // running again over an existing output directory is fine too
    extract_subset(&second).unwrap();

    assert_eq!(
        fs::read(&first.output_annotations).unwrap(),
        fs::read(&second.output_annotations).unwrap()
    );
    for name in ["10.jpg", "11.jpg", "12.jpg"] {
        assert_eq!(
            fs::read(first.output_images_dir.join(name)).unwrap(),
            fs::read(second.output_images_dir.join(name)).unwrap()
        );
    }
}

#[test]
fn test_missing_source_image_aborts_before_writing_annotations() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    setup_dataset(root);
    fs::remove_file(root.join("train2017/12.jpg")).unwrap();

    let opts = options(root, "coco10", targets(&["cat", "bird"]));
    let err = extract_subset(&opts).unwrap_err();

    match err {
        Error::Copy { from, .. } => assert!(from.ends_with("12.jpg")),
        other => panic!("unexpected error: {}", other),
    }
    assert!(!opts.output_annotations.exists());
}

#[test]
fn test_dry_run_writes_nothing() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    setup_dataset(root);

    let mut opts = options(root, "coco10", targets(&["dog"]));
    opts.dry_run = true;
    let summary = extract_subset(&opts).unwrap();

    assert_eq!(summary.images, 1);
    assert!(!root.join("coco10").exists());
}

#[test]
fn test_unreadable_input_is_a_read_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let opts = options(temp_dir.path(), "coco10", targets(&["cat"]));

    assert!(matches!(extract_subset(&opts), Err(Error::Read { .. })));
}

#[test]
fn test_input_missing_categories_is_a_parse_error() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("annotations")).unwrap();
    fs::write(
        root.join("annotations/instances_train2017.json"),
        r#"{"info": {}, "licenses": [], "images": [], "annotations": []}"#,
    )
    .unwrap();

    let opts = options(root, "coco10", targets(&["cat"]));
    assert!(matches!(extract_subset(&opts), Err(Error::Parse { .. })));
}

#[test]
fn test_copy_images_shares_destination_once() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    let mut collection = animals();
    write_images(&root.join("src"), &collection);

    let mut twin = collection.images[0].clone();
    twin.id = 99;
    collection.images.push(twin);

    copy_images(&collection.images, &root.join("src"), &root.join("dst"), 0).unwrap();
    let copied = fs::read_dir(root.join("dst")).unwrap().count();
    assert_eq!(copied, 3);
}

#[test]
fn test_unmatched_targets_still_write_an_empty_subset() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    let collection = setup_dataset(root);

    let opts = options(root, "coco10", targets(&["unicorn"]));
    let summary = extract_subset(&opts).unwrap();
    assert_eq!(summary.images, 0);

    assert!(opts.output_images_dir.is_dir());
    assert_eq!(fs::read_dir(&opts.output_images_dir).unwrap().count(), 0);

    let subset = read_collection(&opts.output_annotations).unwrap();
    assert!(subset.images.is_empty());
    assert!(subset.annotations.is_empty());
    assert!(subset.categories.is_empty());
    assert_eq!(subset.info, collection.info);
    assert_eq!(subset.licenses, collection.licenses);
}

#[test]
fn test_copy_into_source_directory_is_refused() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    setup_dataset(root);
    fs::write(root.join("train2017/10.jpg"), b"JPEGDATA").unwrap();

    let mut opts = options(root, "coco10", targets(&["cat"]));
    opts.output_images_dir = root.join("train2017");

    let err = extract_subset(&opts).unwrap_err();
    assert!(matches!(err, Error::Copy { .. }));
    assert_eq!(fs::read(root.join("train2017/10.jpg")).unwrap(), b"JPEGDATA");
    assert!(!opts.output_annotations.exists());
}

#[test]
fn test_categories_are_written_back_unchanged() {
    let temp_dir = tempfile::tempdir().unwrap();
    let root = temp_dir.path();
    let source = r#"{"info":{"year":2017,"description":"d"},"licenses":[],"images":[{"id":1,"file_name":"1.jpg","width":2,"height":2,"license":3,"coco_url":"u"}],"annotations":[{"id":5,"image_id":1,"category_id":1,"segmentation":[[0,0,1,1]],"area":1,"iscrowd":0,"bbox":[0,0,1,1]}],"categories":[{"id":1,"name":"cat"}]}"#;
    fs::write(root.join("in.json"), source).unwrap();

    let collection = read_collection(&root.join("in.json")).unwrap();
    assert_eq!(collection.categories[0].supercategory, None);

    write_collection(&root.join("out.json"), &collection).unwrap();
    assert_eq!(fs::read_to_string(root.join("out.json")).unwrap(), source);
}
