use std::fs;
use std::path::Path;

use anyhow::Result;
use damage_scan::dataset::DatasetConverter;
use image::{Rgb, RgbImage};
use tempfile::tempdir;

fn write_image(path: &Path, width: u32, height: u32) -> Result<()> {
    fs::create_dir_all(path.parent().expect("image path has a parent"))?;
    RgbImage::from_pixel(width, height, Rgb([90, 90, 90])).save(path)?;
    Ok(())
}

fn write_annotations(path: &Path, json: &str) -> Result<()> {
    fs::create_dir_all(path.parent().expect("annotation path has a parent"))?;
    fs::write(path, json)?;
    Ok(())
}

#[test]
fn converts_train_split_to_yolo_layout() -> Result<()> {
    let dir = tempdir()?;
    let dataset = dir.path().join("vehide");
    let output = dir.path().join("yolo");

    write_image(&dataset.join("images/train/car1.png"), 200, 100)?;
    write_annotations(
        &dataset.join("annotations/train.json"),
        r#"[
            {
                "filename": "car1.png",
                "damages": [
                    { "type": "dent", "bbox": [50.0, 25.0, 150.0, 75.0] },
                    { "type": "crack", "bbox": [0.0, 0.0, 100.0, 50.0] }
                ]
            }
        ]"#,
    )?;

    let converter = DatasetConverter::new(&dataset, &output);
    let summary = converter.convert()?;

    let train = summary.splits[0].1.expect("train split converted");
    assert_eq!(train.images, 1);
    assert_eq!(train.labels, 2);
    assert_eq!(train.skipped_images, 0);
    assert_eq!(train.skipped_annotations, 0);

    assert!(output.join("train/images/car1.png").exists());
    let labels = fs::read_to_string(output.join("train/labels/car1.txt"))?;
    let lines: Vec<&str> = labels.lines().collect();
    assert_eq!(lines.len(), 2);
    // dent: class 1, centered box half the image in each dimension
    assert_eq!(lines[0], "1 0.5 0.5 0.5 0.5");
    // crack: class 2, top-left quadrant
    assert_eq!(lines[1], "2 0.25 0.25 0.5 0.5");

    let yaml = fs::read_to_string(converter.data_yaml_path())?;
    assert!(yaml.contains("nc: 10"));
    assert!(yaml.contains("train: train/images"));
    assert!(yaml.contains("'broken_part'"));
    Ok(())
}

#[test]
fn alias_fields_and_unknown_classes_are_handled() -> Result<()> {
    let dir = tempdir()?;
    let dataset = dir.path().join("vehide");
    let output = dir.path().join("yolo");

    write_image(&dataset.join("images/val/car2.png"), 100, 100)?;
    write_annotations(
        &dataset.join("annotations/val.json"),
        r#"[
            {
                "image_name": "car2.png",
                "annotations": [
                    { "class": "rust", "bounding_box": [10.0, 10.0, 30.0, 30.0] },
                    { "class": "meteor_strike", "bounding_box": [0.0, 0.0, 10.0, 10.0] }
                ]
            }
        ]"#,
    )?;

    let summary = DatasetConverter::new(&dataset, &output).convert()?;
    let val = summary.splits[1].1.expect("val split converted");
    assert_eq!(val.images, 1);
    assert_eq!(val.labels, 1);
    assert_eq!(val.skipped_annotations, 1);

    let labels = fs::read_to_string(output.join("val/labels/car2.txt"))?;
    assert!(labels.starts_with("8 "));
    Ok(())
}

#[test]
fn missing_images_are_skipped_not_fatal() -> Result<()> {
    let dir = tempdir()?;
    let dataset = dir.path().join("vehide");
    let output = dir.path().join("yolo");

    write_annotations(
        &dataset.join("annotations/train.json"),
        r#"[ { "filename": "ghost.png", "damages": [] } ]"#,
    )?;

    let summary = DatasetConverter::new(&dataset, &output).convert()?;
    let train = summary.splits[0].1.expect("train split converted");
    assert_eq!(train.images, 0);
    assert_eq!(train.skipped_images, 1);
    Ok(())
}

#[test]
fn missing_dataset_root_is_an_error() {
    let result = DatasetConverter::new("/nonexistent/vehide", "/tmp/out").convert();
    assert!(result.is_err());
}
