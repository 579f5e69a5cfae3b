//! Dataset fixtures for integration tests
//!
//! Writes small PNG frames plus a `transforms.json` into a temp directory.

#![allow(dead_code)]

use std::path::Path;

use image::{Rgba, RgbaImage};
use tempfile::{TempDir, tempdir};

/// Identity 4x4 transform as JSON rows
const IDENTITY: &str = "[[1,0,0,0],[0,1,0,0],[0,0,1,0],[0,0,0,1]]";

/// Deterministic pixel for frame `frame` at (`x`, `y`)
pub fn pixel(frame: usize, x: u32, y: u32) -> [u8; 4] {
    [
        (x * 40) as u8,
        (y * 40) as u8,
        (frame * 100) as u8,
        255 - frame as u8,
    ]
}

pub fn write_frame(path: &Path, frame: usize, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| Rgba(pixel(frame, x, y)));
    img.save(path).expect("Failed to write PNG fixture");
}

/// Dataset with one `r_<i>.png` per size, intrinsics fx=fy=100, cx=cy=2
/// and identity poses. `file_path`s omit the extension.
pub fn write_dataset(sizes: &[(u32, u32)]) -> TempDir {
    let dir = tempdir().expect("Failed to create temp dir");
    write_dataset_in(dir.path(), "transforms.json", sizes);
    dir
}

pub fn write_dataset_in(root: &Path, metadata_name: &str, sizes: &[(u32, u32)]) {
    let frames: Vec<String> = sizes
        .iter()
        .enumerate()
        .map(|(i, &(w, h))| {
            write_frame(&root.join(format!("r_{i}.png")), i, w, h);
            format!(r#"{{"file_path": "./r_{i}", "transform_matrix": {IDENTITY}}}"#)
        })
        .collect();

    let doc = format!(
        r#"{{"fl_x": 100.0, "fl_y": 100.0, "cx": 2.0, "cy": 2.0, "frames": [{}]}}"#,
        frames.join(",")
    );
    std::fs::write(root.join(metadata_name), doc).expect("Failed to write metadata");
}
