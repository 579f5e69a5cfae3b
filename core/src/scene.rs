//! Scene description loading (NeRF-synthetic `transforms*.json`)
//!
//! Only the fields the pack needs are read: each frame's image path and the
//! top three rows of its camera-to-world transform, plus the shared
//! intrinsics. Unknown fields are ignored.

use std::path::{Path, PathBuf};

use hostpack_common::Pose3x4;
use serde::Deserialize;

use crate::config::MetadataLocation;
use crate::error::{HostPackError, Result};

/// Candidate document names tried, in order, when no explicit path resolves
pub const DEFAULT_METADATA_NAMES: [&str; 2] = ["transforms.json", "transforms_train.json"];

/// Extension appended to `file_path`s that have none
const DEFAULT_IMAGE_EXTENSION: &str = "png";

// ============================================================================
// Document schema
// ============================================================================

#[derive(Debug, Deserialize)]
struct TransformsDocument {
    frames: Vec<TransformsFrame>,
    #[serde(default)]
    fl_x: Option<f64>,
    #[serde(default)]
    fl_y: Option<f64>,
    #[serde(default)]
    cx: Option<f64>,
    #[serde(default)]
    cy: Option<f64>,
    #[serde(default)]
    w: Option<f64>,
    #[serde(default)]
    h: Option<f64>,
    #[serde(default)]
    camera_angle_x: Option<f64>,
    #[serde(default)]
    camera_angle_y: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TransformsFrame {
    file_path: String,
    transform_matrix: Vec<Vec<f64>>,
}

// ============================================================================
// Public types
// ============================================================================

/// Intrinsics as declared by the document; any of them may be absent
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntrinsicsSpec {
    pub fl_x: Option<f32>,
    pub fl_y: Option<f32>,
    pub cx: Option<f32>,
    pub cy: Option<f32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub camera_angle_x: Option<f32>,
    pub camera_angle_y: Option<f32>,
}

/// Shared pinhole intrinsics broadcast to every camera
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Intrinsics {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
}

impl IntrinsicsSpec {
    /// Fill in what the document left out.
    ///
    /// `image_size` (usually frame 0's decoded size) stands in for a missing
    /// `w`/`h`. Focal lengths come from `fl_*`, else from the field-of-view
    /// angles, else zero; `fy` falls back to `fx`. The principal point
    /// defaults to the image centre.
    pub fn resolve(&self, image_size: (u32, u32)) -> Intrinsics {
        let w = self.width.unwrap_or(image_size.0) as f32;
        let h = self.height.unwrap_or(image_size.1) as f32;

        let focal = |extent: f32, angle: f32| 0.5 * extent / (0.5 * angle).tan();
        let fx = self
            .fl_x
            .or_else(|| self.camera_angle_x.map(|a| focal(w, a)));
        let fy = self
            .fl_y
            .or_else(|| self.camera_angle_y.map(|a| focal(h, a)))
            .or(fx);

        Intrinsics {
            fx: fx.unwrap_or(0.0),
            fy: fy.unwrap_or(0.0),
            cx: self.cx.unwrap_or(0.5 * w),
            cy: self.cy.unwrap_or(0.5 * h),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SceneFrame {
    /// Absolute (root-joined) image path
    pub image_path: PathBuf,
    pub pose: Pose3x4,
}

/// Everything the builder needs from the metadata document
#[derive(Debug, Clone, PartialEq)]
pub struct SceneDescription {
    /// Document the description was read from
    pub source: PathBuf,
    pub frames: Vec<SceneFrame>,
    pub intrinsics: IntrinsicsSpec,
}

impl SceneDescription {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn image_paths(&self) -> Vec<PathBuf> {
        self.frames.iter().map(|f| f.image_path.clone()).collect()
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Resolve the metadata document path.
///
/// An explicit path is used if it exists as given or relative to `root`;
/// otherwise (and for [`MetadataLocation::Auto`]) the default names are
/// tried in `root`.
pub fn locate_metadata(root: &Path, location: &MetadataLocation) -> Result<PathBuf> {
    if let MetadataLocation::Path(path) = location {
        if path.is_file() {
            return Ok(path.clone());
        }
        let joined = root.join(path);
        if path.is_relative() && joined.is_file() {
            return Ok(joined);
        }
        tracing::debug!(
            path = %path.display(),
            "metadata path not found, falling back to defaults"
        );
    }

    DEFAULT_METADATA_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| HostPackError::MetadataNotFound(root.to_path_buf()))
}

/// Locate, read and parse the scene description under `root`
pub fn load_scene(root: &Path, location: &MetadataLocation) -> Result<SceneDescription> {
    let path = locate_metadata(root, location)?;
    let text = std::fs::read_to_string(&path).map_err(HostPackError::io_at(&path))?;
    let scene = parse_scene(&text, root, &path)?;
    tracing::info!(
        source = %path.display(),
        frames = scene.len(),
        "loaded scene description"
    );
    Ok(scene)
}

/// Parse a document already in memory. `source` is only used for error context.
pub fn parse_scene(text: &str, root: &Path, source: &Path) -> Result<SceneDescription> {
    let doc: TransformsDocument =
        serde_json::from_str(text).map_err(|e| HostPackError::MetadataParse {
            path: source.to_path_buf(),
            source: e,
        })?;

    let frames = doc
        .frames
        .iter()
        .enumerate()
        .map(|(index, frame)| {
            Ok(SceneFrame {
                image_path: image_path(root, &frame.file_path),
                pose: pose_from_matrix(&frame.transform_matrix).ok_or_else(|| {
                    HostPackError::BadConfig(format!(
                        "frame {index} ({}): transform_matrix needs at least 3 rows of 4 values",
                        frame.file_path
                    ))
                })?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let to_u32 = |v: f64| (1.0..=u32::MAX as f64).contains(&v).then_some(v as u32);

    Ok(SceneDescription {
        source: source.to_path_buf(),
        frames,
        intrinsics: IntrinsicsSpec {
            fl_x: doc.fl_x.map(|v| v as f32),
            fl_y: doc.fl_y.map(|v| v as f32),
            cx: doc.cx.map(|v| v as f32),
            cy: doc.cy.map(|v| v as f32),
            width: doc.w.and_then(to_u32),
            height: doc.h.and_then(to_u32),
            camera_angle_x: doc.camera_angle_x.map(|v| v as f32),
            camera_angle_y: doc.camera_angle_y.map(|v| v as f32),
        },
    })
}

fn image_path(root: &Path, file_path: &str) -> PathBuf {
    let mut path = root.join(file_path);
    if path.extension().is_none() {
        path.set_extension(DEFAULT_IMAGE_EXTENSION);
    }
    path
}

/// Top three rows of a row-major 4x4 (extra rows/columns ignored)
fn pose_from_matrix(rows: &[Vec<f64>]) -> Option<Pose3x4> {
    let row = |r: usize| -> Option<[f32; 4]> {
        let values = rows.get(r)?;
        if values.len() < 4 {
            return None;
        }
        Some([
            values[0] as f32,
            values[1] as f32,
            values[2] as f32,
            values[3] as f32,
        ])
    };
    Some(Pose3x4::from_rows(row(0)?, row(1)?, row(2)?))
}
