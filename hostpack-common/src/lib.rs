//! Shared types and utilities for the HostPack container
//!
//! This crate provides the on-disk vocabulary shared between:
//! - `hostpack-core` (builder + mapped reader)
//! - `hostpack-cli` (command-line front end)
//!
//! # Modules
//!
//! - [`packing`] - Scalar codec (alignment rounding, sRGB → linear LUT, row encoding)
//! - [`formats`] - Fixed-width record layouts (header, scene, camera SOA, frame table)
//! - [`math`] - POD pose and bounding-box types

pub mod formats;
pub mod math;
pub mod packing;

// Re-export commonly used packing items
pub use packing::{
    Alignment, AlignmentError, RowEncodeError, RowEncoder, SrgbLut, round_up_pow2,
    srgb_to_linear, srgb_to_linear_lut,
};

// Re-export commonly used format items
pub use formats::{
    CameraTableHeader, ColorSpace, ColumnSpan, FrameRecord, HPK_FORMAT, POSE_ELEM_SIZE,
    PackFormat, PackHeader, PackRecord, PixelFormat, SceneRecord,
};

pub use math::{Aabb, Pose3x4};
