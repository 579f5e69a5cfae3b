//! HostPack Core - pack builder and memory-mapped reader
//!
//! Turns an image directory plus camera metadata into a single block-aligned
//! `.hpk` container, and reads it back as zero-copy views.
//!
//! # Architecture
//!
//! - [`BuildConfig`] - Build options, validated once before any I/O
//! - [`PackBuilder`] - Scene ingest, parallel decode and section layout
//! - [`PackReader`] - Read-only mapping with open-time validation
//! - [`ImageView`] / [`CameraSoaView`] - Borrowed views into a mapped pack
//!
//! The on-disk records themselves live in `hostpack-common`.

pub mod builder;
pub mod config;
pub mod decode;
pub mod decoder;
pub mod error;
pub mod reader;
pub mod scene;
pub mod view;
pub mod writer;

pub use builder::{BuildPhase, BuildSummary, PackBuilder, PackLayout, build_hostpack};
pub use config::{BuildConfig, MetadataLocation, ValidatedConfig};
pub use decode::{decode_all, resolve_workers};
pub use decoder::{DecodeError, DecodedImage, ImageCrateDecoder, ImageDecoder};
pub use error::{ErrorKind, HostPackError, Result};
pub use reader::{PackIndex, PackReader};
pub use scene::{Intrinsics, IntrinsicsSpec, SceneDescription, SceneFrame, load_scene};
pub use view::{CameraSoaView, ImageView, Roi};
pub use writer::{BlockWriter, Reservation};

// Re-export the format types most callers need alongside the reader
pub use hostpack_common::{Aabb, ColorSpace, HPK_FORMAT, PixelFormat, Pose3x4};
