//! Build configuration
//!
//! [`BuildConfig`] is the user-facing, serde-friendly form (CLI flags or a
//! TOML file). [`BuildConfig::validate`] checks it once, before any file is
//! touched, and yields a [`ValidatedConfig`] whose alignments are already
//! proven to be powers of two.
//!
//! ```toml
//! dataset_root = "data/lego"
//! metadata = "auto"
//! pixel_format = "rgba32f"
//! row_align = 64
//! block_align = 4096
//! threads = 0
//! ```

use std::path::{Path, PathBuf};

use hostpack_common::{Aabb, Alignment, PixelFormat};
use serde::{Deserialize, Serialize};

use crate::error::{HostPackError, Result};

pub const DEFAULT_ROW_ALIGN: u32 = 16;
pub const DEFAULT_BLOCK_ALIGN: u32 = 4096;

/// Where to find the scene metadata document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MetadataLocation {
    /// Look for `transforms.json`, then `transforms_train.json`, in the dataset root
    #[default]
    Auto,
    /// Explicit document path (falls back to auto-discovery if it does not exist)
    Path(PathBuf),
}

impl MetadataLocation {
    pub fn parse(value: &str) -> Self {
        if value.is_empty() || value.eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Path(PathBuf::from(value))
        }
    }
}

impl From<String> for MetadataLocation {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<MetadataLocation> for String {
    fn from(value: MetadataLocation) -> Self {
        match value {
            MetadataLocation::Auto => "auto".to_string(),
            MetadataLocation::Path(path) => path.to_string_lossy().into_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    /// Directory that frame `file_path`s are relative to
    pub dataset_root: PathBuf,

    pub metadata: MetadataLocation,

    pub pixel_format: PixelFormat,

    /// Row stride alignment in bytes (power of two)
    pub row_align: u32,

    /// Section and frame alignment in bytes (power of two)
    pub block_align: u32,

    /// Decode workers; 0 = all available hardware parallelism
    pub threads: u32,

    /// Scene bounds written to the scene record
    pub aabb_min: [f32; 3],
    pub aabb_max: [f32; 3],
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from("."),
            metadata: MetadataLocation::Auto,
            pixel_format: PixelFormat::Rgba8,
            row_align: DEFAULT_ROW_ALIGN,
            block_align: DEFAULT_BLOCK_ALIGN,
            threads: 0,
            aabb_min: Aabb::UNIT.min,
            aabb_max: Aabb::UNIT.max,
        }
    }
}

impl BuildConfig {
    pub fn new(dataset_root: impl Into<PathBuf>, metadata: MetadataLocation) -> Self {
        Self {
            dataset_root: dataset_root.into(),
            metadata,
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| HostPackError::BadConfig(e.to_string()))
    }

    /// Load a config file. Relative `dataset_root`s resolve against the file's directory.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(HostPackError::io_at(path))?;
        let mut config = Self::from_toml_str(&text)?;
        if config.dataset_root.is_relative() {
            if let Some(dir) = path.parent() {
                config.dataset_root = dir.join(&config.dataset_root);
            }
        }
        Ok(config)
    }

    /// Check everything that can be checked without touching the filesystem
    pub fn validate(&self) -> Result<ValidatedConfig> {
        let row_align = Alignment::new(self.row_align)?;
        let block_align = Alignment::new(self.block_align)?;

        let aabb = Aabb::new(self.aabb_min, self.aabb_max);
        if !aabb.is_valid() {
            return Err(HostPackError::BadConfig(format!(
                "scene bounds min {:?} exceed max {:?}",
                aabb.min, aabb.max
            )));
        }

        Ok(ValidatedConfig {
            dataset_root: self.dataset_root.clone(),
            metadata: self.metadata.clone(),
            pixel_format: self.pixel_format,
            row_align,
            block_align,
            threads: self.threads,
            aabb,
        })
    }
}

/// Configuration that passed [`BuildConfig::validate`]
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedConfig {
    pub dataset_root: PathBuf,
    pub metadata: MetadataLocation,
    pub pixel_format: PixelFormat,
    pub row_align: Alignment,
    pub block_align: Alignment,
    pub threads: u32,
    pub aabb: Aabb,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.pixel_format, PixelFormat::Rgba8);
        assert_eq!(config.row_align, 16);
        assert_eq!(config.block_align, 4096);
        assert_eq!(config.threads, 0);
        assert_eq!(config.metadata, MetadataLocation::Auto);
    }

    #[test]
    fn test_validate_rejects_non_pow2_block_align() {
        let config = BuildConfig {
            block_align: 3,
            ..BuildConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadConfig);
    }

    #[test]
    fn test_validate_rejects_zero_row_align() {
        let config = BuildConfig {
            row_align: 0,
            ..BuildConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::BadConfig);
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = BuildConfig {
            aabb_min: [1.0, 0.0, 0.0],
            aabb_max: [0.0, 1.0, 1.0],
            ..BuildConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::BadConfig);
    }

    #[test]
    fn test_metadata_location_parse() {
        assert_eq!(MetadataLocation::parse("auto"), MetadataLocation::Auto);
        assert_eq!(MetadataLocation::parse("AUTO"), MetadataLocation::Auto);
        assert_eq!(
            MetadataLocation::parse("scene/transforms_test.json"),
            MetadataLocation::Path(PathBuf::from("scene/transforms_test.json"))
        );
    }

    #[test]
    fn test_from_toml() {
        let config = BuildConfig::from_toml_str(
            r#"
            dataset_root = "data/lego"
            metadata = "transforms_val.json"
            pixel_format = "rgba32f"
            row_align = 64
            threads = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.dataset_root, PathBuf::from("data/lego"));
        assert_eq!(
            config.metadata,
            MetadataLocation::Path(PathBuf::from("transforms_val.json"))
        );
        assert_eq!(config.pixel_format, PixelFormat::Rgba32F);
        assert_eq!(config.row_align, 64);
        assert_eq!(config.block_align, DEFAULT_BLOCK_ALIGN);
        assert_eq!(config.threads, 4);
    }

    #[test]
    fn test_from_toml_rejects_unknown_keys() {
        let err = BuildConfig::from_toml_str("row_alignment = 8").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadConfig);
    }

    #[test]
    fn test_from_toml_file_resolves_relative_root() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("build.toml");
        std::fs::write(&path, "dataset_root = \"lego\"\nblock_align = 512\n").unwrap();

        let config = BuildConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.dataset_root, dir.path().join("lego"));
        assert_eq!(config.block_align, 512);
    }
}
