//! HostPack binary record formats
//!
//! Every record is encoded field-by-field as fixed-width little-endian
//! integers and floats. In-memory struct layout is never assumed to match
//! the file layout.
//!
//! # File Layout
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │ PackHeader (80 bytes, offset 0)          │  patched last
//! ├─ pad to block ───────────────────────────┤
//! │ SceneRecord (24 bytes)                   │  scene_off
//! ├─ pad to block ───────────────────────────┤
//! │ CameraTableHeader (72 bytes)             │  camera_off
//! │ fx[N] fy[N] cx[N] cy[N]        f32       │
//! │ pose[N]                        f32 × 12  │
//! │ width[N] height[N] time[N]     u32       │
//! ├─ pad to block ───────────────────────────┤
//! │ FrameRecord × N (56 bytes each)          │  frames_off, patched last
//! ├─ pad to block ───────────────────────────┤
//! │ frame 0: height × row_stride bytes       │  pixels_off == frame 0 pixel_off
//! ├─ pad to block ───────────────────────────┤
//! │ frame 1 ...                              │
//! └──────────────────────────────────────────┘  end_off == bytes_total
//! ```

mod camera;
mod frame;
mod header;
mod scene;

pub use camera::{CameraTableHeader, ColumnSpan, POSE_ELEM_SIZE};
pub use frame::FrameRecord;
pub use header::PackHeader;
pub use scene::SceneRecord;

use serde::{Deserialize, Serialize};

/// Container format constants.
#[derive(Debug, Clone, Copy)]
pub struct PackFormat {
    /// File extension without dot
    pub extension: &'static str,

    /// Magic bytes at the start of the file
    pub magic: &'static [u8; 4],

    /// Format version written by this crate (and the newest one it reads)
    pub version: u32,
}

/// HostPack format descriptor.
///
/// Single source of truth for magic bytes, version and extension.
pub const HPK_FORMAT: PackFormat = PackFormat {
    extension: "hpk",
    magic: b"HPK1",
    version: 2,
};

/// Encoding of each pixel in the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum PixelFormat {
    /// 4 interleaved 8-bit channels
    #[default]
    Rgba8 = 1,
    /// 4 interleaved little-endian f32 channels (color linearized, alpha scaled)
    Rgba32F = 2,
}

impl PixelFormat {
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Rgba8),
            2 => Some(Self::Rgba32F),
            _ => None,
        }
    }

    /// Pixel stride in bytes
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Rgba8 => 4,
            Self::Rgba32F => 16,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Rgba8 => "RGBA8",
            Self::Rgba32F => "RGBA32F",
        }
    }
}

impl std::fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Color space of the pixel payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum ColorSpace {
    #[default]
    Linear = 0,
    Srgb = 1,
}

impl ColorSpace {
    pub const fn code(self) -> u32 {
        self as u32
    }

    pub const fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Linear),
            1 => Some(Self::Srgb),
            _ => None,
        }
    }
}

/// Fixed-size binary record.
///
/// Each record also has a type-specific `to_bytes()` returning a fixed-size
/// array; the trait exists so the block writer and mapped reader can move
/// records generically.
pub trait PackRecord: Sized {
    /// Encoded size in bytes
    const SIZE: usize;

    /// Encode into exactly [`Self::SIZE`] bytes.
    fn serialize(&self) -> Vec<u8>;

    /// Decode from the front of `bytes`.
    ///
    /// Returns `None` if the slice is shorter than [`Self::SIZE`].
    fn deserialize(bytes: &[u8]) -> Option<Self>;
}

// ============================================================================
// Little-endian field helpers
// ============================================================================
//
// Callers check the slice length once against SIZE before decoding fields.

#[inline]
pub(crate) fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
pub(crate) fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(buf)
}

#[inline]
pub(crate) fn read_f32(bytes: &[u8], at: usize) -> f32 {
    f32::from_bits(read_u32(bytes, at))
}

#[inline]
pub(crate) fn put_u32(bytes: &mut [u8], at: usize, value: u32) {
    bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn put_u64(bytes: &mut [u8], at: usize, value: u64) {
    bytes[at..at + 8].copy_from_slice(&value.to_le_bytes());
}

#[inline]
pub(crate) fn put_f32(bytes: &mut [u8], at: usize, value: f32) {
    put_u32(bytes, at, value.to_bits());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hpk_format_constants() {
        assert_eq!(HPK_FORMAT.magic, b"HPK1");
        assert_eq!(HPK_FORMAT.version, 2);
        assert_eq!(HPK_FORMAT.extension, "hpk");
    }

    #[test]
    fn test_pixel_format_codes() {
        assert_eq!(PixelFormat::Rgba8.code(), 1);
        assert_eq!(PixelFormat::Rgba32F.code(), 2);
        assert_eq!(PixelFormat::from_code(2), Some(PixelFormat::Rgba32F));
        assert_eq!(PixelFormat::from_code(0), None);
        assert_eq!(PixelFormat::from_code(3), None);
    }

    #[test]
    fn test_pixel_strides() {
        assert_eq!(PixelFormat::Rgba8.bytes_per_pixel(), 4);
        assert_eq!(PixelFormat::Rgba32F.bytes_per_pixel(), 16);
    }

    #[test]
    fn test_color_space_codes() {
        assert_eq!(ColorSpace::Linear.code(), 0);
        assert_eq!(ColorSpace::Srgb.code(), 1);
        assert_eq!(ColorSpace::from_code(7), None);
    }
}
