//! Container header (80 bytes at offset 0)
//!
//! # Layout
//! ```text
//! 0x00: magic [u8; 4]      "HPK1"
//! 0x04: version u32
//! 0x08: flags u32          reserved, 0
//! 0x0C: reserved u32
//! 0x10: scene_off u64
//! 0x18: camera_off u64
//! 0x20: frames_off u64
//! 0x28: pixels_off u64
//! 0x30: end_off u64
//! 0x38: bytes_total u64
//! 0x40: pixel_format u32   1 = RGBA8, 2 = RGBA32F
//! 0x44: color_space u32    0 = Linear, 1 = sRGB
//! 0x48: caps_bits u64
//! ```

use super::{PackRecord, PixelFormat, put_u32, put_u64, read_u32, read_u64};
use crate::formats::{ColorSpace, HPK_FORMAT};

/// Container header.
///
/// `pixel_format` and `color_space` are kept as raw codes: a header decoded
/// from an untrusted file may carry values this crate does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PackHeader {
    pub magic: [u8; 4],
    pub version: u32,
    pub flags: u32,
    pub reserved: u32,
    pub scene_off: u64,
    pub camera_off: u64,
    pub frames_off: u64,
    pub pixels_off: u64,
    pub end_off: u64,
    pub bytes_total: u64,
    pub pixel_format: u32,
    pub color_space: u32,
    pub caps_bits: u64,
}

impl PackHeader {
    pub const SIZE: usize = 80;

    /// Header for a fresh build; section offsets are filled in by the builder
    pub fn new(format: PixelFormat, color_space: ColorSpace) -> Self {
        Self {
            magic: *HPK_FORMAT.magic,
            version: HPK_FORMAT.version,
            pixel_format: format.code(),
            color_space: color_space.code(),
            ..Self::default()
        }
    }

    pub fn has_valid_magic(&self) -> bool {
        &self.magic == HPK_FORMAT.magic
    }

    /// `0 < scene < camera < frames < pixels <= end == bytes_total`
    pub fn offsets_monotonic(&self) -> bool {
        0 < self.scene_off
            && self.scene_off < self.camera_off
            && self.camera_off < self.frames_off
            && self.frames_off < self.pixels_off
            && self.pixels_off <= self.end_off
            && self.end_off == self.bytes_total
    }

    /// Write header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        put_u32(&mut bytes, 0x04, self.version);
        put_u32(&mut bytes, 0x08, self.flags);
        put_u32(&mut bytes, 0x0C, self.reserved);
        put_u64(&mut bytes, 0x10, self.scene_off);
        put_u64(&mut bytes, 0x18, self.camera_off);
        put_u64(&mut bytes, 0x20, self.frames_off);
        put_u64(&mut bytes, 0x28, self.pixels_off);
        put_u64(&mut bytes, 0x30, self.end_off);
        put_u64(&mut bytes, 0x38, self.bytes_total);
        put_u32(&mut bytes, 0x40, self.pixel_format);
        put_u32(&mut bytes, 0x44, self.color_space);
        put_u64(&mut bytes, 0x48, self.caps_bits);
        bytes
    }

    /// Read header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: read_u32(bytes, 0x04),
            flags: read_u32(bytes, 0x08),
            reserved: read_u32(bytes, 0x0C),
            scene_off: read_u64(bytes, 0x10),
            camera_off: read_u64(bytes, 0x18),
            frames_off: read_u64(bytes, 0x20),
            pixels_off: read_u64(bytes, 0x28),
            end_off: read_u64(bytes, 0x30),
            bytes_total: read_u64(bytes, 0x38),
            pixel_format: read_u32(bytes, 0x40),
            color_space: read_u32(bytes, 0x44),
            caps_bits: read_u64(bytes, 0x48),
        })
    }
}

impl PackRecord for PackHeader {
    const SIZE: usize = Self::SIZE;

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        Self::from_bytes(bytes)
    }
}
