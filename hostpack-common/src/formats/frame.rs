//! Frame table record (56 bytes per frame)
//!
//! # Layout
//! ```text
//! 0x00: camera_id u32
//! 0x04: mip_levels u32     always 1 (reserved for future use)
//! 0x08: reserved [u32; 2]
//! 0x10: pixel_off u64      block-aligned
//! 0x18: width u32
//! 0x1C: height u32
//! 0x20: row_stride u32     >= roi_w × pixel_stride, row-aligned
//! 0x24: pixel_stride u32
//! 0x28: roi_x u32
//! 0x2C: roi_y u32
//! 0x30: roi_w u32
//! 0x34: roi_h u32
//! ```

use super::{PackRecord, put_u32, put_u64, read_u32, read_u64};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameRecord {
    pub camera_id: u32,
    pub mip_levels: u32,
    pub pixel_off: u64,
    pub width: u32,
    pub height: u32,
    pub row_stride: u32,
    pub pixel_stride: u32,
    pub roi_x: u32,
    pub roi_y: u32,
    pub roi_w: u32,
    pub roi_h: u32,
}

impl FrameRecord {
    pub const SIZE: usize = 56;

    /// Record for a single-mip frame whose ROI covers the whole image
    pub fn full_image(
        camera_id: u32,
        pixel_off: u64,
        width: u32,
        height: u32,
        row_stride: u32,
        pixel_stride: u32,
    ) -> Self {
        Self {
            camera_id,
            mip_levels: 1,
            pixel_off,
            width,
            height,
            row_stride,
            pixel_stride,
            roi_x: 0,
            roi_y: 0,
            roi_w: width,
            roi_h: height,
        }
    }

    /// Bytes occupied by this frame's rows (excluding trailing block padding)
    pub fn pixel_bytes(&self) -> u64 {
        self.height as u64 * self.row_stride as u64
    }

    /// True if the ROI lies inside the image
    pub fn roi_in_bounds(&self) -> bool {
        self.roi_x as u64 + self.roi_w as u64 <= self.width as u64
            && self.roi_y as u64 + self.roi_h as u64 <= self.height as u64
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        put_u32(&mut bytes, 0x00, self.camera_id);
        put_u32(&mut bytes, 0x04, self.mip_levels);
        put_u64(&mut bytes, 0x10, self.pixel_off);
        put_u32(&mut bytes, 0x18, self.width);
        put_u32(&mut bytes, 0x1C, self.height);
        put_u32(&mut bytes, 0x20, self.row_stride);
        put_u32(&mut bytes, 0x24, self.pixel_stride);
        put_u32(&mut bytes, 0x28, self.roi_x);
        put_u32(&mut bytes, 0x2C, self.roi_y);
        put_u32(&mut bytes, 0x30, self.roi_w);
        put_u32(&mut bytes, 0x34, self.roi_h);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            camera_id: read_u32(bytes, 0x00),
            mip_levels: read_u32(bytes, 0x04),
            pixel_off: read_u64(bytes, 0x10),
            width: read_u32(bytes, 0x18),
            height: read_u32(bytes, 0x1C),
            row_stride: read_u32(bytes, 0x20),
            pixel_stride: read_u32(bytes, 0x24),
            roi_x: read_u32(bytes, 0x28),
            roi_y: read_u32(bytes, 0x2C),
            roi_w: read_u32(bytes, 0x30),
            roi_h: read_u32(bytes, 0x34),
        })
    }
}

impl PackRecord for FrameRecord {
    const SIZE: usize = Self::SIZE;

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        Self::from_bytes(bytes)
    }
}
