//! Camera SOA table descriptor (72 bytes) and column layout
//!
//! The descriptor is followed by eight contiguous columns, each holding
//! `count` elements, so consumers can stream one attribute across every
//! camera without stride-skipping.
//!
//! # Layout
//! ```text
//! 0x00: count u32
//! 0x04: reserved u32
//! 0x08: fx_off u64        f32 × count
//! 0x10: fy_off u64        f32 × count
//! 0x18: cx_off u64        f32 × count
//! 0x20: cy_off u64        f32 × count
//! 0x28: pose_off u64      [f32; 12] × count (3x4 row-major)
//! 0x30: width_off u64     u32 × count
//! 0x38: height_off u64    u32 × count
//! 0x40: time_off u64      u32 × count
//! ```

use super::{PackRecord, put_u32, put_u64, read_u32, read_u64};

/// Bytes per pose element (3x4 f32)
pub const POSE_ELEM_SIZE: u64 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraTableHeader {
    pub count: u32,
    pub fx_off: u64,
    pub fy_off: u64,
    pub cx_off: u64,
    pub cy_off: u64,
    pub pose_off: u64,
    pub width_off: u64,
    pub height_off: u64,
    pub time_off: u64,
}

/// One column of the camera table: where it starts and how wide each element is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    pub name: &'static str,
    pub offset: u64,
    pub elem_size: u64,
}

impl ColumnSpan {
    /// Byte length for `count` elements (`None` on overflow)
    pub fn byte_len(&self, count: u32) -> Option<u64> {
        self.elem_size.checked_mul(count as u64)
    }

    /// One past the last byte of the column (`None` on overflow)
    pub fn end(&self, count: u32) -> Option<u64> {
        self.offset.checked_add(self.byte_len(count)?)
    }
}

impl CameraTableHeader {
    pub const SIZE: usize = 72;

    /// Descriptor for a table written at `table_off`, with every column
    /// packed back-to-back right after the descriptor.
    pub fn contiguous(table_off: u64, count: u32) -> Self {
        let n = count as u64;
        let fx_off = table_off + Self::SIZE as u64;
        let fy_off = fx_off + 4 * n;
        let cx_off = fy_off + 4 * n;
        let cy_off = cx_off + 4 * n;
        let pose_off = cy_off + 4 * n;
        let width_off = pose_off + POSE_ELEM_SIZE * n;
        let height_off = width_off + 4 * n;
        let time_off = height_off + 4 * n;
        Self {
            count,
            fx_off,
            fy_off,
            cx_off,
            cy_off,
            pose_off,
            width_off,
            height_off,
            time_off,
        }
    }

    /// All eight columns, in file order
    pub fn column_spans(&self) -> [ColumnSpan; 8] {
        let span = |name, offset, elem_size| ColumnSpan {
            name,
            offset,
            elem_size,
        };
        [
            span("fx", self.fx_off, 4),
            span("fy", self.fy_off, 4),
            span("cx", self.cx_off, 4),
            span("cy", self.cy_off, 4),
            span("pose", self.pose_off, POSE_ELEM_SIZE),
            span("width", self.width_off, 4),
            span("height", self.height_off, 4),
            span("time", self.time_off, 4),
        ]
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        put_u32(&mut bytes, 0x00, self.count);
        put_u64(&mut bytes, 0x08, self.fx_off);
        put_u64(&mut bytes, 0x10, self.fy_off);
        put_u64(&mut bytes, 0x18, self.cx_off);
        put_u64(&mut bytes, 0x20, self.cy_off);
        put_u64(&mut bytes, 0x28, self.pose_off);
        put_u64(&mut bytes, 0x30, self.width_off);
        put_u64(&mut bytes, 0x38, self.height_off);
        put_u64(&mut bytes, 0x40, self.time_off);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        Some(Self {
            count: read_u32(bytes, 0x00),
            fx_off: read_u64(bytes, 0x08),
            fy_off: read_u64(bytes, 0x10),
            cx_off: read_u64(bytes, 0x18),
            cy_off: read_u64(bytes, 0x20),
            pose_off: read_u64(bytes, 0x28),
            width_off: read_u64(bytes, 0x30),
            height_off: read_u64(bytes, 0x38),
            time_off: read_u64(bytes, 0x40),
        })
    }
}

impl PackRecord for CameraTableHeader {
    const SIZE: usize = Self::SIZE;

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        Self::from_bytes(bytes)
    }
}
