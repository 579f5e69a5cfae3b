//! Zero-copy views into a mapped pack
//!
//! Views borrow from the [`PackReader`](crate::PackReader) that produced
//! them and cannot outlive it.

use hostpack_common::{PixelFormat, Pose3x4};

/// Active sub-rectangle of a stored image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

/// One frame's pixels: `height` rows of `row_stride` bytes.
///
/// The all-zero [`ImageView::default`] means "not present".
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImageView<'a> {
    /// `height * row_stride` bytes starting at the frame's first row
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub row_stride: u32,
    pub pixel_stride: u32,
    /// `None` only for the absent view
    pub format: Option<PixelFormat>,
    pub roi: Roi,
}

impl<'a> ImageView<'a> {
    pub fn is_present(&self) -> bool {
        !self.data.is_empty()
    }

    /// Row `y` including stride padding
    pub fn row(&self, y: u32) -> Option<&'a [u8]> {
        if y >= self.height {
            return None;
        }
        let start = y as usize * self.row_stride as usize;
        self.data.get(start..start + self.row_stride as usize)
    }

    /// Row `y` trimmed to `width * pixel_stride` bytes
    pub fn packed_row(&self, y: u32) -> Option<&'a [u8]> {
        let packed = self.width as usize * self.pixel_stride as usize;
        self.row(y)?.get(..packed)
    }

    /// Row `y` as interleaved RGBA floats (RGBA32F frames only)
    pub fn row_f32(&self, y: u32) -> Option<&'a [f32]> {
        if self.format != Some(PixelFormat::Rgba32F) {
            return None;
        }
        bytemuck::try_cast_slice(self.packed_row(y)?).ok()
    }

    /// RGBA components of pixel (`x`, `y`) in an RGBA8 frame
    pub fn rgba8(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if self.format != Some(PixelFormat::Rgba8) || x >= self.width {
            return None;
        }
        let start = x as usize * 4;
        let px = self.packed_row(y)?.get(start..start + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// The camera table's columns, all indexed by camera id
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraSoaView<'a> {
    pub count: u32,
    pub fx: &'a [f32],
    pub fy: &'a [f32],
    pub cx: &'a [f32],
    pub cy: &'a [f32],
    /// Row-major 3x4 camera-to-world transforms
    pub pose: &'a [[f32; 12]],
    pub width: &'a [u32],
    pub height: &'a [u32],
    pub time: &'a [u32],
}

impl CameraSoaView<'_> {
    pub fn pose3x4(&self, camera: usize) -> Option<Pose3x4> {
        self.pose.get(camera).copied().map(Pose3x4::from_array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_view_is_absent() {
        let view = ImageView::default();
        assert!(!view.is_present());
        assert_eq!(view.row(0), None);
        assert_eq!(view.format, None);
    }

    #[test]
    fn test_rows_respect_stride() {
        let data: Vec<u8> = (0..32).collect();
        let view = ImageView {
            data: &data,
            width: 2,
            height: 2,
            row_stride: 16,
            pixel_stride: 4,
            format: Some(PixelFormat::Rgba8),
            roi: Roi {
                x: 0,
                y: 0,
                w: 2,
                h: 2,
            },
        };
        assert_eq!(view.row(1).unwrap().len(), 16);
        assert_eq!(view.packed_row(1).unwrap(), &data[16..24]);
        assert_eq!(view.rgba8(1, 1), Some([20, 21, 22, 23]));
        assert_eq!(view.rgba8(2, 0), None);
        assert_eq!(view.row(2), None);
        assert_eq!(view.row_f32(0), None);
    }

    #[test]
    fn test_pose_lookup() {
        let poses = [Pose3x4::IDENTITY.to_array()];
        let soa = CameraSoaView {
            count: 1,
            pose: &poses,
            ..Default::default()
        };
        assert_eq!(soa.pose3x4(0), Some(Pose3x4::IDENTITY));
        assert_eq!(soa.pose3x4(1), None);
    }
}
