//! Math types for HostPack
//!
//! POD pose and bounds types that can be shared across crates without
//! pulling in a linear algebra dependency.

/// 3x4 affine camera pose (row-major storage, POD type)
///
/// Stores the top 3 rows of a 4x4 camera-to-world transform. The implicit
/// 4th row is [0, 0, 0, 1]. Each row stores [Xx, Xy, Xz, Tx] etc.
///
/// Memory layout (48 bytes), matching the camera table pose column:
/// - row0: rotation row 0 + translation X
/// - row1: rotation row 1 + translation Y
/// - row2: rotation row 2 + translation Z
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[repr(C)]
pub struct Pose3x4 {
    /// First row: [m00, m01, m02, tx]
    pub row0: [f32; 4],
    /// Second row: [m10, m11, m12, ty]
    pub row1: [f32; 4],
    /// Third row: [m20, m21, m22, tz]
    pub row2: [f32; 4],
}

impl Pose3x4 {
    /// Identity pose (camera at the origin, axis aligned)
    pub const IDENTITY: Self = Self {
        row0: [1.0, 0.0, 0.0, 0.0],
        row1: [0.0, 1.0, 0.0, 0.0],
        row2: [0.0, 0.0, 1.0, 0.0],
    };

    /// Create from row arrays
    pub const fn from_rows(row0: [f32; 4], row1: [f32; 4], row2: [f32; 4]) -> Self {
        Self { row0, row1, row2 }
    }

    /// Flatten to the 12-float layout stored in the pose column (row-major)
    pub fn to_array(&self) -> [f32; 12] {
        let mut out = [0.0; 12];
        out[0..4].copy_from_slice(&self.row0);
        out[4..8].copy_from_slice(&self.row1);
        out[8..12].copy_from_slice(&self.row2);
        out
    }

    /// Create from the flat 12-float layout (row-major)
    pub fn from_array(arr: [f32; 12]) -> Self {
        Self {
            row0: [arr[0], arr[1], arr[2], arr[3]],
            row1: [arr[4], arr[5], arr[6], arr[7]],
            row2: [arr[8], arr[9], arr[10], arr[11]],
        }
    }
}

/// Axis-aligned bounding box of the captured scene
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Aabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

impl Aabb {
    /// Unit cube centered at the origin ([-1, 1] on every axis)
    pub const UNIT: Self = Self {
        min: [-1.0, -1.0, -1.0],
        max: [1.0, 1.0, 1.0],
    };

    pub const fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// True if `min <= max` on every axis
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| self.min[i] <= self.max[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let m = Pose3x4::IDENTITY;
        assert_eq!(m.row0, [1.0, 0.0, 0.0, 0.0]);
        assert_eq!(m.row1, [0.0, 1.0, 0.0, 0.0]);
        assert_eq!(m.row2, [0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_to_array_is_row_major() {
        let m = Pose3x4::from_rows(
            [1.0, 2.0, 3.0, 4.0],
            [5.0, 6.0, 7.0, 8.0],
            [9.0, 10.0, 11.0, 12.0],
        );
        assert_eq!(
            m.to_array(),
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0]
        );
    }

    #[test]
    fn test_from_array() {
        let arr = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0];
        let m = Pose3x4::from_array(arr);
        assert_eq!(m.row0, [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(m.row1, [5.0, 6.0, 7.0, 8.0]);
        assert_eq!(m.row2, [9.0, 10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_aabb_validity() {
        assert!(Aabb::UNIT.is_valid());
        assert!(!Aabb::new([1.0, 0.0, 0.0], [0.0, 1.0, 1.0]).is_valid());
    }
}
