//! Scene record (24 bytes)
//!
//! # Layout
//! ```text
//! 0x00: aabb_min [f32; 3]
//! 0x0C: aabb_max [f32; 3]
//! ```

use super::{PackRecord, put_f32, read_f32};
use crate::math::Aabb;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SceneRecord {
    pub aabb: Aabb,
}

impl SceneRecord {
    pub const SIZE: usize = 24;

    pub fn new(aabb: Aabb) -> Self {
        Self { aabb }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        for i in 0..3 {
            put_f32(&mut bytes, i * 4, self.aabb.min[i]);
            put_f32(&mut bytes, 12 + i * 4, self.aabb.max[i]);
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let axis = |base: usize| {
            [
                read_f32(bytes, base),
                read_f32(bytes, base + 4),
                read_f32(bytes, base + 8),
            ]
        };
        Some(Self {
            aabb: Aabb::new(axis(0), axis(12)),
        })
    }
}

impl PackRecord for SceneRecord {
    const SIZE: usize = Self::SIZE;

    fn serialize(&self) -> Vec<u8> {
        self.to_bytes().to_vec()
    }

    fn deserialize(bytes: &[u8]) -> Option<Self> {
        Self::from_bytes(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_roundtrip() {
        let scene = SceneRecord::new(Aabb::new([-1.5, -2.0, 0.0], [1.5, 2.0, 3.25]));
        let bytes = scene.to_bytes();
        assert_eq!(f32::from_le_bytes(bytes[0..4].try_into().unwrap()), -1.5);
        assert_eq!(f32::from_le_bytes(bytes[20..24].try_into().unwrap()), 3.25);
        assert_eq!(SceneRecord::from_bytes(&bytes), Some(scene));
    }

    #[test]
    fn test_scene_too_short() {
        assert!(SceneRecord::from_bytes(&[0u8; 23]).is_none());
    }
}
