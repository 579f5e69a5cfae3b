//! Single-image decoding to RGBA8

use std::path::Path;

/// Why one image could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("{0}")]
    Failed(String),

    #[error("decoded to an empty {width}x{height} image")]
    Empty { width: u32, height: u32 },

    #[error("{width}x{height} image needs {expected} bytes, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// Tightly packed RGBA8 pixels (`width * height * 4` bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl DecodedImage {
    /// Wrap a pixel buffer, rejecting empty images and mis-sized buffers
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::Empty { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(DecodeError::SizeMismatch {
                width,
                height,
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Iterate packed RGBA8 rows, top to bottom
    pub fn rows(&self) -> std::slice::ChunksExact<'_, u8> {
        self.pixels.chunks_exact(self.width as usize * 4)
    }
}

/// Turns one encoded image file into RGBA8 pixels.
///
/// Implementations are shared across decode workers, hence `Sync`.
pub trait ImageDecoder: Sync {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError>;
}

/// Decoder backed by the `image` crate (PNG and JPEG)
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedImage, DecodeError> {
        let img = image::open(path).map_err(|e| DecodeError::Failed(e.to_string()))?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        DecodedImage::new(width, height, rgba.into_raw())
    }
}
