//! Scalar pixel codec
//!
//! Pure helpers used while laying out a HostPack:
//! - power-of-two alignment rounding (row strides, section and frame padding)
//! - sRGB → linear lookup table (256 entries, built once per build run)
//! - row encoding from decoded RGBA8 into the target [`PixelFormat`]

use crate::formats::PixelFormat;

// ============================================================================
// Alignment
// ============================================================================

/// Invalid alignment value
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AlignmentError {
    #[error("alignment must be non-zero")]
    Zero,

    #[error("alignment {0} is not a power of two")]
    NotPowerOfTwo(u32),
}

/// A validated power-of-two byte alignment.
///
/// Validated once in [`Alignment::new`]; rounding afterwards is infallible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Alignment(u64);

impl Alignment {
    /// No padding at all
    pub const BYTE: Self = Self(1);

    pub fn new(align: u32) -> Result<Self, AlignmentError> {
        if align == 0 {
            return Err(AlignmentError::Zero);
        }
        if !align.is_power_of_two() {
            return Err(AlignmentError::NotPowerOfTwo(align));
        }
        Ok(Self(align as u64))
    }

    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Smallest multiple of this alignment that is `>= x`
    #[inline]
    pub const fn round_up(self, x: u64) -> u64 {
        let mask = self.0 - 1;
        (x + mask) & !mask
    }

    /// Bytes of padding needed to bring `x` up to the next boundary
    #[inline]
    pub const fn padding_for(self, x: u64) -> u64 {
        self.round_up(x) - x
    }

    #[inline]
    pub const fn is_aligned(self, x: u64) -> bool {
        x & (self.0 - 1) == 0
    }
}

/// Round `x` up to a multiple of `align`.
///
/// Fails when `align` is zero or not a power of two. Callers that round
/// repeatedly should validate once via [`Alignment::new`] instead.
pub fn round_up_pow2(x: u64, align: u32) -> Result<u64, AlignmentError> {
    Ok(Alignment::new(align)?.round_up(x))
}

// ============================================================================
// sRGB transfer function
// ============================================================================

/// Convert an encoded sRGB value in [0, 1] to linear light.
///
/// Piecewise: linear segment below 0.04045 (encoded), 2.4 power curve above.
#[inline]
pub fn srgb_to_linear(c: f32) -> f32 {
    let c = c as f64;
    let linear = if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    };
    linear as f32
}

/// 8-bit sRGB channel → linear f32 lookup table
#[derive(Clone)]
pub struct SrgbLut([f32; 256]);

impl SrgbLut {
    pub fn new() -> Self {
        let mut table = [0.0f32; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            *entry = srgb_to_linear(i as f32 / 255.0);
        }
        Self(table)
    }

    #[inline]
    pub fn get(&self, value: u8) -> f32 {
        self.0[value as usize]
    }
}

impl Default for SrgbLut {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SrgbLut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SrgbLut").finish_non_exhaustive()
    }
}

/// Build the 256-entry sRGB → linear table
pub fn srgb_to_linear_lut() -> SrgbLut {
    SrgbLut::new()
}

// ============================================================================
// Row encoding
// ============================================================================

/// Row encoding failure (caller sized a buffer wrong)
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RowEncodeError {
    #[error("source row length {0} is not a whole number of RGBA8 pixels")]
    PartialPixel(usize),

    #[error("destination row holds {got} bytes, {need} required")]
    DestinationTooShort { need: usize, got: usize },
}

/// Encodes decoded RGBA8 rows into a target pixel format.
///
/// - `Rgba8`: bytes are copied through unchanged
/// - `Rgba32F`: RGB go through the sRGB LUT, alpha is scaled to `a / 255`;
///   each channel is stored as a little-endian f32
#[derive(Debug, Clone)]
pub struct RowEncoder {
    format: PixelFormat,
    lut: SrgbLut,
}

impl RowEncoder {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            lut: srgb_to_linear_lut(),
        }
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Packed byte length of `width` pixels in the target format
    #[inline]
    pub fn packed_len(&self, width: usize) -> usize {
        width * self.format.bytes_per_pixel() as usize
    }

    /// Encode one RGBA8 `src` row into `dst`.
    ///
    /// `dst` is typically sized to the row stride and may be longer than the
    /// packed width; bytes past the packed width are left untouched.
    /// Returns the number of packed bytes written.
    pub fn encode(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, RowEncodeError> {
        if src.len() % 4 != 0 {
            return Err(RowEncodeError::PartialPixel(src.len()));
        }
        let need = self.packed_len(src.len() / 4);
        if dst.len() < need {
            return Err(RowEncodeError::DestinationTooShort {
                need,
                got: dst.len(),
            });
        }

        match self.format {
            PixelFormat::Rgba8 => dst[..need].copy_from_slice(src),
            PixelFormat::Rgba32F => {
                for (px, out) in src.chunks_exact(4).zip(dst[..need].chunks_exact_mut(16)) {
                    let linear = [
                        self.lut.get(px[0]),
                        self.lut.get(px[1]),
                        self.lut.get(px[2]),
                        px[3] as f32 / 255.0,
                    ];
                    for (channel, bytes) in linear.iter().zip(out.chunks_exact_mut(4)) {
                        bytes.copy_from_slice(&channel.to_le_bytes());
                    }
                }
            }
        }

        Ok(need)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f32_at(bytes: &[u8], index: usize) -> f32 {
        let start = index * 4;
        f32::from_le_bytes(bytes[start..start + 4].try_into().unwrap())
    }

    #[test]
    fn test_alignment_rejects_zero_and_non_pow2() {
        assert_eq!(Alignment::new(0), Err(AlignmentError::Zero));
        assert_eq!(Alignment::new(3), Err(AlignmentError::NotPowerOfTwo(3)));
        assert_eq!(Alignment::new(4095), Err(AlignmentError::NotPowerOfTwo(4095)));
        assert!(Alignment::new(1).is_ok());
        assert!(Alignment::new(4096).is_ok());
    }

    #[test]
    fn test_round_up() {
        let a = Alignment::new(16).unwrap();
        assert_eq!(a.round_up(0), 0);
        assert_eq!(a.round_up(1), 16);
        assert_eq!(a.round_up(8), 16);
        assert_eq!(a.round_up(16), 16);
        assert_eq!(a.round_up(17), 32);
        assert_eq!(a.padding_for(17), 15);
        assert!(a.is_aligned(48));
        assert!(!a.is_aligned(50));
    }

    #[test]
    fn test_round_up_byte_alignment_is_identity() {
        for x in [0u64, 1, 7, 80, 4097] {
            assert_eq!(Alignment::BYTE.round_up(x), x);
        }
    }

    #[test]
    fn test_round_up_pow2_free_function() {
        assert_eq!(round_up_pow2(80, 4096), Ok(4096));
        assert_eq!(round_up_pow2(8, 16), Ok(16));
        assert_eq!(round_up_pow2(8, 3), Err(AlignmentError::NotPowerOfTwo(3)));
    }

    #[test]
    fn test_lut_endpoints() {
        let lut = srgb_to_linear_lut();
        assert_eq!(lut.get(0), 0.0);
        assert!((lut.get(255) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lut_mid_value_matches_transfer_function() {
        let lut = srgb_to_linear_lut();
        let c = 188.0f64 / 255.0;
        let expected = ((c + 0.055) / 1.055).powf(2.4);
        assert!((lut.get(188) as f64 - expected).abs() < 1e-5);
    }

    #[test]
    fn test_lut_linear_segment() {
        let lut = srgb_to_linear_lut();
        // 10/255 ≈ 0.0392 is below the 0.04045 knee
        let expected = (10.0f64 / 255.0) / 12.92;
        assert!((lut.get(10) as f64 - expected).abs() < 1e-7);
    }

    #[test]
    fn test_lut_is_monotonic() {
        let lut = srgb_to_linear_lut();
        assert!((0..255u8).all(|v| lut.get(v) < lut.get(v + 1)));
    }

    #[test]
    fn test_encode_rgba8_copies_and_keeps_padding() {
        let enc = RowEncoder::new(PixelFormat::Rgba8);
        let src = [1, 2, 3, 4, 5, 6, 7, 8];
        let mut dst = [0xAAu8; 16];
        let written = enc.encode(&src, &mut dst).unwrap();
        assert_eq!(written, 8);
        assert_eq!(&dst[..8], &src);
        assert!(dst[8..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn test_encode_rgba32f_linearizes_color_not_alpha() {
        let enc = RowEncoder::new(PixelFormat::Rgba32F);
        let src = [0, 255, 188, 51];
        let mut dst = [0u8; 16];
        assert_eq!(enc.encode(&src, &mut dst).unwrap(), 16);

        assert_eq!(f32_at(&dst, 0), 0.0);
        assert!((f32_at(&dst, 1) - 1.0).abs() < 1e-6);
        assert!((f32_at(&dst, 2) - srgb_to_linear(188.0 / 255.0)).abs() < 1e-6);
        // Alpha is a straight scale, not the transfer curve
        assert!((f32_at(&dst, 3) - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_encode_rejects_short_destination() {
        let enc = RowEncoder::new(PixelFormat::Rgba32F);
        let src = [0u8; 8];
        let mut dst = [0u8; 31];
        assert_eq!(
            enc.encode(&src, &mut dst),
            Err(RowEncodeError::DestinationTooShort { need: 32, got: 31 })
        );
    }

    #[test]
    fn test_encode_rejects_partial_pixel() {
        let enc = RowEncoder::new(PixelFormat::Rgba8);
        let mut dst = [0u8; 16];
        assert_eq!(
            enc.encode(&[0u8; 6], &mut dst),
            Err(RowEncodeError::PartialPixel(6))
        );
    }
}
