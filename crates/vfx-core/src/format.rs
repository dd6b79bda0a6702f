//! Bit depth enumeration shared by the core pipeline's input/output ends.
//!
//! The pipeline itself always operates in `F32`; `BitDepth` only matters at
//! the edges, where an op list's first/last op absorbs a scale factor
//! derived from the caller's integer format (§3, §4.6 pass 4).

/// Bit depth of a pixel buffer at the boundary of the core pipeline.
///
/// # Variants
///
/// Integer formats:
/// - `U8` - 8-bit unsigned `[0, 255]`
/// - `U10` - 10-bit unsigned `[0, 1023]` (DPX, broadcast)
/// - `U12` - 12-bit unsigned `[0, 4095]` (cinema cameras)
/// - `U14` - 14-bit unsigned `[0, 16383]` (camera log formats)
/// - `U16` - 16-bit unsigned `[0, 65535]`
/// - `U32` - 32-bit unsigned
///
/// Floating-point formats:
/// - `F16` - 16-bit half-precision IEEE 754
/// - `F32` - 32-bit single-precision IEEE 754 (the pipeline's native depth)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BitDepth {
    /// Unknown/auto-detect.
    Unknown,
    /// 8-bit unsigned integer.
    U8,
    /// 10-bit unsigned integer (DPX, broadcast).
    U10,
    /// 12-bit unsigned integer (cinema cameras).
    U12,
    /// 14-bit unsigned integer (some camera log formats).
    U14,
    /// 16-bit unsigned integer.
    U16,
    /// 32-bit unsigned integer.
    U32,
    /// 16-bit half-precision float.
    F16,
    /// 32-bit single-precision float (the pipeline's native depth).
    #[default]
    F32,
}

impl BitDepth {
    /// Number of bits per channel. Returns 0 for `Unknown`.
    #[inline]
    pub const fn bits(&self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::U8 => 8,
            Self::U10 => 10,
            Self::U12 => 12,
            Self::U14 => 14,
            Self::U16 => 16,
            Self::U32 => 32,
            Self::F16 => 16,
            Self::F32 => 32,
        }
    }

    /// Whether this is a floating-point format. Returns false for `Unknown`.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32)
    }

    /// Whether this is an integer format.
    #[inline]
    pub const fn is_integer(&self) -> bool {
        !self.is_float()
    }

    /// Maximum representable integer value. Returns 0 for `Unknown`.
    #[inline]
    pub const fn max_value(&self) -> u32 {
        match self {
            Self::Unknown => 0,
            Self::U8 => 255,
            Self::U10 => 1023,
            Self::U12 => 4095,
            Self::U14 => 16383,
            Self::U16 => 65535,
            Self::U32 => u32::MAX,
            Self::F16 | Self::F32 => u32::MAX,
        }
    }

    /// `max = 2^n − 1` for integer kinds, `1.0` for float kinds (§3).
    /// `Unknown` is treated as `F32` (no scaling applied).
    #[inline]
    pub fn scale_factor(&self) -> f64 {
        match self {
            Self::Unknown | Self::F16 | Self::F32 => 1.0,
            Self::U8 => 255.0,
            Self::U10 => 1023.0,
            Self::U12 => 4095.0,
            Self::U14 => 16383.0,
            Self::U16 => 65535.0,
            Self::U32 => 4_294_967_295.0,
        }
    }
}

impl std::fmt::Display for BitDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::U8 => write!(f, "8-bit"),
            Self::U10 => write!(f, "10-bit"),
            Self::U12 => write!(f, "12-bit"),
            Self::U14 => write!(f, "14-bit"),
            Self::U16 => write!(f, "16-bit"),
            Self::U32 => write!(f, "32-bit"),
            Self::F16 => write!(f, "half"),
            Self::F32 => write!(f, "float"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_match_variant() {
        assert_eq!(BitDepth::U8.bits(), 8);
        assert_eq!(BitDepth::U10.bits(), 10);
        assert_eq!(BitDepth::U12.bits(), 12);
        assert_eq!(BitDepth::U14.bits(), 14);
        assert_eq!(BitDepth::U16.bits(), 16);
        assert_eq!(BitDepth::F16.bits(), 16);
        assert_eq!(BitDepth::F32.bits(), 32);
    }

    #[test]
    fn is_float_only_for_half_and_float() {
        assert!(!BitDepth::U8.is_float());
        assert!(!BitDepth::U14.is_float());
        assert!(BitDepth::F16.is_float());
        assert!(BitDepth::F32.is_float());
    }

    #[test]
    fn scale_factor_is_2n_minus_1_for_integers_and_1_for_floats() {
        assert_eq!(BitDepth::U8.scale_factor(), 255.0);
        assert_eq!(BitDepth::U10.scale_factor(), 1023.0);
        assert_eq!(BitDepth::U12.scale_factor(), 4095.0);
        assert_eq!(BitDepth::U14.scale_factor(), 16383.0);
        assert_eq!(BitDepth::U16.scale_factor(), 65535.0);
        assert_eq!(BitDepth::F32.scale_factor(), 1.0);
        assert_eq!(BitDepth::F16.scale_factor(), 1.0);
    }

    #[test]
    fn default_is_f32() {
        assert_eq!(BitDepth::default(), BitDepth::F32);
    }
}
