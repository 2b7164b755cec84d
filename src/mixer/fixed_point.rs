//! Fixed-point gain arithmetic
//!
//! Gains are stored with 15 fractional bits so that mixing is integer-only
//! and bit-reproducible across platforms. A gain of 1.0 is [`FIXED_UNIT`].

use crate::constants::{FIXED_SHIFT, FIXED_UNIT};

/// Fixed-point gain with [`FIXED_SHIFT`] fractional bits.
pub type Fixed = i32;

/// Convert a floating-point gain to fixed point (rounded to nearest).
///
/// Negative inputs round toward positive infinity, matching the pan-level
/// derivation where `to_fixed(1) - to_fixed(pan)` must stay symmetric.
#[inline]
pub fn to_fixed(value: f64) -> Fixed {
    (value * f64::from(FIXED_UNIT) + 0.5).floor() as Fixed
}

/// Convert a fixed-point gain back to floating point.
#[inline]
pub fn from_fixed(value: Fixed) -> f64 {
    f64::from(value) / f64::from(FIXED_UNIT)
}

/// Multiply a sample by a fixed-point gain.
///
/// The product is truncated toward zero, so any gain below unity strictly
/// shrinks the magnitude of a non-zero sample. Feedback paths built on this
/// always decay to exact zero. Results beyond `i32` saturate.
#[inline]
pub fn fmul(sample: i32, gain: Fixed) -> i32 {
    let product = (i64::from(sample) * i64::from(gain)) / (1i64 << FIXED_SHIFT);
    product.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// Saturate a mixed value to the signed 16-bit output range.
#[inline]
pub fn clamp_sample(value: i32) -> i16 {
    value.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_fixed_unit_and_zero() {
        assert_eq!(to_fixed(1.0), FIXED_UNIT);
        assert_eq!(to_fixed(0.0), 0);
        assert_eq!(to_fixed(2.0), 2 * FIXED_UNIT);
    }

    #[test]
    fn test_fmul_truncates_toward_zero() {
        let gain = to_fixed(0.3);
        assert_eq!(fmul(1, gain), 0);
        assert_eq!(fmul(-1, gain), 0);
        // 0.3 is stored as 9830 / 32768
        assert_eq!(fmul(10_000, gain), 2999);
        assert_eq!(fmul(-10_000, gain), -2999);
    }

    #[test]
    fn test_fmul_unity_is_identity() {
        for s in [-32768, -1, 0, 1, 12345, 32767] {
            assert_eq!(fmul(s, FIXED_UNIT), s);
        }
    }

    #[test]
    fn test_fmul_saturates_large_products() {
        assert_eq!(fmul(i32::MAX, 2 * FIXED_UNIT), i32::MAX);
        assert_eq!(fmul(i32::MIN, 2 * FIXED_UNIT), i32::MIN);
    }

    #[test]
    fn test_clamp_sample_saturates() {
        assert_eq!(clamp_sample(40_000), i16::MAX);
        assert_eq!(clamp_sample(-40_000), i16::MIN);
        assert_eq!(clamp_sample(-5), -5);
    }

    #[test]
    fn test_from_fixed_round_trip() {
        let g = to_fixed(0.25);
        assert!((from_fixed(g) - 0.25).abs() < 1e-9);
    }
}
