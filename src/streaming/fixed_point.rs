//! Fixed-point helpers for the resampler
//!
//! Two formats are in use:
//! - Q16 (16 fractional bits): rate ratio and read-position fraction,
//!   `0x10000 == 1.0`
//! - Q29 (29 fractional bits): pan/volume gains, `1 << 29 == 1.0`
//!
//! All shifts are arithmetic, so results round toward negative infinity.

/// 1.0 in Q16
pub const Q16_ONE: u32 = 0x10000;

/// Fractional bits of a Q16 value
pub const Q16_FRAC_BITS: u32 = 16;

/// Mask for the fractional part of a Q16 value
pub const Q16_FRAC_MASK: u32 = Q16_ONE - 1;

/// Fractional bits of a Q29 gain
pub const Q29_FRAC_BITS: u32 = 29;

/// 1.0 in Q29
pub const Q29_ONE: i64 = 1 << Q29_FRAC_BITS;

/// `(a * b) >> 16` with a 64-bit intermediate
#[inline]
pub fn mul_shr16(a: i32, b: i32) -> i32 {
    ((i64::from(a) * i64::from(b)) >> Q16_FRAC_BITS) as i32
}

/// `(a * ga + b * gb) >> 29` with a 64-bit intermediate
///
/// Mixes two samples with Q29 gains in one rounding step.
#[inline]
pub fn mix_q29(a: i32, ga: i64, b: i32, gb: i64) -> i64 {
    (i64::from(a) * ga + i64::from(b) * gb) >> Q29_FRAC_BITS
}

/// `a * b / c` with a 64-bit intermediate, saturating at `u32::MAX`
///
/// Returns `None` when `c` is zero.
#[inline]
pub fn mul_div(a: u32, b: u32, c: u32) -> Option<u32> {
    if c == 0 {
        return None;
    }
    let value = u64::from(a) * u64::from(b) / u64::from(c);
    Some(u32::try_from(value).unwrap_or(u32::MAX))
}
