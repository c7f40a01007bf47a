//! Stereo pan, volume and surround
//!
//! With pan `p` in -64..=64 and volumes in 0..=256:
//!
//! ```text
//! L' = (L * (64 + p) + R * (64 - p)) / 128 * left_volume / 256
//! R' = (R * (64 + p) + L * (64 - p)) / 128 * right_volume / 256
//! ```
//!
//! `p = 64` leaves the channels alone, `p = 0` plays `(L + R) / 2` on both
//! and `p = -64` swaps them. Each output is one Q29 product-sum, so the
//! result is exact and rounds toward negative infinity.

use super::fixed_point::{mix_q29, Q29_FRAC_BITS};
use crate::{Result, YmError};

/// Pan value for the unmodified stereo image
pub const PAN_NORMAL: i8 = 64;

/// Full volume
pub const VOLUME_MAX: u16 = 256;

/// Pan, per-channel volume and surround settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Panning {
    pan: i8,
    left_volume: u16,
    right_volume: u16,
    surround: bool,
    gains: [i64; 4],
}

impl Default for Panning {
    fn default() -> Self {
        Panning::build(PAN_NORMAL, VOLUME_MAX, VOLUME_MAX, false)
    }
}

impl Panning {
    /// Validated settings
    ///
    /// # Errors
    ///
    /// [`YmError::ConfigError`] if `pan` is outside -64..=64 or a volume is
    /// above 256.
    pub fn new(pan: i8, left_volume: u16, right_volume: u16, surround: bool) -> Result<Self> {
        if !(-64..=64).contains(&pan) {
            return Err(YmError::ConfigError(format!(
                "pan {} outside -64..=64",
                pan
            )));
        }
        if left_volume > VOLUME_MAX || right_volume > VOLUME_MAX {
            return Err(YmError::ConfigError(format!(
                "volume {}/{} above {}",
                left_volume, right_volume, VOLUME_MAX
            )));
        }
        Ok(Panning::build(pan, left_volume, right_volume, surround))
    }

    fn build(pan: i8, left_volume: u16, right_volume: u16, surround: bool) -> Self {
        // (64 +- p) / 128 * vol / 256 in Q29 is (64 +- p) * vol << 14
        let shift = Q29_FRAC_BITS - 15;
        let direct = 64 + i64::from(pan);
        let cross = 64 - i64::from(pan);
        let (lv, rv) = (i64::from(left_volume), i64::from(right_volume));
        Panning {
            pan,
            left_volume,
            right_volume,
            surround,
            gains: [
                (direct * lv) << shift,
                (cross * lv) << shift,
                (direct * rv) << shift,
                (cross * rv) << shift,
            ],
        }
    }

    /// Pan position, -64..=64
    pub fn pan(&self) -> i8 {
        self.pan
    }

    /// Left volume, 0..=256
    pub fn left_volume(&self) -> u16 {
        self.left_volume
    }

    /// Right volume, 0..=256
    pub fn right_volume(&self) -> u16 {
        self.right_volume
    }

    /// Whether the left channel is inverted
    pub fn surround(&self) -> bool {
        self.surround
    }

    /// Transform one stereo frame
    #[inline]
    pub fn apply(&self, left: i16, right: i16) -> (i16, i16) {
        let (l, r) = (i32::from(left), i32::from(right));
        let [ll, lr, rr, rl] = self.gains;
        let out_l = clamp_i16(mix_q29(l, ll, r, lr));
        let out_r = clamp_i16(mix_q29(r, rr, l, rl));
        if self.surround {
            (!out_l, out_r)
        } else {
            (out_l, out_r)
        }
    }
}

#[inline]
fn clamp_i16(value: i64) -> i16 {
    value.clamp(i64::from(i16::MIN), i64::from(i16::MAX)) as i16
}
