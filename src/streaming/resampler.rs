//! Fixed-point cubic resampler
//!
//! One [`Resampler::process`] call is one polling tick: it pulls source
//! frames from the tail of a [`SampleRing`], converts them to the output
//! rate, applies [`Panning`] and writes the result into a circular device
//! buffer in the requested [`OutputFormat`].
//!
//! The read position is a 16.16 fixed-point value: whole frames are taken
//! from the ring as soon as they are passed, the fraction stays in
//! `frac_pos` between ticks. At a rate of exactly 1.0 frames are copied
//! straight through.
//!
//! Running short of source data is not an error. The tick stops early and
//! sets [`StreamFlags::UNDERRUN`].

use super::fixed_point::{mul_div, mul_shr16, Q16_FRAC_BITS, Q16_FRAC_MASK, Q16_ONE};
use super::output::OutputFormat;
use super::panning::Panning;
use super::ring_buffer::{SampleRing, Segments};
use crate::{Result, YmError};
use bitflags::bitflags;

/// Playback speed for 100 %
pub const SPEED_NORMAL: u32 = 256;

/// Slowest accepted playback speed
pub const SPEED_MIN: u32 = 32;

/// Largest accepted Q16 step (256 source frames per output frame)
pub const MAX_RATE: u32 = 0x0100_0000;

bitflags! {
    /// Source stream status
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StreamFlags: u8 {
        /// The producer has delivered its last frame
        const SOURCE_ENDED = 1;
        /// The last tick ran out of source frames
        const UNDERRUN = 2;
    }
}

/// 4-point cubic interpolation between `v0` and `v1`
///
/// `frac` is the Q16 position between `v0` (0) and `v1` (0x10000). Samples
/// are biased to unsigned for the arithmetic and the result is clamped to
/// the 16-bit range.
#[inline]
pub fn cubic(vm1: i16, v0: i16, v1: i16, v2: i16, frac: u32) -> i16 {
    let bias = |s: i16| i32::from(s) + 0x8000;
    let (vm1, c0, v1, v2) = (bias(vm1), bias(v0), bias(v1), bias(v2));
    let frac = (frac & Q16_FRAC_MASK) as i32;

    let c1 = v1 - vm1;
    let c2 = 2 * vm1 - 2 * c0 + v1 - v2;
    let c3 = c0 - vm1 - v1 + v2;

    let mut acc = mul_shr16(c3, frac);
    acc += c2;
    acc = mul_shr16(acc, frac);
    acc += c1;
    acc = mul_shr16(acc, frac);
    acc += c0;
    (acc.clamp(0, 0xFFFF) - 0x8000) as i16
}

/// Ring positions of the four interpolation taps
///
/// Near the end of the first segment the taps continue in the second one.
#[inline]
fn taps(seg: &Segments) -> [usize; 4] {
    let (p1, p2) = (seg.pos1, seg.pos2);
    match seg.len1 {
        1 => [p1, p2, p2 + 1, p2 + 2],
        2 => [p1, p1 + 1, p2, p2 + 1],
        3 => [p1, p1 + 1, p1 + 2, p2],
        _ => [p1, p1 + 1, p1 + 2, p1 + 3],
    }
}

/// Step past `frames` frames, moving into the second segment when the
/// first one runs out
#[inline]
fn advance(seg: &mut Segments, mut frames: usize) {
    if frames >= seg.len1 {
        frames -= seg.len1;
        seg.pos1 = seg.pos2;
        seg.len1 = seg.len2;
        seg.pos2 = 0;
        seg.len2 = 0;
    }
    seg.pos1 += frames;
    seg.len1 -= frames;
}

/// Resampling mixer state
#[derive(Debug)]
pub struct Resampler {
    format: OutputFormat,
    panning: Panning,
    /// Q16 step per output frame
    rate: u32,
    /// Q16 read-position fraction, always below 0x10000
    frac_pos: u32,
    flags: StreamFlags,
    /// Interleaved stereo working frames for one tick
    work: Vec<i16>,
    max_frames: usize,
    /// Write position in the device buffer, in frames
    out_pos: usize,
}

impl Resampler {
    /// Resampler producing at most `max_frames` frames per tick
    ///
    /// Starts at rate 1.0 with neutral panning.
    ///
    /// # Errors
    ///
    /// [`YmError::ConfigError`] if `max_frames` is 0.
    pub fn new(format: OutputFormat, max_frames: usize) -> Result<Self> {
        if max_frames == 0 {
            return Err(YmError::ConfigError(
                "Resampler needs room for at least one frame per tick".into(),
            ));
        }
        let len = max_frames
            .checked_mul(2)
            .ok_or_else(|| YmError::ConfigError(format!("{} frames per tick", max_frames)))?;
        let mut work = Vec::new();
        work.try_reserve_exact(len)
            .map_err(|e| YmError::OutOfMemory(format!("resampler work buffer: {}", e)))?;
        work.resize(len, 0);

        Ok(Resampler {
            format,
            panning: Panning::default(),
            rate: Q16_ONE,
            frac_pos: 0,
            flags: StreamFlags::empty(),
            work,
            max_frames,
            out_pos: 0,
        })
    }

    /// Output format
    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Current panning
    pub fn panning(&self) -> Panning {
        self.panning
    }

    /// Replace the panning settings
    pub fn set_panning(&mut self, panning: Panning) {
        self.panning = panning;
    }

    /// Set playback speed
    ///
    /// `speed` is in 1/256 units (256 == 100 %) and is raised to
    /// [`SPEED_MIN`] if lower. The step becomes
    /// `256 * speed * source_rate / output_rate` in Q16.
    pub fn set_speed(&mut self, speed: u32, source_rate: u32, output_rate: u32) -> Result<()> {
        let speed = speed.max(SPEED_MIN);
        let rate = SPEED_NORMAL
            .checked_mul(speed)
            .and_then(|scaled| mul_div(scaled, source_rate, output_rate))
            .ok_or_else(|| {
                YmError::ConfigError(format!(
                    "speed {} from {} Hz to {} Hz",
                    speed, source_rate, output_rate
                ))
            })?;
        self.set_rate(rate)
    }

    /// Set the raw Q16 step (0x10000 == 1.0)
    ///
    /// Rate 1.0 copies whole frames, so any pending fraction is dropped.
    pub fn set_rate(&mut self, rate: u32) -> Result<()> {
        if rate == 0 || rate > MAX_RATE {
            return Err(YmError::ConfigError(format!(
                "resampling rate {:#x} outside 1..={:#x}",
                rate, MAX_RATE
            )));
        }
        log::debug!("resampling rate {:#x}", rate);
        self.rate = rate;
        if rate == Q16_ONE {
            self.frac_pos = 0;
        }
        Ok(())
    }

    /// Source frames that must be queued for `frames` output frames
    ///
    /// Covers the whole steps taken from the current fraction plus the
    /// four interpolation taps.
    pub fn source_frames_needed(&self, frames: usize) -> usize {
        if self.rate == Q16_ONE {
            return frames;
        }
        let span = u64::from(self.frac_pos) + u64::from(self.rate) * frames as u64;
        usize::try_from(span >> Q16_FRAC_BITS)
            .unwrap_or(usize::MAX)
            .saturating_add(4)
    }

    /// Current Q16 step
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Current Q16 read-position fraction
    pub fn frac_pos(&self) -> u32 {
        self.frac_pos
    }

    /// Write position in the device buffer, in frames
    pub fn out_pos(&self) -> usize {
        self.out_pos
    }

    /// Stream status flags
    pub fn flags(&self) -> StreamFlags {
        self.flags
    }

    /// Record whether the producer has finished
    pub fn set_source_ended(&mut self, ended: bool) {
        self.flags.set(StreamFlags::SOURCE_ENDED, ended);
    }

    /// True when the last tick ran out of source frames
    pub fn is_underrun(&self) -> bool {
        self.flags.contains(StreamFlags::UNDERRUN)
    }

    /// True once the source has ended and been played out
    pub fn looped(&self) -> bool {
        self.flags
            .contains(StreamFlags::SOURCE_ENDED | StreamFlags::UNDERRUN)
    }

    /// Reset position and flags, keeping rate and panning
    pub fn reset(&mut self) {
        self.frac_pos = 0;
        self.flags = StreamFlags::empty();
        self.out_pos = 0;
    }

    /// Run one tick
    ///
    /// Produces up to `frames` output frames (capped at the per-tick
    /// maximum and the device buffer size) from `ring` into the circular
    /// device buffer `dest`, starting at [`out_pos`](Self::out_pos).
    /// Returns the frames produced, fewer than requested on underrun.
    pub fn process(&mut self, ring: &mut SampleRing, dest: &mut [u8], frames: usize) -> usize {
        let dest_frames = dest.len() / self.format.bytes_per_frame();
        if dest_frames == 0 {
            return 0;
        }
        let frames = frames.min(self.max_frames).min(dest_frames);

        let produced = if self.rate == Q16_ONE {
            self.copy_direct(ring, frames)
        } else {
            self.interpolate(ring, frames)
        };
        self.emit(dest, dest_frames, produced);
        produced
    }

    /// Write `frames` frames of silence into the device buffer
    ///
    /// Used while paused; the ring is left alone.
    pub fn fill_silence(&mut self, dest: &mut [u8], frames: usize) -> usize {
        let bpf = self.format.bytes_per_frame();
        let dest_frames = dest.len() / bpf;
        if dest_frames == 0 {
            return 0;
        }
        let frames = frames.min(dest_frames);
        self.out_pos %= dest_frames;
        let first = frames.min(dest_frames - self.out_pos);
        let start = self.out_pos * bpf;
        self.format
            .write_silence(&mut dest[start..start + first * bpf]);
        self.format.write_silence(&mut dest[..(frames - first) * bpf]);
        self.out_pos = (self.out_pos + frames) % dest_frames;
        frames
    }

    fn copy_direct(&mut self, ring: &mut SampleRing, frames: usize) -> usize {
        let mut seg = ring.tail_segments();
        let frames = if frames > seg.total() {
            log::trace!("underrun: {} of {} frames available", seg.total(), frames);
            self.flags.insert(StreamFlags::UNDERRUN);
            seg.total()
        } else {
            self.flags.remove(StreamFlags::UNDERRUN);
            frames
        };

        for out in self.work[..frames * 2].chunks_exact_mut(2) {
            let (l, r) = ring.frame(seg.pos1);
            let (l, r) = self.panning.apply(l, r);
            out[0] = l;
            out[1] = r;
            advance(&mut seg, 1);
        }
        ring.tail_consume_frames(frames);
        frames
    }

    fn interpolate(&mut self, ring: &mut SampleRing, frames: usize) -> usize {
        let mut seg = ring.tail_segments();
        let mut consumed = 0usize;
        let mut produced = 0usize;
        self.flags.remove(StreamFlags::UNDERRUN);

        while produced < frames {
            let available = seg.total();
            let step = ((self.rate + self.frac_pos) >> Q16_FRAC_BITS) as usize;
            if available <= 3 || available < step {
                log::trace!(
                    "underrun after {} of {} frames ({} source frames left)",
                    produced,
                    frames,
                    available
                );
                self.flags.insert(StreamFlags::UNDERRUN);
                break;
            }

            let [wm1, w0, w1, w2] = taps(&seg);
            let (lm1, rm1) = ring.frame(wm1);
            let (l0, r0) = ring.frame(w0);
            let (l1, r1) = ring.frame(w1);
            let (l2, r2) = ring.frame(w2);
            let left = cubic(lm1, l0, l1, l2, self.frac_pos);
            let right = cubic(rm1, r0, r1, r2, self.frac_pos);
            let (left, right) = self.panning.apply(left, right);
            self.work[produced * 2] = left;
            self.work[produced * 2 + 1] = right;
            produced += 1;

            self.frac_pos += self.rate;
            let progress = (self.frac_pos >> Q16_FRAC_BITS) as usize;
            self.frac_pos &= Q16_FRAC_MASK;
            consumed += progress;
            advance(&mut seg, progress);
        }

        ring.tail_consume_frames(consumed);
        produced
    }

    fn emit(&mut self, dest: &mut [u8], dest_frames: usize, produced: usize) {
        let bpf = self.format.bytes_per_frame();
        self.out_pos %= dest_frames;
        let first = produced.min(dest_frames - self.out_pos);
        let start = self.out_pos * bpf;
        self.format
            .write_frames(&self.work[..first * 2], &mut dest[start..start + first * bpf]);
        let wrapped = produced - first;
        if wrapped > 0 {
            self.format.write_frames(
                &self.work[first * 2..produced * 2],
                &mut dest[..wrapped * bpf],
            );
        }
        self.out_pos = (self.out_pos + produced) % dest_frames;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::output::{Channels, SampleWidth};
    use approx::assert_abs_diff_eq;

    fn ring_with(frames: &[(i16, i16)]) -> SampleRing {
        let mut ring = SampleRing::new(frames.len().max(1)).unwrap();
        let samples: Vec<i16> = frames.iter().flat_map(|&(l, r)| [l, r]).collect();
        assert_eq!(ring.write(&samples), frames.len());
        ring
    }

    fn decode_16(dest: &[u8]) -> Vec<i16> {
        dest.chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    fn reference_cubic(vm1: i16, v0: i16, v1: i16, v2: i16, frac: u32) -> f64 {
        let (vm1, c0, v1, v2) = (
            f64::from(vm1) + 32768.0,
            f64::from(v0) + 32768.0,
            f64::from(v1) + 32768.0,
            f64::from(v2) + 32768.0,
        );
        let x = f64::from(frac) / 65536.0;
        let c1 = v1 - vm1;
        let c2 = 2.0 * vm1 - 2.0 * c0 + v1 - v2;
        let c3 = c0 - vm1 - v1 + v2;
        let value = ((c3 * x + c2) * x + c1) * x + c0;
        value.clamp(0.0, 65535.0) - 32768.0
    }

    #[test]
    fn test_cubic_at_zero_fraction_is_current_sample() {
        for v in [-32768i16, -1, 0, 1234, 32767] {
            assert_eq!(cubic(100, v, -200, 300, 0), v);
        }
    }

    #[test]
    fn test_cubic_matches_float_reference() {
        let taps = [
            (0i16, 1000i16, 2000i16, 3000i16),
            (-5000, 7000, -3000, 12000),
            (32767, -32768, 32767, -32768),
            (10, 10, 10, 10),
        ];
        for (vm1, v0, v1, v2) in taps {
            for frac in (0..0x10000).step_by(0x0777) {
                let fixed = f64::from(cubic(vm1, v0, v1, v2, frac));
                let float = reference_cubic(vm1, v0, v1, v2, frac);
                assert_abs_diff_eq!(fixed, float, epsilon = 4.0);
            }
        }
    }

    #[test]
    fn test_unity_copies_and_consumes() {
        let frames: Vec<(i16, i16)> = (0..16).map(|i| (i * 100, -i * 100)).collect();
        let mut ring = ring_with(&frames);
        let mut resampler = Resampler::new(OutputFormat::default(), 64).unwrap();
        let mut dest = vec![0u8; 64 * 4];

        assert_eq!(resampler.process(&mut ring, &mut dest, 10), 10);
        assert_eq!(ring.available(), 6);
        assert!(!resampler.is_underrun());
        let out = decode_16(&dest[..40]);
        for (i, pair) in out.chunks_exact(2).enumerate() {
            assert_eq!((pair[0], pair[1]), frames[i]);
        }
    }

    #[test]
    fn test_unity_underrun_clamps() {
        let mut ring = ring_with(&[(1, 1), (2, 2), (3, 3)]);
        let mut resampler = Resampler::new(OutputFormat::default(), 16).unwrap();
        let mut dest = vec![0u8; 16 * 4];
        assert_eq!(resampler.process(&mut ring, &mut dest, 8), 3);
        assert!(resampler.is_underrun());
        assert!(!resampler.looped());
        resampler.set_source_ended(true);
        assert!(resampler.looped());
        assert!(ring.is_empty());
    }

    #[test]
    fn test_unity_across_ring_wrap() {
        let mut ring = SampleRing::new(8).unwrap();
        ring.write(&[0; 12]);
        ring.tail_consume_frames(6);
        ring.write(&[1, 2, 3, 4, 5, 6, 7, 8]);
        // Tail now: frames 6, 7 then 0, 1
        assert_eq!(ring.tail_segments().len2, 2);
        let mut resampler = Resampler::new(OutputFormat::default(), 8).unwrap();
        let mut dest = vec![0u8; 8 * 4];
        assert_eq!(resampler.process(&mut ring, &mut dest, 4), 4);
        assert_eq!(decode_16(&dest[..16]), vec![1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_half_rate_interpolates() {
        let frames: Vec<(i16, i16)> = (0..32).map(|i| (i * 1000, i * 1000)).collect();
        let mut ring = ring_with(&frames);
        let mut resampler = Resampler::new(OutputFormat::default(), 64).unwrap();
        resampler.set_rate(0x8000).unwrap();
        let mut dest = vec![0u8; 64 * 4];

        let produced = resampler.process(&mut ring, &mut dest, 20);
        assert_eq!(produced, 20);
        assert_eq!(ring.available(), 32 - 10);
        assert_eq!(resampler.frac_pos(), 0);
        let out = decode_16(&dest[..produced * 4]);
        // Output k sits at source position 1 + k/2 on a linear ramp
        for k in 0..produced {
            let expected = 1000.0 + 500.0 * k as f64;
            assert_abs_diff_eq!(f64::from(out[k * 2]), expected, epsilon = 2.0);
        }
    }

    #[test]
    fn test_interpolation_stops_before_running_dry() {
        let frames: Vec<(i16, i16)> = (0..10).map(|i| (i, i)).collect();
        let mut ring = ring_with(&frames);
        let mut resampler = Resampler::new(OutputFormat::default(), 64).unwrap();
        resampler.set_rate(0x20000).unwrap();
        let mut dest = vec![0u8; 64 * 4];

        let produced = resampler.process(&mut ring, &mut dest, 64);
        assert!(produced < 64);
        assert!(resampler.is_underrun());
        assert!(ring.available() <= 3);
        assert_eq!(ring.available() + 2 * produced, 10);
    }

    #[test]
    fn test_set_speed() {
        let mut resampler = Resampler::new(OutputFormat::default(), 4).unwrap();
        resampler.set_speed(256, 44_100, 44_100).unwrap();
        assert_eq!(resampler.rate(), 0x10000);
        resampler.set_speed(512, 44_100, 44_100).unwrap();
        assert_eq!(resampler.rate(), 0x20000);
        resampler.set_speed(1, 44_100, 44_100).unwrap();
        assert_eq!(resampler.rate(), 32 * 256);
        resampler.set_speed(256, 44_100, 48_000).unwrap();
        assert_eq!(resampler.rate(), 60_211);
        assert!(resampler.set_speed(256, 44_100, 0).is_err());
    }

    #[test]
    fn test_output_wraps_in_device_buffer() {
        let frames: Vec<(i16, i16)> = (1..=6).map(|i| (i, -i)).collect();
        let mut ring = ring_with(&frames);
        let mut resampler = Resampler::new(OutputFormat::default(), 8).unwrap();
        let mut dest = vec![0u8; 4 * 4];

        assert_eq!(resampler.process(&mut ring, &mut dest, 3), 3);
        assert_eq!(resampler.out_pos(), 3);
        assert_eq!(resampler.process(&mut ring, &mut dest, 3), 3);
        assert_eq!(resampler.out_pos(), 2);
        // Frames 4 and 5 wrapped to the start, frame 3 stayed at the end
        assert_eq!(decode_16(&dest), vec![5, -5, 6, -6, 3, -3, 4, -4]);
    }

    #[test]
    fn test_fill_silence_wraps() {
        let format = OutputFormat {
            width: SampleWidth::Bits8,
            channels: Channels::Mono,
            signed: false,
        };
        let mut resampler = Resampler::new(format, 8).unwrap();
        let mut dest = vec![0u8; 4];
        assert_eq!(resampler.fill_silence(&mut dest[..], 3), 3);
        dest.fill(0);
        assert_eq!(resampler.fill_silence(&mut dest[..], 2), 2);
        assert_eq!(dest, vec![0x80, 0, 0, 0x80]);
        assert_eq!(resampler.out_pos(), 1);
    }

    #[test]
    fn test_unity_rate_drops_pending_fraction() {
        let frames: Vec<(i16, i16)> = (0..32).map(|i| (i * 100, i * 100)).collect();
        let mut ring = ring_with(&frames);
        let mut resampler = Resampler::new(OutputFormat::default(), 8).unwrap();
        let mut dest = vec![0u8; 8 * 4];

        resampler.set_rate(0x8000).unwrap();
        assert_eq!(resampler.process(&mut ring, &mut dest, 1), 1);
        assert_eq!(resampler.frac_pos(), 0x8000);

        resampler.set_rate(Q16_ONE).unwrap();
        assert_eq!(resampler.frac_pos(), 0);

        // Back to interpolation: lands on a source frame, not halfway
        resampler.set_rate(0x8000).unwrap();
        assert_eq!(resampler.process(&mut ring, &mut dest, 1), 1);
        assert_eq!(decode_16(&dest[..4]), decode_16(&dest[4..8]));
        assert_eq!(decode_16(&dest[4..8]), vec![100, 100]);
    }

    #[test]
    fn test_source_frames_needed_fills_one_tick() {
        // 44.1 kHz down to 8 kHz, one output frame per tick
        let mut resampler = Resampler::new(OutputFormat::default(), 1).unwrap();
        resampler.set_speed(SPEED_NORMAL, 44_100, 8_000).unwrap();
        assert!(resampler.rate() >> 16 >= 5);

        let needed = resampler.source_frames_needed(1);
        let frames: Vec<(i16, i16)> = (0..needed as i16).map(|i| (i, i)).collect();
        let mut ring = ring_with(&frames);
        let mut dest = vec![0u8; 4];
        for _ in 0..4 {
            let room = resampler.source_frames_needed(1);
            let top_up: Vec<i16> = vec![7; 2 * ring.free().min(room)];
            ring.write(&top_up);
            assert_eq!(resampler.process(&mut ring, &mut dest, 1), 1);
        }

        let unity = Resampler::new(OutputFormat::default(), 4).unwrap();
        assert_eq!(unity.source_frames_needed(4), 4);
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(Resampler::new(OutputFormat::default(), 0).is_err());
        let mut resampler = Resampler::new(OutputFormat::default(), 1).unwrap();
        assert!(resampler.set_rate(0).is_err());
        assert!(resampler.set_rate(MAX_RATE + 1).is_err());
    }
}
