//! Ring buffer of 16-bit stereo source frames
//!
//! The producer writes at the head, the mixer reads at the tail. Both sides
//! see the buffer as two physical segments, [`Segments`], so nothing has to
//! be copied to make a wrapped region contiguous. The mixer reads through
//! [`SampleRing::frame`] and retires frames with
//! [`SampleRing::tail_consume_frames`] only after it is done with them.
//!
//! Single-threaded: one owner drives both ends from the same polling tick.

use crate::{Result, YmError};

/// Largest accepted capacity in frames (64 Mi frames, 256 MB)
pub const MAX_RING_FRAMES: usize = 64 * 1024 * 1024;

/// A region of the ring split at the physical end of the buffer
///
/// `pos1..pos1 + len1` comes first, then `pos2..pos2 + len2`. Positions are
/// frame indices. `len1 == 0` implies `len2 == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Segments {
    /// Start of the first segment
    pub pos1: usize,
    /// Frames in the first segment
    pub len1: usize,
    /// Start of the second segment (always 0 when non-empty)
    pub pos2: usize,
    /// Frames in the second segment
    pub len2: usize,
}

impl Segments {
    /// Frames across both segments
    pub fn total(&self) -> usize {
        self.len1 + self.len2
    }
}

/// FIFO of interleaved stereo `i16` frames
#[derive(Debug)]
pub struct SampleRing {
    /// Interleaved L/R samples, `2 * capacity` long
    buffer: Vec<i16>,
    /// Capacity in frames (power of 2)
    capacity: usize,
    /// Capacity mask for fast modulo
    mask: usize,
    /// Next frame to write
    head: usize,
    /// Next frame to read
    tail: usize,
    /// Frames currently stored
    fill: usize,
}

impl SampleRing {
    /// Create a ring holding at least `requested_frames` frames
    ///
    /// The capacity is rounded up to the next power of 2.
    ///
    /// # Errors
    ///
    /// [`YmError::ConfigError`] if the request is 0 or above
    /// [`MAX_RING_FRAMES`].
    pub fn new(requested_frames: usize) -> Result<Self> {
        if requested_frames == 0 {
            return Err(YmError::ConfigError(
                "Ring buffer capacity must be greater than 0".into(),
            ));
        }
        let capacity = requested_frames.next_power_of_two();
        if capacity > MAX_RING_FRAMES {
            return Err(YmError::ConfigError(format!(
                "Ring buffer capacity {} exceeds maximum {} frames",
                capacity, MAX_RING_FRAMES
            )));
        }

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(capacity * 2)
            .map_err(|e| YmError::OutOfMemory(format!("ring buffer: {}", e)))?;
        buffer.resize(capacity * 2, 0);

        Ok(SampleRing {
            buffer,
            capacity,
            mask: capacity - 1,
            head: 0,
            tail: 0,
            fill: 0,
        })
    }

    /// Capacity in frames
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames ready to read
    pub fn available(&self) -> usize {
        self.fill
    }

    /// Frames that can be written
    pub fn free(&self) -> usize {
        self.capacity - self.fill
    }

    /// True when no frames are stored
    pub fn is_empty(&self) -> bool {
        self.fill == 0
    }

    fn split(&self, start: usize, len: usize) -> Segments {
        if len == 0 {
            return Segments::default();
        }
        let len1 = len.min(self.capacity - start);
        Segments {
            pos1: start,
            len1,
            pos2: 0,
            len2: len - len1,
        }
    }

    /// Free space, starting at the write head
    pub fn head_segments(&self) -> Segments {
        self.split(self.head, self.free())
    }

    /// Stored frames, starting at the read tail
    pub fn tail_segments(&self) -> Segments {
        self.split(self.tail, self.fill)
    }

    /// Mark `frames` frames at the head as written
    ///
    /// Clamped to the free space; returns the frames actually added.
    pub fn head_add_frames(&mut self, frames: usize) -> usize {
        let frames = frames.min(self.free());
        self.head = (self.head + frames) & self.mask;
        self.fill += frames;
        frames
    }

    /// Retire `frames` frames at the tail
    ///
    /// Clamped to the stored frames; returns the frames actually retired.
    pub fn tail_consume_frames(&mut self, frames: usize) -> usize {
        let frames = frames.min(self.fill);
        self.tail = (self.tail + frames) & self.mask;
        self.fill -= frames;
        frames
    }

    /// Write interleaved stereo samples at the head
    ///
    /// A trailing odd sample is ignored. Returns the frames written, which
    /// is less than requested when the ring fills up.
    pub fn write(&mut self, samples: &[i16]) -> usize {
        let segments = self.head_segments();
        let to_write = (samples.len() / 2).min(segments.total());
        if to_write == 0 {
            return 0;
        }

        let first = to_write.min(segments.len1);
        let start = segments.pos1 * 2;
        self.buffer[start..start + first * 2].copy_from_slice(&samples[..first * 2]);
        let rest = to_write - first;
        if rest > 0 {
            self.buffer[..rest * 2].copy_from_slice(&samples[first * 2..to_write * 2]);
        }
        self.head_add_frames(to_write)
    }

    /// Mutable view of the physical storage for in-place producers
    ///
    /// Pair with [`head_segments`](Self::head_segments) and
    /// [`head_add_frames`](Self::head_add_frames).
    pub fn storage_mut(&mut self) -> &mut [i16] {
        &mut self.buffer
    }

    /// The (left, right) pair at physical frame `pos`
    #[inline]
    pub fn frame(&self, pos: usize) -> (i16, i16) {
        (self.buffer[pos * 2], self.buffer[pos * 2 + 1])
    }

    /// Drop all stored frames
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.fill = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stereo(frames: std::ops::Range<i16>) -> Vec<i16> {
        frames.flat_map(|f| [f, -f]).collect()
    }

    #[test]
    fn test_capacity_rounded_to_power_of_two() {
        let ring = SampleRing::new(1000).unwrap();
        assert_eq!(ring.capacity(), 1024);
        assert_eq!(ring.free(), 1024);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_invalid_capacity() {
        assert!(matches!(SampleRing::new(0), Err(YmError::ConfigError(_))));
        assert!(matches!(
            SampleRing::new(MAX_RING_FRAMES + 1),
            Err(YmError::ConfigError(_))
        ));
    }

    #[test]
    fn test_write_and_consume() {
        let mut ring = SampleRing::new(8).unwrap();
        assert_eq!(ring.write(&stereo(0..5)), 5);
        assert_eq!(ring.available(), 5);
        assert_eq!(ring.frame(4), (4, -4));

        let tail = ring.tail_segments();
        assert_eq!(tail, Segments { pos1: 0, len1: 5, pos2: 0, len2: 0 });
        assert_eq!(ring.tail_consume_frames(3), 3);
        assert_eq!(ring.available(), 2);
    }

    #[test]
    fn test_wrapped_segments() {
        let mut ring = SampleRing::new(8).unwrap();
        ring.write(&stereo(0..6));
        ring.tail_consume_frames(6);
        assert_eq!(ring.write(&stereo(10..15)), 5);

        let tail = ring.tail_segments();
        assert_eq!(tail.pos1, 6);
        assert_eq!(tail.len1, 2);
        assert_eq!(tail.pos2, 0);
        assert_eq!(tail.len2, 3);
        assert_eq!(ring.frame(7), (11, -11));
        assert_eq!(ring.frame(0), (12, -12));

        let head = ring.head_segments();
        assert_eq!(head, Segments { pos1: 3, len1: 3, pos2: 0, len2: 0 });
    }

    #[test]
    fn test_write_stops_when_full() {
        let mut ring = SampleRing::new(4).unwrap();
        assert_eq!(ring.write(&stereo(0..6)), 4);
        assert_eq!(ring.free(), 0);
        assert_eq!(ring.write(&stereo(0..1)), 0);
        assert_eq!(ring.head_segments().total(), 0);
    }

    #[test]
    fn test_consume_is_clamped() {
        let mut ring = SampleRing::new(4).unwrap();
        ring.write(&stereo(0..2));
        assert_eq!(ring.tail_consume_frames(10), 2);
        assert!(ring.is_empty());
        assert_eq!(ring.tail_segments(), Segments::default());
    }

    #[test]
    fn test_in_place_producer() {
        let mut ring = SampleRing::new(4).unwrap();
        let head = ring.head_segments();
        ring.storage_mut()[head.pos1 * 2] = 7;
        ring.storage_mut()[head.pos1 * 2 + 1] = 8;
        assert_eq!(ring.head_add_frames(1), 1);
        assert_eq!(ring.frame(0), (7, 8));
        assert_eq!(ring.head_add_frames(10), 3);
    }
}
