//! Plane-major to frame-major conversion
//!
//! Interleaved streams store byte `k` of every frame contiguously:
//! `in[frame + frame_count * k]`. Players want frame-major rows:
//! `out[frame * stride + k]`.

use super::song::{try_alloc, SongAttributes, SongBody, SongDescriptor};
use crate::{Result, YmError};

/// Transpose a plane-major stream into frame-major order
///
/// `planes` must hold exactly `frame_count * stride` bytes.
pub fn deinterleave_stream(planes: &[u8], frame_count: usize, stride: usize) -> Result<Vec<u8>> {
    let total = frame_count
        .checked_mul(stride)
        .filter(|&total| total == planes.len())
        .ok_or_else(|| {
            YmError::InvalidFormat(format!(
                "interleaved stream of {} bytes does not hold {} frames of {} bytes",
                planes.len(),
                frame_count,
                stride
            ))
        })?;

    let mut frames = try_alloc(total, "frame stream")?;
    frames.resize(total, 0);
    for (k, plane) in planes.chunks_exact(frame_count.max(1)).enumerate() {
        for (frame, &byte) in plane.iter().enumerate() {
            frames[frame * stride + k] = byte;
        }
    }
    Ok(frames)
}

impl SongDescriptor {
    /// Convert the frame stream to frame-major order if it is interleaved
    ///
    /// Clears [`SongAttributes::STREAM_INTERLEAVED`]. A no-op for MIX1 and
    /// for streams already in frame order.
    pub fn deinterleave(&mut self) -> Result<()> {
        if !self.is_interleaved() {
            return Ok(());
        }
        let frame_count = self.frame_count as usize;
        let stride = self.stream_stride;
        match &mut self.body {
            SongBody::Registers { stream } | SongBody::Tracker { stream, .. } => {
                let frames = deinterleave_stream(stream, frame_count, stride)?;
                *stream = frames;
            }
            SongBody::Mix { .. } => {}
        }
        self.attributes.remove(SongAttributes::STREAM_INTERLEAVED);
        Ok(())
    }
}
