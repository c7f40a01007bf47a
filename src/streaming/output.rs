//! Destination sample formats
//!
//! The mixer works in signed 16-bit stereo. These routines convert a run of
//! working frames into the device layout. 16-bit output is little-endian.

use serde::Serialize;

/// Bits per output sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SampleWidth {
    /// 8-bit samples
    Bits8,
    /// 16-bit little-endian samples
    Bits16,
}

/// Output channel layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Channels {
    /// Left and right summed
    Mono,
    /// Interleaved left/right
    Stereo,
}

/// Destination sample format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputFormat {
    /// Sample width
    pub width: SampleWidth,
    /// Channel layout
    pub channels: Channels,
    /// Signed (true) or offset-binary (false) samples
    pub signed: bool,
}

impl Default for OutputFormat {
    /// Signed 16-bit stereo
    fn default() -> Self {
        OutputFormat {
            width: SampleWidth::Bits16,
            channels: Channels::Stereo,
            signed: true,
        }
    }
}

impl OutputFormat {
    /// Bytes per output frame
    pub fn bytes_per_frame(&self) -> usize {
        let sample = match self.width {
            SampleWidth::Bits8 => 1,
            SampleWidth::Bits16 => 2,
        };
        match self.channels {
            Channels::Mono => sample,
            Channels::Stereo => sample * 2,
        }
    }

    /// Convert interleaved stereo `frames` into `dest`
    ///
    /// Writes `min(frames.len() / 2, dest.len() / bytes_per_frame())` frames
    /// and returns that count.
    pub fn write_frames(&self, frames: &[i16], dest: &mut [u8]) -> usize {
        let bpf = self.bytes_per_frame();
        let count = (frames.len() / 2).min(dest.len() / bpf);
        let pairs = frames.chunks_exact(2).take(count);
        let slots = dest.chunks_exact_mut(bpf);

        match (self.width, self.channels) {
            (SampleWidth::Bits16, Channels::Stereo) => {
                let bias = if self.signed { 0 } else { 0x8000 };
                for (slot, pair) in slots.zip(pairs) {
                    slot[..2].copy_from_slice(&((pair[0] as u16) ^ bias).to_le_bytes());
                    slot[2..].copy_from_slice(&((pair[1] as u16) ^ bias).to_le_bytes());
                }
            }
            (SampleWidth::Bits16, Channels::Mono) => {
                let bias = if self.signed { 0 } else { 0x8000 };
                for (slot, pair) in slots.zip(pairs) {
                    let mono = (i32::from(pair[0]) + i32::from(pair[1])) >> 1;
                    slot.copy_from_slice(&((mono as u16) ^ bias).to_le_bytes());
                }
            }
            (SampleWidth::Bits8, Channels::Stereo) => {
                let bias = if self.signed { 0 } else { 0x80 };
                for (slot, pair) in slots.zip(pairs) {
                    slot[0] = ((pair[0] >> 8) as u8) ^ bias;
                    slot[1] = ((pair[1] >> 8) as u8) ^ bias;
                }
            }
            (SampleWidth::Bits8, Channels::Mono) => {
                let bias = if self.signed { 0 } else { 0x80 };
                for (slot, pair) in slots.zip(pairs) {
                    let mono = (i32::from(pair[0]) + i32::from(pair[1])) >> 9;
                    slot[0] = (mono as u8) ^ bias;
                }
            }
        }
        count
    }

    /// Fill `dest` with silence for this format
    ///
    /// Silence is 0 for signed output and the midpoint (0x80 / 0x8000) for
    /// unsigned output.
    pub fn write_silence(&self, dest: &mut [u8]) {
        match (self.width, self.signed) {
            (_, true) => dest.fill(0),
            (SampleWidth::Bits8, false) => dest.fill(0x80),
            (SampleWidth::Bits16, false) => {
                for sample in dest.chunks_exact_mut(2) {
                    sample.copy_from_slice(&0x8000u16.to_le_bytes());
                }
            }
        }
    }
}
