//! Decoded song descriptor
//!
//! One [`SongDescriptor`] is produced per successful load and is read-only
//! afterwards. Variant-specific data lives in [`SongBody`].

use crate::{Result, YmError};
use bitflags::bitflags;
use serde::Serialize;

/// Atari ST YM2149 master clock, used when a format carries none
pub const ATARI_CLOCK: u32 = 2_000_000;

/// Default player (VBL) rate in Hz
pub const DEFAULT_PLAYER_RATE: u16 = 50;

bitflags! {
    /// Song attribute bits, as stored in YM5+/YMT headers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SongAttributes: u32 {
        /// Frame stream is stored plane by plane
        const STREAM_INTERLEAVED = 1;
        /// Digi-drum samples are signed
        const DRUM_SIGNED = 2;
        /// Digi-drum samples are packed 4-bit volume indices
        const DRUM_4BIT = 4;
        /// Song supports time seeking
        const TIME_CONTROL = 8;
        /// Loop information is present
        const LOOP_MODE = 16;
    }
}

/// Container variant a song was decoded from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SongFormat {
    /// `YM2!`
    Ym2,
    /// `YM3!` and `YM3b`
    Ym3,
    /// `YM5!`
    Ym5,
    /// `YM6!`
    Ym6,
    /// `MIX1` digi-mix
    Mix1,
    /// `YMT1` universal tracker
    Tracker1,
    /// `YMT2` universal tracker
    Tracker2,
}

impl SongFormat {
    /// True for the register-stream formats
    pub fn is_register_stream(self) -> bool {
        matches!(
            self,
            SongFormat::Ym2 | SongFormat::Ym3 | SongFormat::Ym5 | SongFormat::Ym6
        )
    }

    /// True for the tracker formats
    pub fn is_tracker(self) -> bool {
        matches!(self, SongFormat::Tracker1 | SongFormat::Tracker2)
    }
}

/// One digi-drum sample
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DigiDrum {
    /// Sample bytes (empty for a zero-size drum)
    pub data: Vec<u8>,
    /// Repeat length, never greater than `data.len()`
    pub repeat_len: usize,
}

impl DigiDrum {
    /// Sample length in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// One MIX1 playback block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MixBlock {
    /// Offset into the sample buffer
    pub sample_start: u32,
    /// Length in bytes
    pub sample_length: u32,
    /// Number of times the block is played
    pub repeat_count: u16,
    /// Replay frequency in Hz
    pub replay_freq: u16,
}

impl MixBlock {
    /// Playback time of this block in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.replay_freq == 0 {
            return 0;
        }
        u64::from(self.sample_length) * u64::from(self.repeat_count) * 1000
            / u64::from(self.replay_freq)
    }
}

/// Descriptive strings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SongMetadata {
    /// Song title
    pub name: String,
    /// Composer
    pub author: String,
    /// Free-form comment
    pub comment: String,
    /// Human-readable container type, e.g. `"YM 6"`
    pub song_type: String,
    /// Player that handles this song
    pub player: String,
}

/// Variant-specific payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongBody {
    /// YM2/YM3/YM5/YM6 register frames
    Registers {
        /// `frame_count * stride` bytes, frame-major once de-interleaved
        stream: Vec<u8>,
    },
    /// YMT1/YMT2 tracker lines
    Tracker {
        /// Voices per frame (1..=8)
        voices: usize,
        /// YMT2 frequency shift, 0 for YMT1
        freq_shift: u8,
        /// `frame_count * voices * 4` bytes
        stream: Vec<u8>,
    },
    /// MIX1 digi-mix
    Mix {
        /// Signed 8-bit sample data
        samples: Vec<u8>,
        /// Playback blocks, each within `samples`
        blocks: Vec<MixBlock>,
    },
}

/// A fully decoded song
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongDescriptor {
    /// Container variant
    pub format: SongFormat,
    /// Number of frames (0 for MIX1)
    pub frame_count: u32,
    /// Frame to jump back to after the last one
    pub loop_frame: u32,
    /// Bytes per frame in the stream (0 for MIX1)
    pub stream_stride: usize,
    /// Chip master clock in Hz
    pub clock: u32,
    /// Player rate in Hz
    pub player_rate: u16,
    /// Attribute bits
    pub attributes: SongAttributes,
    /// Digi-drum samples
    pub digidrums: Vec<DigiDrum>,
    /// Descriptive strings
    pub metadata: SongMetadata,
    /// Variant payload
    pub body: SongBody,
}

impl SongDescriptor {
    /// Frame stream bytes, empty for MIX1
    pub fn frame_stream(&self) -> &[u8] {
        match &self.body {
            SongBody::Registers { stream } | SongBody::Tracker { stream, .. } => stream,
            SongBody::Mix { .. } => &[],
        }
    }

    /// One frame of the stream
    ///
    /// Only meaningful once the stream is frame-major, which is always the
    /// case for descriptors returned by [`decode`](super::decode).
    pub fn frame(&self, index: usize) -> Option<&[u8]> {
        if self.stream_stride == 0 {
            return None;
        }
        let start = index.checked_mul(self.stream_stride)?;
        let end = start.checked_add(self.stream_stride)?;
        self.frame_stream().get(start..end)
    }

    /// Iterator over frames
    pub fn frames(&self) -> std::slice::ChunksExact<'_, u8> {
        self.frame_stream().chunks_exact(self.stream_stride.max(1))
    }

    /// True while the stream is still stored plane by plane
    pub fn is_interleaved(&self) -> bool {
        self.attributes.contains(SongAttributes::STREAM_INTERLEAVED)
    }

    /// Total playback time in milliseconds
    pub fn duration_ms(&self) -> u64 {
        match &self.body {
            SongBody::Mix { blocks, .. } => blocks.iter().map(MixBlock::duration_ms).sum(),
            _ if self.player_rate == 0 => 0,
            _ => u64::from(self.frame_count) * 1000 / u64::from(self.player_rate),
        }
    }

    /// Serializable overview, without the bulk data
    pub fn summary(&self) -> SongSummary {
        SongSummary {
            format: self.format,
            metadata: self.metadata.clone(),
            frame_count: self.frame_count,
            loop_frame: self.loop_frame,
            stream_stride: self.stream_stride,
            clock: self.clock,
            player_rate: self.player_rate,
            attributes: self.attributes.bits(),
            digidrums: self.digidrums.len(),
            duration_ms: self.duration_ms(),
            mix_blocks: match &self.body {
                SongBody::Mix { blocks, .. } => blocks.clone(),
                _ => Vec::new(),
            },
        }
    }
}

/// Overview of a song for reporting
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SongSummary {
    /// Container variant
    pub format: SongFormat,
    /// Descriptive strings
    pub metadata: SongMetadata,
    /// Number of frames
    pub frame_count: u32,
    /// Loop frame
    pub loop_frame: u32,
    /// Bytes per frame
    pub stream_stride: usize,
    /// Chip clock in Hz
    pub clock: u32,
    /// Player rate in Hz
    pub player_rate: u16,
    /// Raw attribute bits
    pub attributes: u32,
    /// Number of digi-drums
    pub digidrums: usize,
    /// Total playback time
    pub duration_ms: u64,
    /// MIX1 blocks, empty otherwise
    pub mix_blocks: Vec<MixBlock>,
}

/// Copy `bytes` into a new buffer, reporting allocation failure
pub(crate) fn try_copy(bytes: &[u8], what: &str) -> Result<Vec<u8>> {
    let mut out = try_alloc(bytes.len(), what)?;
    out.extend_from_slice(bytes);
    Ok(out)
}

/// Empty buffer with exactly `len` bytes reserved
pub(crate) fn try_alloc<T>(len: usize, what: &str) -> Result<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|e| YmError::OutOfMemory(format!("{} ({} elements): {}", what, len, e)))?;
    Ok(out)
}

/// Cut `buffer` down to `start..start + len` in place
pub(crate) fn take_region(mut buffer: Vec<u8>, start: usize, len: usize) -> Result<Vec<u8>> {
    let end = start
        .checked_add(len)
        .filter(|&end| end <= buffer.len())
        .ok_or_else(|| {
            YmError::Truncated(format!(
                "need {} bytes at offset {}, buffer holds {}",
                len,
                start,
                buffer.len()
            ))
        })?;
    buffer.truncate(end);
    buffer.drain(..start);
    Ok(buffer)
}
