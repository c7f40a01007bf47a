//! YM2!/YM3!/YM3b decoder
//!
//! The early formats have no header: the tag is followed directly by an
//! interleaved stream of 14 registers per frame. YM3b appends a
//! little-endian loop frame as the last four bytes.

use super::cursor::ByteCursor;
use super::song::{
    take_region, SongAttributes, SongBody, SongDescriptor, SongFormat, SongMetadata, ATARI_CLOCK,
    DEFAULT_PLAYER_RATE,
};
use crate::{Result, YmError};

/// Registers stored per frame by the legacy formats
pub const LEGACY_FRAME_SIZE: usize = 14;

const TAG_SIZE: usize = 4;
const LOOP_TRAILER_SIZE: usize = 4;
const LEGACY_PLAYER: &str = "YM-Chip driver";

/// Which legacy layout to decode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyKind {
    /// `YM2!`
    Ym2,
    /// `YM3!`
    Ym3,
    /// `YM3b` with loop trailer
    Ym3b,
}

/// Decode a legacy register dump
pub fn decode_legacy(buffer: Vec<u8>, kind: LegacyKind) -> Result<SongDescriptor> {
    let size = buffer.len();
    let (payload, loop_frame) = match kind {
        LegacyKind::Ym3b => {
            if size < TAG_SIZE + LOOP_TRAILER_SIZE {
                return Err(YmError::Truncated(format!(
                    "YM3b needs a {} byte loop trailer, file has {} bytes",
                    LOOP_TRAILER_SIZE, size
                )));
            }
            let loop_frame = ByteCursor::at(&buffer, size - LOOP_TRAILER_SIZE)?
                .read_le_u32("loop frame")?;
            (size - TAG_SIZE - LOOP_TRAILER_SIZE, loop_frame)
        }
        LegacyKind::Ym2 | LegacyKind::Ym3 => (size.saturating_sub(TAG_SIZE), 0),
    };

    let frame_count = payload / LEGACY_FRAME_SIZE;
    if frame_count == 0 {
        return Err(YmError::InvalidFormat("No frames in file".into()));
    }
    let frame_count_u32 = u32::try_from(frame_count)
        .map_err(|_| YmError::InvalidFormat(format!("Too many frames ({})", frame_count)))?;

    let (format, comment, song_type) = match kind {
        LegacyKind::Ym2 => (SongFormat::Ym2, "Converted by Leonard.", "YM 2"),
        LegacyKind::Ym3 => (SongFormat::Ym3, "", "YM 3"),
        LegacyKind::Ym3b => (SongFormat::Ym3, "", "YM 3b (loop)"),
    };

    let stream = take_region(buffer, TAG_SIZE, frame_count * LEGACY_FRAME_SIZE)?;
    log::debug!(
        "{}: {} frames, loop frame {}",
        song_type,
        frame_count,
        loop_frame
    );

    Ok(SongDescriptor {
        format,
        frame_count: frame_count_u32,
        loop_frame,
        stream_stride: LEGACY_FRAME_SIZE,
        clock: ATARI_CLOCK,
        player_rate: DEFAULT_PLAYER_RATE,
        attributes: SongAttributes::STREAM_INTERLEAVED | SongAttributes::TIME_CONTROL,
        digidrums: Vec::new(),
        metadata: SongMetadata {
            name: "Unknown".to_string(),
            author: "Unknown".to_string(),
            comment: comment.to_string(),
            song_type: song_type.to_string(),
            player: LEGACY_PLAYER.to_string(),
        },
        body: SongBody::Registers { stream },
    })
}
