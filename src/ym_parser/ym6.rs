//! YM5!/YM6! decoder
//!
//! Layout after the 4-byte tag:
//! - `"LeOnArD!"` signature
//! - header: frames (u32), attributes (u32), drum count (u16), clock (u32),
//!   player rate (u16), loop frame (u32), extra data size (u16)
//! - extra data (skipped)
//! - digi-drums: size (u32) followed by that many bytes, per drum
//! - name, author, comment (null-terminated)
//! - register stream, 16 bytes per frame, usually interleaved

use super::cursor::ByteCursor;
use super::song::{
    take_region, try_alloc, try_copy, DigiDrum, SongAttributes, SongBody, SongDescriptor,
    SongFormat, SongMetadata,
};
use super::{expect_signature, FormatTag};
use crate::{Result, YmError};

/// Registers stored per frame
pub const YM6_FRAME_SIZE: usize = 16;

/// Frame counts at or above this are rejected
pub const MAX_EXTENDED_FRAMES: u32 = 0x0800_0000;

/// Drum sizes at or above this are rejected
pub const MAX_DRUM_SIZE: u32 = 0x8000_0000;

const EXTENDED_PLAYER: &str = "YM-Chip driver";

/// 4-bit volume index to 8-bit sample level
const VOLUME_TABLE: [u16; 16] = [
    62, 161, 265, 377, 580, 774, 1155, 1575, 2260, 3088, 4570, 6233, 9330, 13187, 21220, 32767,
];

/// Expand a 4-bit drum sample in place
///
/// Each byte holds a volume index in its low nibble and becomes the
/// matching 8-bit level.
pub fn expand_4bit_drum(sample: &mut [u8]) {
    for byte in sample.iter_mut() {
        *byte = (VOLUME_TABLE[usize::from(*byte & 15)] >> 7) as u8;
    }
}

fn read_digidrums(cursor: &mut ByteCursor, count: u16, four_bit: bool) -> Result<Vec<DigiDrum>> {
    // Each drum needs at least its size field
    let mut drums = try_alloc(usize::from(count).min(cursor.remaining() / 4), "digi-drum table")?;
    for index in 0..count {
        let size = cursor.read_be_u32("digi-drum size")?;
        if size >= MAX_DRUM_SIZE {
            return Err(YmError::InvalidFormat(format!(
                "Too big drumtab (drum {} declares {} bytes)",
                index, size
            )));
        }
        let bytes = cursor.take(size as usize, "digi-drum sample")?;
        let mut data = try_copy(bytes, "digi-drum sample")?;
        if four_bit {
            expand_4bit_drum(&mut data);
        }
        drums.push(DigiDrum {
            repeat_len: data.len(),
            data,
        });
    }
    Ok(drums)
}

/// Decode a YM5 or YM6 file
pub fn decode_extended(buffer: Vec<u8>, tag: FormatTag) -> Result<SongDescriptor> {
    let (format, song_type) = match tag {
        FormatTag::Ym5 => (SongFormat::Ym5, "YM 5"),
        FormatTag::Ym6 => (SongFormat::Ym6, "YM 6"),
        other => {
            return Err(YmError::InvalidFormat(format!(
                "{:?} is not an extended register format",
                other
            )))
        }
    };

    let mut cursor = ByteCursor::at(&buffer, 4)?;
    expect_signature(&mut cursor)?;

    let frame_count = cursor.read_be_u32("frame count")?;
    let mut attributes = SongAttributes::from_bits_retain(cursor.read_be_u32("attributes")?)
        | SongAttributes::TIME_CONTROL;
    let drum_count = cursor.read_be_u16("digi-drum count")?;
    let clock = cursor.read_be_u32("chip clock")?;
    let player_rate = cursor.read_be_u16("player rate")?;
    let loop_frame = cursor.read_be_u32("loop frame")?;
    let extra = cursor.read_be_u16("extra data size")?;
    cursor.skip(usize::from(extra), "extra data")?;

    if frame_count >= MAX_EXTENDED_FRAMES {
        return Err(YmError::InvalidFormat(format!(
            "Too many frames ({})",
            frame_count
        )));
    }

    let digidrums = read_digidrums(
        &mut cursor,
        drum_count,
        attributes.contains(SongAttributes::DRUM_4BIT),
    )?;
    attributes.remove(SongAttributes::DRUM_4BIT);

    let metadata = SongMetadata {
        name: cursor.read_nt_string("song name")?,
        author: cursor.read_nt_string("author")?,
        comment: cursor.read_nt_string("comment")?,
        song_type: song_type.to_string(),
        player: EXTENDED_PLAYER.to_string(),
    };

    let stream_len = frame_count as usize * YM6_FRAME_SIZE;
    if cursor.remaining() < stream_len {
        return Err(YmError::Truncated(format!(
            "{} frames need {} bytes, {} left",
            frame_count,
            stream_len,
            cursor.remaining()
        )));
    }
    let stream_start = cursor.position();

    log::debug!(
        "{}: {} frames, {} drums, clock {} Hz, {} Hz player, attributes {:#x}",
        song_type,
        frame_count,
        digidrums.len(),
        clock,
        player_rate,
        attributes.bits()
    );

    Ok(SongDescriptor {
        format,
        frame_count,
        loop_frame,
        stream_stride: YM6_FRAME_SIZE,
        clock,
        player_rate,
        attributes,
        digidrums,
        metadata,
        body: SongBody::Registers {
            stream: take_region(buffer, stream_start, stream_len)?,
        },
    })
}
