//! MIX1 digi-mix decoder
//!
//! A MIX1 file is one sample buffer plus a table of blocks saying which
//! slice to play, how often and at what frequency.

use super::cursor::ByteCursor;
use super::expect_signature;
use super::song::{
    try_alloc, try_copy, MixBlock, SongAttributes, SongBody, SongDescriptor, SongFormat,
    SongMetadata, ATARI_CLOCK, DEFAULT_PLAYER_RATE,
};
use crate::{Result, YmError};

/// Bytes per block table entry
pub const MIX_BLOCK_SIZE: usize = 12;

const MIX_SIGNED: u32 = 1;
const MAX_SAMPLE_SIZE: u32 = 0x8000_0000;
const MIX_PLAYER: &str = "Digi-Mix driver";

/// Decode a MIX1 file
pub fn decode_mix(buffer: Vec<u8>) -> Result<SongDescriptor> {
    let mut cursor = ByteCursor::at(&buffer, 4)?;
    expect_signature(&mut cursor)?;

    let flags = cursor.read_be_u32("mix attributes")?;
    let sample_size = cursor.read_be_u32("sample size")?;
    let block_count = cursor.read_be_u32("mix block count")?;

    if sample_size == 0 || sample_size >= MAX_SAMPLE_SIZE {
        return Err(YmError::InvalidFormat(format!(
            "Invalid sample size ({})",
            sample_size
        )));
    }
    if block_count == 0 {
        return Err(YmError::InvalidFormat("Invalid number of mixblocks".into()));
    }

    let table_len = (block_count as usize)
        .checked_mul(MIX_BLOCK_SIZE)
        .filter(|&len| len <= cursor.remaining())
        .ok_or_else(|| {
            YmError::Truncated(format!(
                "{} mix blocks need {} bytes each, {} left",
                block_count,
                MIX_BLOCK_SIZE,
                cursor.remaining()
            ))
        })?;
    log::trace!("mix block table: {} bytes", table_len);

    let mut blocks = try_alloc(block_count as usize, "mix block table")?;
    for _ in 0..block_count {
        blocks.push(MixBlock {
            sample_start: cursor.read_be_u32("block start")?,
            sample_length: cursor.read_be_u32("block length")?,
            repeat_count: cursor.read_be_u16("block repeat")?,
            replay_freq: cursor.read_be_u16("block frequency")?,
        });
    }

    let metadata = SongMetadata {
        name: cursor.read_nt_string("song name")?,
        author: cursor.read_nt_string("author")?,
        comment: cursor.read_nt_string("comment")?,
        song_type: "MIX1".to_string(),
        player: MIX_PLAYER.to_string(),
    };

    let mut samples = try_copy(cursor.take(sample_size as usize, "mix samples")?, "mix samples")?;

    for (index, block) in blocks.iter().enumerate() {
        let end = u64::from(block.sample_start) + u64::from(block.sample_length);
        if end > u64::from(sample_size) {
            return Err(YmError::InvalidFormat(format!(
                "mix block {} ends at {}, past the {} byte sample",
                index, end, sample_size
            )));
        }
    }

    let mut attributes = SongAttributes::TIME_CONTROL;
    if flags & MIX_SIGNED == 0 {
        for byte in samples.iter_mut() {
            *byte ^= 0x80;
        }
    }
    attributes |= SongAttributes::DRUM_SIGNED;

    log::debug!(
        "MIX1: {} blocks over {} sample bytes ({} source)",
        blocks.len(),
        sample_size,
        if flags & MIX_SIGNED != 0 { "signed" } else { "unsigned" }
    );

    Ok(SongDescriptor {
        format: SongFormat::Mix1,
        frame_count: 0,
        loop_frame: 0,
        stream_stride: 0,
        clock: ATARI_CLOCK,
        player_rate: DEFAULT_PLAYER_RATE,
        attributes,
        digidrums: Vec::new(),
        metadata,
        body: SongBody::Mix { samples, blocks },
    })
}
