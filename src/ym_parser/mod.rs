//! YM container parsing
//!
//! [`decode`] reads the 4-byte tag, hands the buffer to the matching
//! variant decoder and de-interleaves the result. Every variant decoder
//! reads through a [`ByteCursor`], so a short buffer always fails with a
//! clean error instead of reading past the end.

pub mod cursor;
pub mod interleave;
pub mod mix;
pub mod song;
pub mod tracker;
pub mod ym;
pub mod ym6;

pub use cursor::ByteCursor;
pub use interleave::deinterleave_stream;
pub use song::{
    DigiDrum, MixBlock, SongAttributes, SongBody, SongDescriptor, SongFormat, SongMetadata,
    SongSummary,
};

use crate::{Result, YmError};
use num_derive::FromPrimitive;
use num_traits::FromPrimitive;
use ym::LegacyKind;

/// Signature following the tag in YM5+/MIX1/YMT files
pub const LEONARD_SIGNATURE: &[u8; 8] = b"LeOnArD!";

/// Container tags, read as big-endian u32
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum FormatTag {
    /// `YM2!`
    Ym2 = 0x594D_3221,
    /// `YM3!`
    Ym3 = 0x594D_3321,
    /// `YM3b`
    Ym3b = 0x594D_3362,
    /// `YM4!`, recognised but no longer supported
    Ym4 = 0x594D_3421,
    /// `YM5!`
    Ym5 = 0x594D_3521,
    /// `YM6!`
    Ym6 = 0x594D_3621,
    /// `MIX1`
    Mix1 = 0x4D49_5831,
    /// `YMT1`
    Ymt1 = 0x594D_5431,
    /// `YMT2`
    Ymt2 = 0x594D_5432,
}

impl FormatTag {
    /// Identify a buffer by its first four bytes
    pub fn detect(data: &[u8]) -> Result<FormatTag> {
        let raw = ByteCursor::new(data).read_be_u32("format tag")?;
        FormatTag::from_u32(raw).ok_or_else(|| YmError::UnknownFormat(describe_tag(raw)))
    }
}

fn describe_tag(raw: u32) -> String {
    let bytes = raw.to_be_bytes();
    if bytes.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        format!("'{}'", String::from_utf8_lossy(&bytes))
    } else {
        format!("{:#010x}", raw)
    }
}

/// Consume and check the `"LeOnArD!"` signature
pub(crate) fn expect_signature(cursor: &mut ByteCursor) -> Result<()> {
    let found = cursor.take(LEONARD_SIGNATURE.len(), "signature")?;
    if found != LEONARD_SIGNATURE {
        return Err(YmError::InvalidFormat(format!(
            "Not a valid YM format (signature {:?})",
            String::from_utf8_lossy(found)
        )));
    }
    Ok(())
}

/// Decode a depacked buffer into a song
///
/// Takes ownership so the frame stream can be cut out of the buffer
/// without a second copy. On success the stream is frame-major.
pub fn decode(buffer: Vec<u8>) -> Result<SongDescriptor> {
    let tag = FormatTag::detect(&buffer)?;
    log::debug!("decoding {:?} ({} bytes)", tag, buffer.len());

    let mut song = match tag {
        FormatTag::Ym2 => ym::decode_legacy(buffer, LegacyKind::Ym2)?,
        FormatTag::Ym3 => ym::decode_legacy(buffer, LegacyKind::Ym3)?,
        FormatTag::Ym3b => ym::decode_legacy(buffer, LegacyKind::Ym3b)?,
        FormatTag::Ym4 => {
            return Err(YmError::InvalidFormat(
                "No more YM4! support. Use YM5! format.".into(),
            ))
        }
        FormatTag::Ym5 | FormatTag::Ym6 => ym6::decode_extended(buffer, tag)?,
        FormatTag::Mix1 => mix::decode_mix(buffer)?,
        FormatTag::Ymt1 | FormatTag::Ymt2 => tracker::decode_tracker(buffer, tag)?,
    };
    song.deinterleave()?;
    Ok(song)
}
