//! YMT1/YMT2 universal tracker decoder
//!
//! Tracker songs carry up to eight voices of 4-byte lines per frame plus a
//! bank of 16-bit sized samples. YMT2 adds a repeat length per sample and
//! packs a frequency shift into the top nibble of the attributes.

use super::cursor::ByteCursor;
use super::song::{
    take_region, try_alloc, try_copy, DigiDrum, SongAttributes, SongBody, SongDescriptor,
    SongFormat, SongMetadata, ATARI_CLOCK,
};
use super::{expect_signature, FormatTag};
use crate::{Result, YmError};

/// Maximum number of tracker voices
pub const MAX_VOICES: usize = 8;

/// Bytes per voice per frame
pub const TRACKER_LINE_SIZE: usize = 4;

/// Frame counts at or above this are rejected
pub const MAX_TRACKER_FRAMES: u32 = 0x8000_0000 / (MAX_VOICES * TRACKER_LINE_SIZE) as u32;

const TRACKER_PLAYER: &str = "Universal Tracker";

/// Decode a YMT1 or YMT2 file
pub fn decode_tracker(buffer: Vec<u8>, tag: FormatTag) -> Result<SongDescriptor> {
    let (format, song_type) = match tag {
        FormatTag::Ymt1 => (SongFormat::Tracker1, "YM-T1"),
        FormatTag::Ymt2 => (SongFormat::Tracker2, "YM-T2"),
        other => {
            return Err(YmError::InvalidFormat(format!(
                "{:?} is not a tracker format",
                other
            )))
        }
    };

    let mut cursor = ByteCursor::at(&buffer, 4)?;
    expect_signature(&mut cursor)?;

    let voices = usize::from(cursor.read_be_u16("voice count")?);
    let player_rate = cursor.read_be_u16("player rate")?;
    let frame_count = cursor.read_be_u32("frame count")?;
    let loop_frame = cursor.read_be_u32("loop frame")?;
    let drum_count = cursor.read_be_u16("sample count")?;
    let mut raw_attributes = cursor.read_be_u32("attributes")?;

    if voices == 0 || voices > MAX_VOICES {
        return Err(YmError::InvalidFormat(format!(
            "Voice count {} outside 1..={}",
            voices, MAX_VOICES
        )));
    }
    if frame_count >= MAX_TRACKER_FRAMES {
        return Err(YmError::InvalidFormat(format!(
            "Too many frames ({})",
            frame_count
        )));
    }

    let metadata = SongMetadata {
        name: cursor.read_nt_string("song name")?,
        author: cursor.read_nt_string("author")?,
        comment: cursor.read_nt_string("comment")?,
        song_type: song_type.to_string(),
        player: TRACKER_PLAYER.to_string(),
    };

    let header_len = if format == SongFormat::Tracker2 { 6 } else { 2 };
    let mut digidrums = try_alloc(
        usize::from(drum_count).min(cursor.remaining() / header_len),
        "tracker sample table",
    )?;
    for _ in 0..drum_count {
        let size = usize::from(cursor.read_be_u16("sample size")?);
        let repeat_len = if format == SongFormat::Tracker2 {
            let repeat = usize::from(cursor.read_be_u16("sample repeat length")?);
            let _flags = cursor.read_be_u16("sample flags")?;
            repeat.min(size)
        } else {
            size
        };
        let data = try_copy(cursor.take(size, "tracker sample")?, "tracker sample")?;
        digidrums.push(DigiDrum { data, repeat_len });
    }

    let freq_shift = if format == SongFormat::Tracker2 {
        let shift = ((raw_attributes >> 28) & 15) as u8;
        raw_attributes &= 0x0fff_ffff;
        shift
    } else {
        0
    };
    let attributes = SongAttributes::from_bits_retain(raw_attributes) | SongAttributes::TIME_CONTROL;

    let stride = voices * TRACKER_LINE_SIZE;
    let stream_len = frame_count as usize * stride;
    if cursor.remaining() < stream_len {
        return Err(YmError::Truncated(format!(
            "{} frames of {} voices need {} bytes, {} left",
            frame_count,
            voices,
            stream_len,
            cursor.remaining()
        )));
    }
    let stream_start = cursor.position();

    log::debug!(
        "{}: {} voices, {} frames, {} samples, freq shift {}",
        song_type,
        voices,
        frame_count,
        digidrums.len(),
        freq_shift
    );

    Ok(SongDescriptor {
        format,
        frame_count,
        loop_frame,
        stream_stride: stride,
        clock: ATARI_CLOCK,
        player_rate,
        attributes,
        digidrums,
        metadata,
        body: SongBody::Tracker {
            voices,
            freq_shift,
            stream: take_region(buffer, stream_start, stream_len)?,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample {
        data: Vec<u8>,
        repeat: u16,
    }

    fn tracker_file(
        tag: &[u8; 4],
        voices: u16,
        frames: u32,
        attributes: u32,
        samples: &[Sample],
    ) -> Vec<u8> {
        let ymt2 = tag == b"YMT2";
        let mut data = Vec::new();
        data.extend_from_slice(tag);
        data.extend_from_slice(b"LeOnArD!");
        data.extend_from_slice(&voices.to_be_bytes());
        data.extend_from_slice(&50u16.to_be_bytes());
        data.extend_from_slice(&frames.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes());
        data.extend_from_slice(&(samples.len() as u16).to_be_bytes());
        data.extend_from_slice(&attributes.to_be_bytes());
        data.extend_from_slice(b"Tune\0Composer\0Note\0");
        for sample in samples {
            data.extend_from_slice(&(sample.data.len() as u16).to_be_bytes());
            if ymt2 {
                data.extend_from_slice(&sample.repeat.to_be_bytes());
                data.extend_from_slice(&0u16.to_be_bytes());
            }
            data.extend_from_slice(&sample.data);
        }
        data.extend((0..frames as usize * voices as usize * 4).map(|i| i as u8));
        data
    }

    #[test]
    fn test_decode_ymt1() {
        let samples = [Sample {
            data: vec![1, 2, 3],
            repeat: 0,
        }];
        let song = decode_tracker(tracker_file(b"YMT1", 3, 5, 1, &samples), FormatTag::Ymt1)
            .unwrap();
        assert_eq!(song.format, SongFormat::Tracker1);
        assert_eq!(song.stream_stride, 12);
        assert_eq!(song.frame_stream().len(), 60);
        assert_eq!(song.loop_frame, 1);
        assert_eq!(song.clock, 2_000_000);
        assert_eq!(song.digidrums[0].repeat_len, 3);
        assert_eq!(song.metadata.song_type, "YM-T1");
        assert_eq!(song.metadata.player, "Universal Tracker");
        assert!(song.is_interleaved());
        match song.body {
            SongBody::Tracker {
                voices, freq_shift, ..
            } => {
                assert_eq!(voices, 3);
                assert_eq!(freq_shift, 0);
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_decode_ymt2_shift_and_repeat() {
        let samples = [
            Sample {
                data: vec![9; 10],
                repeat: 4,
            },
            Sample {
                data: vec![7; 2],
                repeat: 50,
            },
        ];
        let attributes = 0x3000_0000 | 1;
        let song = decode_tracker(
            tracker_file(b"YMT2", 8, 2, attributes, &samples),
            FormatTag::Ymt2,
        )
        .unwrap();
        assert_eq!(song.metadata.song_type, "YM-T2");
        assert_eq!(song.digidrums[0].repeat_len, 4);
        assert_eq!(song.digidrums[1].repeat_len, 2);
        assert_eq!(song.attributes.bits() & 0xF000_0000, 0);
        assert_eq!(song.stream_stride, 32);
        match song.body {
            SongBody::Tracker { freq_shift, .. } => assert_eq!(freq_shift, 3),
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[test]
    fn test_voice_count_bounds() {
        for voices in [0u16, 9] {
            let err = decode_tracker(tracker_file(b"YMT1", voices, 1, 0, &[]), FormatTag::Ymt1)
                .unwrap_err();
            assert!(matches!(err, YmError::InvalidFormat(_)));
        }
    }

    #[test]
    fn test_frame_count_limit() {
        let mut data = tracker_file(b"YMT1", 1, 0, 0, &[]);
        data[16..20].copy_from_slice(&MAX_TRACKER_FRAMES.to_be_bytes());
        assert!(matches!(
            decode_tracker(data, FormatTag::Ymt1),
            Err(YmError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_stream_truncated() {
        let mut data = tracker_file(b"YMT1", 2, 4, 0, &[]);
        data.pop();
        assert!(matches!(
            decode_tracker(data, FormatTag::Ymt1),
            Err(YmError::Truncated(_))
        ));
    }
}
