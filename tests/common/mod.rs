//! Synthetic song files shared by the integration tests
#![allow(dead_code)]

pub const SIGNATURE: &[u8] = b"LeOnArD!";

/// YM3! dump, plane-major, `frames` frames of 14 registers
pub fn ym3(frames: usize) -> Vec<u8> {
    let mut data = b"YM3!".to_vec();
    for reg in 0..14 {
        data.extend((0..frames).map(|f| (reg * 16 + f) as u8));
    }
    data
}

/// YM3b dump with a little-endian loop trailer
pub fn ym3b(frames: usize, loop_frame: u32) -> Vec<u8> {
    let mut data = ym3(frames);
    data[..4].copy_from_slice(b"YM3b");
    data.extend_from_slice(&loop_frame.to_le_bytes());
    data
}

/// YM6! file with interleaved stream, two 8-bit drums and no trailer
pub fn ym6(frames: u32) -> Vec<u8> {
    let mut data = b"YM6!".to_vec();
    data.extend_from_slice(SIGNATURE);
    data.extend_from_slice(&frames.to_be_bytes());
    data.extend_from_slice(&1u32.to_be_bytes()); // interleaved
    data.extend_from_slice(&2u16.to_be_bytes()); // drums
    data.extend_from_slice(&2_000_000u32.to_be_bytes());
    data.extend_from_slice(&50u16.to_be_bytes());
    data.extend_from_slice(&0u32.to_be_bytes()); // loop frame
    data.extend_from_slice(&2u16.to_be_bytes()); // extra data
    data.extend_from_slice(&[0xAA, 0xBB]);
    for size in [3u32, 5] {
        data.extend_from_slice(&size.to_be_bytes());
        data.extend((0..size).map(|i| i as u8 + 0x40));
    }
    data.extend_from_slice(b"Synthetic\0Tester\0Built in a test\0");
    data.extend((0..frames as usize * 16).map(|i| (i % 251) as u8));
    data
}

/// MIX1 file with unsigned samples and two blocks
pub fn mix1() -> Vec<u8> {
    let samples: Vec<u8> = (0..64u8).collect();
    let mut data = b"MIX1".to_vec();
    data.extend_from_slice(SIGNATURE);
    data.extend_from_slice(&0u32.to_be_bytes()); // unsigned samples
    data.extend_from_slice(&(samples.len() as u32).to_be_bytes());
    data.extend_from_slice(&2u32.to_be_bytes());
    for (start, len, repeat, freq) in [(0u32, 32u32, 2u16, 8000u16), (32, 32, 1, 16000)] {
        data.extend_from_slice(&start.to_be_bytes());
        data.extend_from_slice(&len.to_be_bytes());
        data.extend_from_slice(&repeat.to_be_bytes());
        data.extend_from_slice(&freq.to_be_bytes());
    }
    data.extend_from_slice(b"Mix\0Mixer\0\0");
    data.extend_from_slice(&samples);
    data
}

/// YMT2 file, interleaved, with packed frequency shift 3
pub fn ymt2(voices: u16, frames: u32) -> Vec<u8> {
    let mut data = b"YMT2".to_vec();
    data.extend_from_slice(SIGNATURE);
    data.extend_from_slice(&voices.to_be_bytes());
    data.extend_from_slice(&50u16.to_be_bytes());
    data.extend_from_slice(&frames.to_be_bytes());
    data.extend_from_slice(&0u32.to_be_bytes()); // loop frame
    data.extend_from_slice(&1u16.to_be_bytes()); // samples
    data.extend_from_slice(&(0x3000_0001u32).to_be_bytes());
    data.extend_from_slice(b"Track\0Tracker\0\0");
    data.extend_from_slice(&4u16.to_be_bytes()); // sample size
    data.extend_from_slice(&9u16.to_be_bytes()); // repeat, clamped to 4
    data.extend_from_slice(&0u16.to_be_bytes()); // flags
    data.extend_from_slice(&[1, 2, 3, 4]);
    data.extend((0..frames as usize * voices as usize * 4).map(|i| i as u8));
    data
}

fn crc16(data: &[u8]) -> u16 {
    let mut crc = 0u16;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ 0xA001 } else { crc >> 1 };
        }
    }
    crc
}

/// Level 0 `-lh0-` archive holding `content`, followed by the end marker
pub fn lha_stored(name: &str, content: &[u8]) -> Vec<u8> {
    let mut header = Vec::new();
    header.extend_from_slice(b"-lh0-");
    header.extend_from_slice(&(content.len() as u32).to_le_bytes());
    header.extend_from_slice(&(content.len() as u32).to_le_bytes());
    header.extend_from_slice(&0x5021_0000u32.to_le_bytes());
    header.push(0x20);
    header.push(0);
    header.push(name.len() as u8);
    header.extend_from_slice(name.as_bytes());
    header.extend_from_slice(&crc16(content).to_le_bytes());

    let checksum = header.iter().fold(0u8, |sum, &b| sum.wrapping_add(b));
    let mut archive = vec![header.len() as u8, checksum];
    archive.extend_from_slice(&header);
    archive.extend_from_slice(content);
    archive.push(0);
    archive
}
