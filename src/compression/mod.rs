//! LHA depack for YM files
//!
//! Most YM files in the wild are a single-entry LHA archive, usually LH5.
//! [`depack_if_needed`] detects the archive header, checks it and returns
//! the unpacked entry. Anything else passes through untouched.
//!
//! Only header levels 0 and 1 are accepted. Level 1 extension headers are
//! walked so the packed payload size can be checked against the buffer
//! before any decoding starts.

use crate::ym_parser::song::try_alloc;
use crate::{Result, YmError};
use std::io::Read;

/// Fixed part of a level 0/1 header, up to and including the name length
pub const LHA_BASE_HEADER_SIZE: usize = 22;

/// Largest accepted header level
pub const MAX_HEADER_LEVEL: u8 = 1;

/// Maximum unpacked size: 100MB
///
/// YM files are typically 10KB-1MB unpacked.
const MAX_DECOMPRESSED_SIZE: u32 = 100 * 1024 * 1024;

const METHOD_OFFSET: usize = 2;
const METHOD_LENGTH: usize = 5;
const PACKED_SIZE_OFFSET: usize = 7;
const ORIGINAL_SIZE_OFFSET: usize = 11;
const LEVEL_OFFSET: usize = 20;
const NAME_LENGTH_OFFSET: usize = 21;

/// Minimum and maximum valid compression levels in LHA
const LHA_MIN_VALID_LEVEL: u8 = b'0';
const LHA_MAX_VALID_LEVEL: u8 = b'7';

/// What the archive header says about its single entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LhaHeader {
    /// Method id, e.g. `*b"-lh5-"`
    pub method: [u8; 5],
    /// Header level (0 or 1)
    pub level: u8,
    /// Entry name
    pub name: String,
    /// Offset of the packed payload
    pub payload_offset: usize,
    /// Packed payload size, extension headers excluded
    pub packed_size: usize,
    /// Unpacked size
    pub original_size: usize,
}

impl LhaHeader {
    /// Method id as text, e.g. `"-lh5-"`
    pub fn method_name(&self) -> String {
        String::from_utf8_lossy(&self.method).into_owned()
    }
}

#[inline]
fn is_valid_compression_level(byte: u8) -> bool {
    (LHA_MIN_VALID_LEVEL..=LHA_MAX_VALID_LEVEL).contains(&byte)
}

/// True when `data` starts with an LHA header (`-lh[0-7]-` at offset 2)
///
/// A zero header-size byte means "not an archive", as does a buffer too
/// short for the fixed header.
pub fn is_lha_compressed(data: &[u8]) -> bool {
    if data.len() < LHA_BASE_HEADER_SIZE || data[0] == 0 {
        return false;
    }
    let method = &data[METHOD_OFFSET..METHOD_OFFSET + METHOD_LENGTH];
    method[0] == b'-'
        && method[1] == b'l'
        && method[2] == b'h'
        && is_valid_compression_level(method[3])
        && method[4] == b'-'
}

fn read_le_u16(data: &[u8], offset: usize, what: &str) -> Result<usize> {
    data.get(offset..offset + 2)
        .map(|b| usize::from(u16::from_le_bytes([b[0], b[1]])))
        .ok_or_else(|| YmError::Truncated(format!("LHA {} at offset {}", what, offset)))
}

fn read_le_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

/// Parse and bounds-check an LHA header
///
/// Returns `Ok(None)` when `data` is not an archive.
pub fn inspect_header(data: &[u8]) -> Result<Option<LhaHeader>> {
    if !is_lha_compressed(data) {
        return Ok(None);
    }

    let level = data[LEVEL_OFFSET];
    if level > MAX_HEADER_LEVEL {
        return Err(YmError::InvalidFormat(format!(
            "LHARC header level must be 0 or 1, found {}",
            level
        )));
    }

    let mut method = [0u8; METHOD_LENGTH];
    method.copy_from_slice(&data[METHOD_OFFSET..METHOD_OFFSET + METHOD_LENGTH]);
    let declared_packed = read_le_u32(data, PACKED_SIZE_OFFSET) as usize;
    let original_size = read_le_u32(data, ORIGINAL_SIZE_OFFSET);
    let name_len = usize::from(data[NAME_LENGTH_OFFSET]);
    let name_end = LHA_BASE_HEADER_SIZE + name_len;
    let name = data
        .get(LHA_BASE_HEADER_SIZE..name_end)
        .map(|bytes| bytes.iter().map(|&b| char::from(b)).collect::<String>())
        .ok_or_else(|| YmError::Truncated("LHA entry name".into()))?;

    // The size byte counts everything after itself and the checksum
    let mut payload_offset = 2 + usize::from(data[0]);
    // Name, then the CRC-16 of the unpacked data
    let mut fixed_end = name_end + 2;
    let mut extension_bytes = 0usize;

    if level == 1 {
        // OS id and the first extension size close the base header
        fixed_end += 3;
        if payload_offset < fixed_end {
            return Err(YmError::InvalidFormat(format!(
                "LHA level 1 header size {} is too small",
                data[0]
            )));
        }
        let mut next = read_le_u16(data, payload_offset - 2, "extension size")?;
        while next != 0 {
            // Type byte plus the trailing next-size field at minimum
            if next < 3 {
                return Err(YmError::InvalidFormat(format!(
                    "LHA extension header of {} bytes",
                    next
                )));
            }
            payload_offset += next;
            extension_bytes += next;
            next = read_le_u16(data, payload_offset - 2, "extension size")?;
        }
    } else if payload_offset < fixed_end {
        return Err(YmError::InvalidFormat(format!(
            "LHA header size {} is smaller than its {} byte name",
            data[0], name_len
        )));
    }

    let packed_size = declared_packed.checked_sub(extension_bytes).ok_or_else(|| {
        YmError::InvalidFormat(format!(
            "LHA packed size {} is smaller than its {} extension bytes",
            declared_packed, extension_bytes
        ))
    })?;

    let available = data.len().saturating_sub(payload_offset);
    if payload_offset > data.len() || packed_size > available {
        return Err(YmError::Truncated(format!(
            "LHA entry needs {} packed bytes at offset {}, {} available",
            packed_size, payload_offset, available
        )));
    }
    if original_size > MAX_DECOMPRESSED_SIZE {
        return Err(YmError::InvalidFormat(format!(
            "LHA entry claims {} unpacked bytes, limit is {}",
            original_size, MAX_DECOMPRESSED_SIZE
        )));
    }

    Ok(Some(LhaHeader {
        method,
        level,
        name,
        payload_offset,
        packed_size,
        original_size: original_size as usize,
    }))
}

/// Unpack `data` if it is an LHA archive, otherwise return it unchanged
///
/// The packed buffer is consumed whatever the outcome: on success the
/// caller only ever sees the unpacked data, on failure nothing.
pub fn depack_if_needed(data: Vec<u8>) -> Result<Vec<u8>> {
    let header = match inspect_header(&data)? {
        Some(header) => header,
        None => return Ok(data),
    };
    log::debug!(
        "LHA {} entry '{}': {} -> {} bytes (level {})",
        header.method_name(),
        header.name,
        header.packed_size,
        header.original_size,
        header.level
    );

    let unpacked = unpack(&data, &header);
    drop(data);
    unpacked
}

fn unpack(data: &[u8], header: &LhaHeader) -> Result<Vec<u8>> {
    let mut reader = delharc::LhaDecodeReader::new(data).map_err(|e| {
        YmError::DecompressionError(format!("Failed to parse LHA archive from memory: {}", e))
    })?;
    if !reader.is_decoder_supported() {
        return Err(YmError::DecompressionError(format!(
            "unsupported LHA method {}",
            header.method_name()
        )));
    }

    let mut unpacked = try_alloc(header.original_size, "unpacked YM data")?;
    reader
        .by_ref()
        .take(header.original_size as u64)
        .read_to_end(&mut unpacked)
        .map_err(|e| YmError::DecompressionError(format!("LH5 depacking error: {}", e)))?;

    if unpacked.len() != header.original_size {
        return Err(YmError::DecompressionError(format!(
            "LHA entry unpacked to {} bytes, header says {}",
            unpacked.len(),
            header.original_size
        )));
    }
    reader
        .crc_check()
        .map_err(|e| YmError::DecompressionError(format!("LHA checksum mismatch: {}", e)))?;
    Ok(unpacked)
}
