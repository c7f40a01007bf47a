//! YM File Loader
//!
//! Reads YM files from disk or memory and runs them through depack and
//! decode.

use crate::ym_parser::song::try_alloc;
use crate::ym_parser::{self, SongDescriptor};
use crate::{compression, Result, YmError};
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Loads YM files from disk or memory
pub struct YmFileLoader;

impl YmFileLoader {
    /// Read a file whole, checking that every byte arrived
    ///
    /// An empty file is an I/O error.
    pub fn read(path: &Path) -> Result<Vec<u8>> {
        let mut file = File::open(path).map_err(|e| {
            YmError::Io(io::Error::new(
                e.kind(),
                format!("Unable to open file '{}': {}", path.display(), e),
            ))
        })?;
        let expected = file.metadata()?.len();
        if expected == 0 {
            return Err(empty_input(&path.display().to_string()));
        }
        let expected = usize::try_from(expected)
            .map_err(|_| YmError::OutOfMemory(format!("{} byte file", expected)))?;

        let mut data = try_alloc(expected, "file buffer")?;
        file.read_to_end(&mut data)?;
        if data.len() != expected {
            return Err(YmError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "File is corrupted: read {} of {} bytes from '{}'",
                    data.len(),
                    expected,
                    path.display()
                ),
            )));
        }
        Ok(data)
    }

    /// Load and decode a file from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<SongDescriptor> {
        let data = Self::read(path.as_ref())?;
        Self::load_bytes(data)
    }

    /// Depack and decode an owned buffer
    pub fn load_bytes(data: Vec<u8>) -> Result<SongDescriptor> {
        if data.is_empty() {
            return Err(empty_input("memory buffer"));
        }
        let data = compression::depack_if_needed(data)?;
        ym_parser::decode(data)
    }

    /// Copy a caller-owned slice and decode it
    pub fn load_slice(bytes: &[u8]) -> Result<SongDescriptor> {
        if bytes.is_empty() {
            return Err(empty_input("memory buffer"));
        }
        let mut data = try_alloc(bytes.len(), "song copy")?;
        data.extend_from_slice(bytes);
        Self::load_bytes(data)
    }
}

fn empty_input(source: &str) -> YmError {
    YmError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("{} is empty", source),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_buffer_is_io_error() {
        assert!(matches!(
            YmFileLoader::load_slice(&[]),
            Err(YmError::Io(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = YmFileLoader::load("/nonexistent/dir/song.ym").unwrap_err();
        assert!(matches!(err, YmError::Io(_)));
        assert!(err.to_string().contains("song.ym"));
    }

    #[test]
    fn test_load_slice_plain_and_packed() {
        let mut plain = b"YM2!".to_vec();
        plain.extend_from_slice(&[0; 28]);
        let song = YmFileLoader::load_slice(&plain).unwrap();
        assert_eq!(song.frame_count, 2);

        let packed = crate::compression::tests::stored_archive("song.ym", &plain);
        let song = YmFileLoader::load_slice(&packed).unwrap();
        assert_eq!(song.frame_count, 2);
        assert_eq!(song.metadata.song_type, "YM 2");
    }
}
