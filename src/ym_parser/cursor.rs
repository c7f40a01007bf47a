//! Bounds-checked read cursor over a loaded YM buffer
//!
//! Every read checks the remaining length before consuming anything. A read
//! that does not fit fails with [`YmError::Truncated`] and leaves the cursor
//! where it was, so `position() + remaining() == len()` holds at all times.

use crate::{Result, YmError};
use nom::bytes::complete::{tag, take, take_till};
use nom::number::complete::{be_u16, be_u32, le_u32};
use nom::sequence::terminated;
use nom::IResult;

type ByteResult<'a, O> = IResult<&'a [u8], O, nom::error::Error<&'a [u8]>>;

/// Read cursor with remaining-length accounting
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    /// Cursor at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    /// Cursor at `pos`, which must lie within `data`
    pub fn at(data: &'a [u8], pos: usize) -> Result<Self> {
        if pos > data.len() {
            return Err(YmError::Truncated(format!(
                "offset {} is past the end of a {} byte buffer",
                pos,
                data.len()
            )));
        }
        Ok(ByteCursor { data, pos })
    }

    /// Bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Total length of the underlying buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when nothing is left to read
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn run<O>(
        &mut self,
        what: &str,
        parser: impl FnOnce(&'a [u8]) -> ByteResult<'a, O>,
    ) -> Result<O> {
        match parser(&self.data[self.pos..]) {
            Ok((rest, value)) => {
                self.pos = self.data.len() - rest.len();
                Ok(value)
            }
            Err(_) => Err(YmError::Truncated(format!(
                "{} at offset {} ({} bytes left)",
                what,
                self.pos,
                self.remaining()
            ))),
        }
    }

    /// Big-endian ("Motorola") 32-bit read
    pub fn read_be_u32(&mut self, what: &str) -> Result<u32> {
        self.run(what, be_u32)
    }

    /// Big-endian ("Motorola") 16-bit read
    pub fn read_be_u16(&mut self, what: &str) -> Result<u16> {
        self.run(what, be_u16)
    }

    /// Little-endian 32-bit read
    pub fn read_le_u32(&mut self, what: &str) -> Result<u32> {
        self.run(what, le_u32)
    }

    /// Borrow the next `len` bytes
    pub fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        self.run(what, |input| take(len)(input))
    }

    /// Skip `len` bytes
    pub fn skip(&mut self, len: usize, what: &str) -> Result<()> {
        self.take(len, what).map(|_| ())
    }

    /// Null-terminated string, decoded as Latin-1
    ///
    /// Fails when no terminator is found before the end of the buffer,
    /// including when the buffer is already exhausted.
    pub fn read_nt_string(&mut self, what: &str) -> Result<String> {
        let bytes = self.run(what, |input| {
            terminated(take_till(|b: u8| b == 0), tag(&b"\0"[..]))(input)
        })?;
        Ok(bytes.iter().map(|&b| char::from(b)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_reads() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_be_u32("dword").unwrap(), 0x1234_5678);
        assert_eq!(cursor.read_be_u16("word").unwrap(), 0x9ABC);
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_little_endian_read() {
        let data = 7u32.to_le_bytes();
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_le_u32("loop").unwrap(), 7);
    }

    #[test]
    fn test_short_read_does_not_advance() {
        let data = [1, 2, 3];
        let mut cursor = ByteCursor::new(&data);
        let err = cursor.read_be_u32("frame count").unwrap_err();
        assert!(matches!(err, YmError::Truncated(_)));
        assert!(err.to_string().contains("frame count"));
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.remaining(), 3);
        assert_eq!(cursor.read_be_u16("word").unwrap(), 0x0102);
        assert_eq!(cursor.position() + cursor.remaining(), cursor.len());
    }

    #[test]
    fn test_nt_string() {
        let data = b"Title\0Author\0";
        let mut cursor = ByteCursor::new(data);
        assert_eq!(cursor.read_nt_string("name").unwrap(), "Title");
        assert_eq!(cursor.read_nt_string("author").unwrap(), "Author");
        assert_eq!(cursor.position(), data.len());
    }

    #[test]
    fn test_nt_string_empty_and_latin1() {
        let data = [0u8, 0xE9, b'!', 0];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_nt_string("empty").unwrap(), "");
        assert_eq!(cursor.read_nt_string("accent").unwrap(), "\u{e9}!");
    }

    #[test]
    fn test_nt_string_unterminated_fails_cleanly() {
        let data = b"no terminator";
        let mut cursor = ByteCursor::new(data);
        assert!(cursor.read_nt_string("comment").is_err());
        assert_eq!(cursor.position(), 0);

        let mut exhausted = ByteCursor::at(data, data.len()).unwrap();
        assert!(exhausted.read_nt_string("comment").is_err());
        assert_eq!(exhausted.remaining(), 0);
    }

    #[test]
    fn test_take_and_skip() {
        let data = [1, 2, 3, 4, 5];
        let mut cursor = ByteCursor::at(&data, 1).unwrap();
        assert_eq!(cursor.take(2, "bytes").unwrap(), &[2, 3]);
        assert!(cursor.skip(3, "extra").is_err());
        cursor.skip(2, "extra").unwrap();
        assert!(cursor.is_empty());
        assert!(ByteCursor::at(&data, 6).is_err());
    }
}
