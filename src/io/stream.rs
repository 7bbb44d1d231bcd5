//! Positioned structural reads over a seekable stream.
//!
//! Every structural field in a DM4 file (lengths, counts, type-code lists) is
//! stored big-endian regardless of the byte order flag in the file header.
//! This module provides an extension trait that reads those fields and maps
//! failures to [`IoError::Read`] with the offset at which they occurred.

use std::io::{Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::IoError;

/// Extension trait for reading fixed big-endian fields from a seekable stream.
///
/// Implemented for every `Read + Seek` type, in the same spirit as
/// `byteorder::ReadBytesExt`.
pub trait StructuralRead: Read + Seek {
    /// Current absolute position of the stream cursor.
    fn offset(&mut self) -> Result<u64, IoError> {
        self.stream_position().map_err(|e| IoError::read(0, e))
    }

    /// Move the cursor to an absolute offset.
    fn seek_to(&mut self, offset: u64) -> Result<(), IoError> {
        self.seek(SeekFrom::Start(offset))
            .map(|_| ())
            .map_err(|e| IoError::read(offset, e))
    }

    fn read_be_u8(&mut self) -> Result<u8, IoError> {
        let result = ReadBytesExt::read_u8(self);
        result.map_err(|e| failed_at(self, e))
    }

    fn read_be_i8(&mut self) -> Result<i8, IoError> {
        let result = ReadBytesExt::read_i8(self);
        result.map_err(|e| failed_at(self, e))
    }

    fn read_be_u16(&mut self) -> Result<u16, IoError> {
        let result = self.read_u16::<BigEndian>();
        result.map_err(|e| failed_at(self, e))
    }

    fn read_be_u32(&mut self) -> Result<u32, IoError> {
        let result = self.read_u32::<BigEndian>();
        result.map_err(|e| failed_at(self, e))
    }

    fn read_be_u64(&mut self) -> Result<u64, IoError> {
        let result = self.read_u64::<BigEndian>();
        result.map_err(|e| failed_at(self, e))
    }

    fn read_be_i64(&mut self) -> Result<i64, IoError> {
        let result = self.read_i64::<BigEndian>();
        result.map_err(|e| failed_at(self, e))
    }

    /// Fill `buf` completely from the current position.
    fn read_exact_bytes(&mut self, buf: &mut [u8]) -> Result<(), IoError> {
        let result = self.read_exact(buf);
        result.map_err(|e| failed_at(self, e))
    }

    /// Read `len` bytes into a freshly allocated buffer.
    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>, IoError> {
        let mut buf = vec![0u8; len];
        self.read_exact_bytes(&mut buf)?;
        Ok(buf)
    }
}

impl<R: Read + Seek + ?Sized> StructuralRead for R {}

/// Attach the cursor position to a failed read.
fn failed_at<R: Seek + ?Sized>(stream: &mut R, err: std::io::Error) -> IoError {
    let offset = stream.stream_position().unwrap_or(u64::MAX);
    IoError::read(offset, err)
}
