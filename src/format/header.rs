//! DM4 global header and byte order resolution.
//!
//! # Global Header Structure (16 bytes, big-endian)
//! ```text
//! Bytes 0-3:   Version
//! Bytes 4-11:  Root length
//! Bytes 12-15: Byte order flag
//! ```
//!
//! # Root Directory Header (10 bytes)
//! ```text
//! Byte 16:     Sorted flag (value byte order)
//! Byte 17:     Closed flag (value byte order)
//! Bytes 18-25: Tag count (big-endian)
//! ```
//!
//! DM4 mixes two byte orders. Structural fields are always big-endian. Value
//! bytes of data tags are little-endian in every file Digital Micrograph
//! writes, whatever the stored flag says. The flag is kept on
//! [`GlobalHeader`] but does not change how values decode.

use std::io::{Read, Seek};

use serde::Serialize;
use tracing::debug;

use crate::error::IoError;
use crate::io::StructuralRead;

use super::tags::DirectoryHeader;

// =============================================================================
// Constants
// =============================================================================

/// Size of the global header in bytes.
pub const GLOBAL_HEADER_SIZE: u64 = 4 + 8 + 4;

/// Size of the root directory header in bytes.
pub const ROOT_DIRECTORY_HEADER_SIZE: u64 = 1 + 1 + 8;

/// Byte order flag stored by Digital Micrograph on little-endian hosts.
const LITTLE_ENDIAN_FLAG: u32 = 1;

// =============================================================================
// Endian
// =============================================================================

/// Byte order of the value bytes in a DM4 file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Resolve the stored byte order flag.
    ///
    /// This is a fixed wire contract observed in real files: value bytes
    /// decode little-endian for every flag value, including `0`. A flag
    /// other than `1` is logged and otherwise ignored. Use
    /// [`ReaderOptions::with_byte_order`](crate::ReaderOptions::with_byte_order)
    /// to force big-endian values.
    pub fn from_flag(flag: u32) -> Self {
        if flag != LITTLE_ENDIAN_FLAG {
            debug!(flag, "byte order flag is not 1, reading values little-endian");
        }
        Endian::Little
    }

    /// Byte order of the host.
    #[inline]
    pub const fn native() -> Self {
        if cfg!(target_endian = "little") {
            Endian::Little
        } else {
            Endian::Big
        }
    }

    /// Whether values in this order must be swapped to be used on this host.
    #[inline]
    pub fn needs_swap(self) -> bool {
        self != Self::native()
    }

    /// Read a one-byte directory flag (sorted/closed).
    ///
    /// Single bytes have no byte order, so this is the same for both
    /// variants; it exists so call sites state which convention a field uses.
    pub fn read_flag<R: Read + Seek + ?Sized>(self, stream: &mut R) -> Result<bool, IoError> {
        Ok(stream.read_be_i8()? != 0)
    }
}

// =============================================================================
// GlobalHeader
// =============================================================================

/// Parsed DM4 global header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GlobalHeader {
    /// Format version; any value is accepted
    pub version: u32,

    /// Length of the root tag directory
    pub root_length: u64,

    /// Raw byte order flag
    pub byte_order_flag: u32,

    /// True when the stored byte order flag is 1
    pub little_endian: bool,
}

impl GlobalHeader {
    /// Read the global header from the start of the stream.
    ///
    /// Seeks to offset 0 first, so it can be called repeatedly. Leaves the
    /// cursor at [`GLOBAL_HEADER_SIZE`].
    pub fn read<R: Read + Seek + ?Sized>(stream: &mut R) -> Result<Self, IoError> {
        stream.seek_to(0)?;

        let version = stream.read_be_u32()?;
        let root_length = stream.read_be_u64()?;
        let byte_order = stream.read_be_u32()?;

        Ok(GlobalHeader {
            version,
            root_length,
            byte_order_flag: byte_order,
            little_endian: byte_order == LITTLE_ENDIAN_FLAG,
        })
    }

    /// Byte order of the value bytes in this file.
    pub fn endian(&self) -> Endian {
        Endian::from_flag(self.byte_order_flag)
    }
}

/// Read the root directory header that follows the global header.
///
/// The root directory has no name and no byte length of its own; its
/// children start immediately after the tag count.
pub fn read_root_directory_header<R: Read + Seek + ?Sized>(
    stream: &mut R,
    endian: Endian,
) -> Result<DirectoryHeader, IoError> {
    stream.seek_to(GLOBAL_HEADER_SIZE)?;

    let sorted = endian.read_flag(stream)?;
    let closed = endian.read_flag(stream)?;
    let num_tags = stream.read_be_u64()?;

    Ok(DirectoryHeader::root(
        sorted,
        closed,
        num_tags,
        GLOBAL_HEADER_SIZE + ROOT_DIRECTORY_HEADER_SIZE,
    ))
}

// =============================================================================
// Tests
// =============================================================================
