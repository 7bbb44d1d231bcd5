//! Tag header parsing.
//!
//! Each entry in a tag directory starts with a one-byte tag type:
//!
//! ```text
//! Data tag (type != 0, != 20):
//!   [1]  tag type
//!   [2]  name length (big-endian)
//!   [n]  name (UTF-8)
//!   [8]  byte length of the payload (big-endian)
//!   payload:
//!     [4]    "%%%%"
//!     [8]    type info count N (big-endian)
//!     [8*N]  type info (big-endian i64)
//!     [...]  value bytes (file byte order)
//!
//! Directory tag (type 20):
//!   [1]  tag type
//!   [2]  name length (big-endian)
//!   [n]  name (UTF-8)
//!   [8]  byte length (big-endian)
//!   [1]  sorted flag
//!   [1]  closed flag
//!   [8]  tag count (big-endian)
//!   children follow immediately
//!
//! Sentinel (type 0): no more entries
//! ```
//!
//! Reading a data tag header never reads value bytes. The cursor is moved to
//! the end of the payload so the next call reads the next sibling.

use std::io::{Read, Seek};

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{Dm4Error, Result};
use crate::io::StructuralRead;

use super::header::Endian;

// =============================================================================
// Constants
// =============================================================================

/// Tag type of a directory entry.
pub const DIRECTORY_TAG_TYPE: u8 = 20;

/// Tag type marking the end of the available entries.
pub const END_TAG_TYPE: u8 = 0;

/// Verification marker at the start of every data tag payload.
pub const TAG_MARKER: &[u8; 4] = b"%%%%";

// =============================================================================
// Header Types
// =============================================================================

/// Header of a data tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagHeader {
    /// Tag type byte (21 in files written by Digital Micrograph)
    pub type_code: u8,

    /// Tag name, absent for anonymous tags
    pub name: Option<String>,

    /// Payload length, measured from `data_offset`
    pub byte_length: u64,

    /// Number of entries in the payload's type info list
    pub type_info_len: u64,

    /// First type info entry; selects scalar, group, or array decoding
    pub data_type_code: i64,

    /// Offset of the tag type byte
    pub header_offset: u64,

    /// Offset of the payload marker
    pub data_offset: u64,
}

impl TagHeader {
    /// Offset of the entry that follows this tag.
    ///
    /// Headers read from a file never overflow here; hand-built headers
    /// saturate at `u64::MAX`.
    #[inline]
    pub fn end_offset(&self) -> u64 {
        self.data_offset.saturating_add(self.byte_length)
    }
}

/// Header of a tag directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryHeader {
    /// Always [`DIRECTORY_TAG_TYPE`]
    pub type_code: u8,

    /// Directory name, absent for anonymous directories and the root
    pub name: Option<String>,

    pub byte_length: u64,
    pub sorted: bool,
    pub closed: bool,

    /// Number of child entries declared by the file
    pub num_tags: u64,

    /// Offset of the first child entry
    pub child_base_offset: u64,
}

impl DirectoryHeader {
    /// Header for the synthetic root directory.
    pub fn root(sorted: bool, closed: bool, num_tags: u64, child_base_offset: u64) -> Self {
        DirectoryHeader {
            type_code: DIRECTORY_TAG_TYPE,
            name: None,
            byte_length: 0,
            sorted,
            closed,
            num_tags,
            child_base_offset,
        }
    }
}

/// One entry read from a tag directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEntry {
    /// Type 0: no further siblings
    End,
    Directory(DirectoryHeader),
    Tag(TagHeader),
}

// =============================================================================
// Reading
// =============================================================================

/// Read the entry at the current cursor position.
///
/// For data tags the cursor is left at `data_offset + byte_length`. For
/// directories it is left at `child_base_offset`.
pub fn read_tag_entry<R: Read + Seek + ?Sized>(stream: &mut R, endian: Endian) -> Result<TagEntry> {
    let header_offset = stream.offset()?;
    let tag_type = stream.read_be_u8()?;

    match tag_type {
        END_TAG_TYPE => {
            trace!(offset = header_offset, "end of tag entries");
            Ok(TagEntry::End)
        }
        DIRECTORY_TAG_TYPE => read_directory_header(stream, endian).map(TagEntry::Directory),
        _ => read_data_tag_header(stream, tag_type, header_offset).map(TagEntry::Tag),
    }
}

fn read_data_tag_header<R: Read + Seek + ?Sized>(
    stream: &mut R,
    type_code: u8,
    header_offset: u64,
) -> Result<TagHeader> {
    let name = read_tag_name(stream)?;
    let byte_length = stream.read_be_u64()?;
    let data_offset = stream.offset()?;

    if data_offset.checked_add(byte_length).is_none() {
        return Err(Dm4Error::StructuralCorruption {
            offset: data_offset,
            reason: format!(
                "payload length {} runs past the largest addressable offset",
                byte_length
            ),
        });
    }

    check_marker(stream, data_offset)?;
    let type_info = read_type_info(stream, data_offset, byte_length)?;

    let tag = TagHeader {
        type_code,
        name,
        byte_length,
        type_info_len: type_info.len() as u64,
        data_type_code: type_info[0],
        header_offset,
        data_offset,
    };

    trace!(
        name = ?tag.name,
        data_type = tag.data_type_code,
        byte_length,
        "read tag header"
    );

    stream.seek_to(tag.end_offset())?;
    Ok(tag)
}

fn read_directory_header<R: Read + Seek + ?Sized>(
    stream: &mut R,
    endian: Endian,
) -> Result<DirectoryHeader> {
    let name = read_tag_name(stream)?;
    let byte_length = stream.read_be_u64()?;
    let sorted = endian.read_flag(stream)?;
    let closed = endian.read_flag(stream)?;
    let num_tags = stream.read_be_u64()?;
    let child_base_offset = stream.offset()?;

    Ok(DirectoryHeader {
        type_code: DIRECTORY_TAG_TYPE,
        name,
        byte_length,
        sorted,
        closed,
        num_tags,
        child_base_offset,
    })
}

/// Read a length-prefixed tag name.
///
/// A zero length yields `None`. Bytes that are not valid UTF-8 also yield
/// `None`; a bad name never fails the read.
fn read_tag_name<R: Read + Seek + ?Sized>(stream: &mut R) -> Result<Option<String>> {
    let len = stream.read_be_u16()?;
    if len == 0 {
        return Ok(None);
    }

    let offset = stream.offset()?;
    let bytes = stream.read_vec(len as usize)?;

    match decode_tag_name(bytes, offset) {
        Ok(name) => Ok(Some(name)),
        Err(e) => {
            debug!("{}; treating tag as anonymous", e);
            Ok(None)
        }
    }
}

/// Decode raw tag name bytes read at `offset`.
pub fn decode_tag_name(bytes: Vec<u8>, offset: u64) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| Dm4Error::NameDecode { offset })
}

/// Verify the `%%%%` marker at the current position (`offset`).
pub(crate) fn check_marker<R: Read + Seek + ?Sized>(stream: &mut R, offset: u64) -> Result<()> {
    let mut marker = [0u8; 4];
    stream.read_exact_bytes(&mut marker)?;

    if &marker != TAG_MARKER {
        return Err(Dm4Error::StructuralCorruption {
            offset,
            reason: format!(
                "expected tag marker \"%%%%\", found {:02X?}; the file is not DM4 or is corrupted",
                marker
            ),
        });
    }
    Ok(())
}

/// Read the type info list that follows the marker.
///
/// The list is bounded by the payload length so a corrupt count cannot
/// trigger an unbounded allocation.
pub(crate) fn read_type_info<R: Read + Seek + ?Sized>(
    stream: &mut R,
    data_offset: u64,
    byte_length: u64,
) -> Result<Vec<i64>> {
    let count = stream.read_be_u64()?;

    let required = count
        .checked_mul(8)
        .and_then(|n| n.checked_add((TAG_MARKER.len() + 8) as u64));
    match required {
        Some(required) if required <= byte_length => {}
        _ => {
            return Err(Dm4Error::StructuralCorruption {
                offset: data_offset,
                reason: format!(
                    "type info count {} does not fit in payload of {} bytes",
                    count, byte_length
                ),
            })
        }
    }
    if count == 0 {
        return Err(Dm4Error::StructuralCorruption {
            offset: data_offset,
            reason: "payload has an empty type info list".to_string(),
        });
    }

    (0..count)
        .map(|_| stream.read_be_i64().map_err(Dm4Error::from))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
