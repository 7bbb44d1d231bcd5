//! Tag value decoding.
//!
//! Values are decoded lazily, one tag at a time, from a [`TagHeader`] built
//! while walking the directory tree. Decoding re-reads the payload preamble
//! (marker and type info) and dispatches on the first type code:
//!
//! - [`GROUP_TYPE_CODE`]: `[15, name_len, F, (field_name_len, field_type) * F]`
//!   followed by F scalars packed back to back
//! - [`ARRAY_TYPE_CODE`]: `[20, element_type, count]` followed by `count`
//!   elements
//! - any registered [`DataType`]: one scalar
//!
//! # Performance Considerations
//!
//! Array payloads can hold multi-megapixel images. They are read into a typed
//! buffer with a single `read_exact` and, when the file byte order differs
//! from the host, swapped in one pass over the whole buffer.
//!
//! Whatever the outcome, the stream is left at the end of the payload.

use std::fmt;
use std::io::{Read, Seek};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use bytemuck::Pod;
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{Dm4Error, IoError, Result};
use crate::io::{RestorePosition, StructuralRead};

use super::header::Endian;
use super::tags::{check_marker, read_type_info, TagHeader, TAG_MARKER};
use super::types::{DataType, ARRAY_TYPE_CODE, GROUP_TYPE_CODE};

// =============================================================================
// Scalar
// =============================================================================

/// A single primitive value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Scalar {
    I16(i16),
    I32(i32),
    U16(u16),
    U32(u32),
    F32(f32),
    F64(f64),
    Bool(bool),
    Char(u8),
    I8(i8),
    I64(i64),
    U64(u64),
}

impl Scalar {
    pub fn data_type(&self) -> DataType {
        match self {
            Scalar::I16(_) => DataType::I16,
            Scalar::I32(_) => DataType::I32,
            Scalar::U16(_) => DataType::U16,
            Scalar::U32(_) => DataType::U32,
            Scalar::F32(_) => DataType::F32,
            Scalar::F64(_) => DataType::F64,
            Scalar::Bool(_) => DataType::Bool,
            Scalar::Char(_) => DataType::Char,
            Scalar::I8(_) => DataType::I8,
            Scalar::I64(_) => DataType::I64,
            Scalar::U64(_) => DataType::U64,
        }
    }

    /// Numeric value widened to `f64`; `None` for booleans and characters.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Scalar::I16(v) => Some(v as f64),
            Scalar::I32(v) => Some(v as f64),
            Scalar::U16(v) => Some(v as f64),
            Scalar::U32(v) => Some(v as f64),
            Scalar::F32(v) => Some(v as f64),
            Scalar::F64(v) => Some(v),
            Scalar::I8(v) => Some(v as f64),
            Scalar::I64(v) => Some(v as f64),
            Scalar::U64(v) => Some(v as f64),
            Scalar::Bool(_) | Scalar::Char(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::I16(v) => write!(f, "{}", v),
            Scalar::I32(v) => write!(f, "{}", v),
            Scalar::U16(v) => write!(f, "{}", v),
            Scalar::U32(v) => write!(f, "{}", v),
            Scalar::F32(v) => write!(f, "{}", v),
            Scalar::F64(v) => write!(f, "{}", v),
            Scalar::Bool(v) => write!(f, "{}", v),
            Scalar::Char(v) => write!(f, "{}", char::from(*v)),
            Scalar::I8(v) => write!(f, "{}", v),
            Scalar::I64(v) => write!(f, "{}", v),
            Scalar::U64(v) => write!(f, "{}", v),
        }
    }
}

// =============================================================================
// ArrayData
// =============================================================================

/// A homogeneous buffer decoded from an array payload, in host byte order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ArrayData {
    I16(Vec<i16>),
    I32(Vec<i32>),
    U16(Vec<u16>),
    U32(Vec<u32>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Char(Vec<u8>),
    I8(Vec<i8>),
    I64(Vec<i64>),
    U64(Vec<u64>),
}

impl ArrayData {
    /// Read `count` raw elements of `data_type` with one read.
    ///
    /// Element bytes are copied as stored; call [`ArrayData::byteswap`] if the
    /// file byte order differs from the host.
    pub fn read<R: Read + Seek + ?Sized>(
        stream: &mut R,
        data_type: DataType,
        count: usize,
    ) -> std::result::Result<Self, IoError> {
        Ok(match data_type {
            DataType::I16 => ArrayData::I16(read_pod_vec(stream, count)?),
            DataType::I32 => ArrayData::I32(read_pod_vec(stream, count)?),
            DataType::U16 => ArrayData::U16(read_pod_vec(stream, count)?),
            DataType::U32 => ArrayData::U32(read_pod_vec(stream, count)?),
            DataType::F32 => ArrayData::F32(read_pod_vec(stream, count)?),
            DataType::F64 => ArrayData::F64(read_pod_vec(stream, count)?),
            DataType::Bool => {
                let raw: Vec<u8> = read_pod_vec(stream, count)?;
                ArrayData::Bool(raw.into_iter().map(|b| b != 0).collect())
            }
            DataType::Char => ArrayData::Char(read_pod_vec(stream, count)?),
            DataType::I8 => ArrayData::I8(read_pod_vec(stream, count)?),
            DataType::I64 => ArrayData::I64(read_pod_vec(stream, count)?),
            DataType::U64 => ArrayData::U64(read_pod_vec(stream, count)?),
        })
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ArrayData::I16(_) => DataType::I16,
            ArrayData::I32(_) => DataType::I32,
            ArrayData::U16(_) => DataType::U16,
            ArrayData::U32(_) => DataType::U32,
            ArrayData::F32(_) => DataType::F32,
            ArrayData::F64(_) => DataType::F64,
            ArrayData::Bool(_) => DataType::Bool,
            ArrayData::Char(_) => DataType::Char,
            ArrayData::I8(_) => DataType::I8,
            ArrayData::I64(_) => DataType::I64,
            ArrayData::U64(_) => DataType::U64,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayData::I16(v) => v.len(),
            ArrayData::I32(v) => v.len(),
            ArrayData::U16(v) => v.len(),
            ArrayData::U32(v) => v.len(),
            ArrayData::F32(v) => v.len(),
            ArrayData::F64(v) => v.len(),
            ArrayData::Bool(v) => v.len(),
            ArrayData::Char(v) => v.len(),
            ArrayData::I8(v) => v.len(),
            ArrayData::I64(v) => v.len(),
            ArrayData::U64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reverse the byte order of every element. Applying it twice is a no-op.
    pub fn byteswap(&mut self) {
        match self {
            ArrayData::I16(v) => swap_in_place(v),
            ArrayData::I32(v) => swap_in_place(v),
            ArrayData::U16(v) => swap_in_place(v),
            ArrayData::U32(v) => swap_in_place(v),
            ArrayData::F32(v) => swap_in_place(v),
            ArrayData::F64(v) => swap_in_place(v),
            ArrayData::I64(v) => swap_in_place(v),
            ArrayData::U64(v) => swap_in_place(v),
            ArrayData::Bool(_) | ArrayData::Char(_) | ArrayData::I8(_) => {}
        }
    }

    /// Raw bytes of the buffer in host byte order.
    pub fn as_bytes(&self) -> std::borrow::Cow<'_, [u8]> {
        use std::borrow::Cow;
        match self {
            ArrayData::I16(v) => Cow::Borrowed(bytemuck::cast_slice(v.as_slice())),
            ArrayData::I32(v) => Cow::Borrowed(bytemuck::cast_slice(v.as_slice())),
            ArrayData::U16(v) => Cow::Borrowed(bytemuck::cast_slice(v.as_slice())),
            ArrayData::U32(v) => Cow::Borrowed(bytemuck::cast_slice(v.as_slice())),
            ArrayData::F32(v) => Cow::Borrowed(bytemuck::cast_slice(v.as_slice())),
            ArrayData::F64(v) => Cow::Borrowed(bytemuck::cast_slice(v.as_slice())),
            ArrayData::Bool(v) => Cow::Owned(v.iter().map(|&b| b as u8).collect()),
            ArrayData::Char(v) => Cow::Borrowed(v.as_slice()),
            ArrayData::I8(v) => Cow::Borrowed(bytemuck::cast_slice(v.as_slice())),
            ArrayData::I64(v) => Cow::Borrowed(bytemuck::cast_slice(v.as_slice())),
            ArrayData::U64(v) => Cow::Borrowed(bytemuck::cast_slice(v.as_slice())),
        }
    }

    /// Interpret a u16 buffer as UTF-16 text.
    ///
    /// Digital Micrograph stores strings as u16 arrays. Returns `None` for
    /// other element types and for invalid UTF-16.
    pub fn to_utf16_string(&self) -> Option<String> {
        match self {
            ArrayData::U16(v) => String::from_utf16(v).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for ArrayData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, values: &[T]) -> fmt::Result {
            write!(f, "[")?;
            for (i, v) in values.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", v)?;
            }
            write!(f, "]")
        }

        match self {
            ArrayData::I16(v) => list(f, v),
            ArrayData::I32(v) => list(f, v),
            ArrayData::U16(v) => list(f, v),
            ArrayData::U32(v) => list(f, v),
            ArrayData::F32(v) => list(f, v),
            ArrayData::F64(v) => list(f, v),
            ArrayData::Bool(v) => list(f, v),
            ArrayData::Char(v) => write!(f, "{:?}", String::from_utf8_lossy(v)),
            ArrayData::I8(v) => list(f, v),
            ArrayData::I64(v) => list(f, v),
            ArrayData::U64(v) => list(f, v),
        }
    }
}

/// Allocate a zeroed typed buffer and fill it from the stream in one read.
fn read_pod_vec<T: Pod, R: Read + Seek + ?Sized>(
    stream: &mut R,
    count: usize,
) -> std::result::Result<Vec<T>, IoError> {
    let mut values = vec![T::zeroed(); count];
    stream.read_exact_bytes(bytemuck::cast_slice_mut(values.as_mut_slice()))?;
    Ok(values)
}

/// Reverse each element's bytes across the whole buffer.
fn swap_in_place<T: Pod>(values: &mut [T]) {
    let size = std::mem::size_of::<T>();
    if size < 2 {
        return;
    }
    for element in bytemuck::cast_slice_mut::<T, u8>(values).chunks_exact_mut(size) {
        element.reverse();
    }
}

// =============================================================================
// TagValue
// =============================================================================

/// Decoded payload of a data tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TagValue {
    Scalar(Scalar),
    /// Group fields in declared order
    Group(Vec<Scalar>),
    Array(ArrayData),
    /// Unregistered type code, only returned in permissive mode
    Unknown { type_code: i64 },
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Scalar(v) => write!(f, "{}", v),
            TagValue::Group(fields) => {
                write!(f, "[")?;
                for (i, v) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            TagValue::Array(data) => write!(f, "{}", data),
            TagValue::Unknown { type_code } => write!(f, "<unknown type {}>", type_code),
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode the payload of `tag`.
///
/// With `permissive` set, a scalar or array element type missing from the
/// registry yields [`TagValue::Unknown`] instead of [`Dm4Error::UnknownType`].
///
/// The stream is left at `tag.data_offset + tag.byte_length` on every exit
/// path, so a caller may skip a failed tag and continue with its siblings.
pub fn read_tag_value<R: Read + Seek + ?Sized>(
    stream: &mut R,
    tag: &TagHeader,
    endian: Endian,
    permissive: bool,
) -> Result<TagValue> {
    let mut stream = RestorePosition::new(stream, tag.end_offset());

    stream.seek_to(tag.data_offset)?;
    check_marker(&mut *stream, tag.data_offset)?;
    let type_info = read_type_info(&mut *stream, tag.data_offset, tag.byte_length)?;

    trace!(name = ?tag.name, type_info = ?type_info, "decoding tag value");

    match type_info[0] {
        GROUP_TYPE_CODE => decode_group(&mut *stream, tag, &type_info, endian).map(TagValue::Group),
        ARRAY_TYPE_CODE => decode_array(&mut *stream, tag, &type_info, endian, permissive),
        code => match DataType::from_code(code) {
            Some(data_type) => Ok(TagValue::Scalar(read_scalar(
                &mut *stream,
                endian,
                data_type,
            )?)),
            None if permissive => {
                debug!(name = ?tag.name, type_code = code, "skipping unknown data type");
                Ok(TagValue::Unknown { type_code: code })
            }
            None => Err(Dm4Error::UnknownType { type_code: code }),
        },
    }
}

/// Read one scalar in the file's value byte order.
pub fn read_scalar<R: Read + Seek + ?Sized>(
    stream: &mut R,
    endian: Endian,
    data_type: DataType,
) -> std::result::Result<Scalar, IoError> {
    match endian {
        Endian::Little => read_scalar_as::<LittleEndian, R>(stream, data_type),
        Endian::Big => read_scalar_as::<BigEndian, R>(stream, data_type),
    }
}

fn read_scalar_as<B: ByteOrder, R: Read + Seek + ?Sized>(
    stream: &mut R,
    data_type: DataType,
) -> std::result::Result<Scalar, IoError> {
    let mut buf = [0u8; 8];
    let bytes = &mut buf[..data_type.size_in_bytes()];
    stream.read_exact_bytes(bytes)?;

    Ok(match data_type {
        DataType::I16 => Scalar::I16(B::read_i16(bytes)),
        DataType::I32 => Scalar::I32(B::read_i32(bytes)),
        DataType::U16 => Scalar::U16(B::read_u16(bytes)),
        DataType::U32 => Scalar::U32(B::read_u32(bytes)),
        DataType::F32 => Scalar::F32(B::read_f32(bytes)),
        DataType::F64 => Scalar::F64(B::read_f64(bytes)),
        DataType::Bool => Scalar::Bool(bytes[0] != 0),
        DataType::Char => Scalar::Char(bytes[0]),
        DataType::I8 => Scalar::I8(bytes[0] as i8),
        DataType::I64 => Scalar::I64(B::read_i64(bytes)),
        DataType::U64 => Scalar::U64(B::read_u64(bytes)),
    })
}

fn decode_group<R: Read + Seek + ?Sized>(
    stream: &mut R,
    tag: &TagHeader,
    type_info: &[i64],
    endian: Endian,
) -> Result<Vec<Scalar>> {
    // type_info[1] is the group name length, which the format never fills in
    let field_count = type_info
        .get(2)
        .and_then(|&n| usize::try_from(n).ok())
        .ok_or_else(|| corrupt(tag, "group type info is missing its field count"))?;

    let fields = &type_info[3..];
    if field_count.checked_mul(2).map_or(true, |n| n > fields.len()) {
        return Err(corrupt(
            tag,
            &format!(
                "group declares {} fields but type info holds {} entries",
                field_count,
                fields.len()
            ),
        ));
    }

    // Field name lengths are present but names are never stored
    let field_types = fields
        .chunks_exact(2)
        .take(field_count)
        .map(|pair| {
            DataType::from_code(pair[1]).ok_or(Dm4Error::UnknownType { type_code: pair[1] })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut values = Vec::with_capacity(field_count);
    for data_type in field_types {
        values.push(read_scalar(stream, endian, data_type)?);
    }
    Ok(values)
}

fn decode_array<R: Read + Seek + ?Sized>(
    stream: &mut R,
    tag: &TagHeader,
    type_info: &[i64],
    endian: Endian,
    permissive: bool,
) -> Result<TagValue> {
    let (element_code, count) = match type_info {
        [_, element_code, count, ..] => (*element_code, *count),
        _ => return Err(corrupt(tag, "array type info is missing its element type or count")),
    };

    if element_code == GROUP_TYPE_CODE {
        // The group layout sits between the element type and the length,
        // which is always the last type info entry
        let length = type_info.last().copied().unwrap_or(count);
        return Err(Dm4Error::UnsupportedFeature {
            count: length.max(0) as u64,
            type_code: element_code,
        });
    }

    let count = u64::try_from(count)
        .map_err(|_| corrupt(tag, &format!("negative array length {}", count)))?;

    let Some(data_type) = DataType::from_code(element_code) else {
        if permissive {
            debug!(name = ?tag.name, type_code = element_code, "skipping array of unknown type");
            return Ok(TagValue::Unknown {
                type_code: element_code,
            });
        }
        return Err(Dm4Error::UnknownType {
            type_code: element_code,
        });
    };

    // Elements must fit in what is left of the payload after the preamble
    let preamble = (TAG_MARKER.len() + 8 + 8 * type_info.len()) as u64;
    let available = tag.byte_length.saturating_sub(preamble);
    let required = count.checked_mul(data_type.size_in_bytes() as u64);
    if required.map_or(true, |n| n > available) {
        return Err(corrupt(
            tag,
            &format!(
                "array of {} x {:?} does not fit in {} payload bytes",
                count, data_type, available
            ),
        ));
    }

    let mut data = ArrayData::read(stream, data_type, count as usize)?;
    if endian.needs_swap() {
        data.byteswap();
    }

    trace!(name = ?tag.name, len = data.len(), ?data_type, "decoded array");
    Ok(TagValue::Array(data))
}

fn corrupt(tag: &TagHeader, reason: &str) -> Dm4Error {
    Dm4Error::StructuralCorruption {
        offset: tag.data_offset,
        reason: reason.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
