//! DM4 type codes and the primitive type registry.
//!
//! Every data tag payload starts with a list of type codes. The first code
//! selects how the payload is decoded:
//! - a primitive code (see [`DataType`]) holds exactly one scalar
//! - [`GROUP_TYPE_CODE`] holds a fixed sequence of scalars
//! - [`ARRAY_TYPE_CODE`] holds a homogeneous bulk buffer
//!
//! The registry is closed: codes outside the table are reported as unknown.

use serde::Serialize;

/// Meta type code for a group (struct) payload.
pub const GROUP_TYPE_CODE: i64 = 15;

/// Meta type code for an array payload. Shares its value with the directory
/// tag type, but the two live in different namespaces.
pub const ARRAY_TYPE_CODE: i64 = 20;

// =============================================================================
// DataType
// =============================================================================

/// Primitive value types that may appear in a DM4 payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(i64)]
pub enum DataType {
    /// Signed 16-bit integer
    I16 = 2,
    /// Signed 32-bit integer
    I32 = 3,
    /// Unsigned 16-bit integer
    U16 = 4,
    /// Unsigned 32-bit integer
    U32 = 5,
    /// 32-bit IEEE float
    F32 = 6,
    /// 64-bit IEEE float
    F64 = 7,
    /// 1-byte boolean
    Bool = 8,
    /// 1-byte character
    Char = 9,
    /// Signed 8-bit integer
    I8 = 10,
    /// Signed 64-bit integer
    I64 = 11,
    /// Unsigned 64-bit integer
    U64 = 12,
}

impl DataType {
    /// Resolve a wire type code. Returns `None` for meta codes and unknown codes.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            2 => Some(DataType::I16),
            3 => Some(DataType::I32),
            4 => Some(DataType::U16),
            5 => Some(DataType::U32),
            6 => Some(DataType::F32),
            7 => Some(DataType::F64),
            8 => Some(DataType::Bool),
            9 => Some(DataType::Char),
            10 => Some(DataType::I8),
            11 => Some(DataType::I64),
            12 => Some(DataType::U64),
            _ => None,
        }
    }

    #[inline]
    pub const fn code(self) -> i64 {
        self as i64
    }

    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DataType::Bool | DataType::Char | DataType::I8 => 1,
            DataType::I16 | DataType::U16 => 2,
            DataType::I32 | DataType::U32 | DataType::F32 => 4,
            DataType::F64 | DataType::I64 | DataType::U64 => 8,
        }
    }

    /// Registry entry for this type.
    pub fn descriptor(self) -> &'static TypeDescriptor {
        // REGISTRY is ordered by code, starting at 2
        &REGISTRY[(self.code() - 2) as usize]
    }
}

// =============================================================================
// TypeDescriptor
// =============================================================================

/// Wire description of a primitive type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TypeDescriptor {
    pub byte_size: u8,
    pub signed: bool,
    pub kind: DataType,
}

const fn entry(byte_size: u8, signed: bool, kind: DataType) -> TypeDescriptor {
    TypeDescriptor {
        byte_size,
        signed,
        kind,
    }
}

/// The primitive type table, one entry per code from 2 through 12.
///
/// Signedness follows the format's own table, which records the float types
/// as unsigned.
static REGISTRY: [TypeDescriptor; 11] = [
    entry(2, true, DataType::I16),
    entry(4, true, DataType::I32),
    entry(2, false, DataType::U16),
    entry(4, false, DataType::U32),
    entry(4, false, DataType::F32),
    entry(8, false, DataType::F64),
    entry(1, false, DataType::Bool),
    entry(1, false, DataType::Char),
    entry(1, true, DataType::I8),
    entry(8, true, DataType::I64),
    entry(8, false, DataType::U64),
];

/// Look up a type code in the registry.
pub fn lookup(code: i64) -> Option<&'static TypeDescriptor> {
    DataType::from_code(code).map(DataType::descriptor)
}

/// All registered primitive types.
pub fn registry() -> &'static [TypeDescriptor] {
    &REGISTRY
}
