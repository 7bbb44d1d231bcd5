use thiserror::Error;

/// I/O errors that can occur when reading from the underlying stream
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// The file could not be opened
    #[error("Failed to open {path}: {message}")]
    Open { path: String, message: String },

    /// A seek or read failed at the given offset
    #[error("Read failed at offset {offset}: {message}")]
    Read { offset: u64, message: String },

    /// The handle has been closed and no longer owns a stream
    #[error("DM4 file handle is closed")]
    Closed,

    /// Writing decoded output failed
    #[error("Write failed: {0}")]
    Write(String),
}

impl IoError {
    /// Wrap a `std::io::Error` raised at `offset`.
    pub fn read(offset: u64, err: std::io::Error) -> Self {
        IoError::Read {
            offset,
            message: err.to_string(),
        }
    }
}

/// Coarse classification of a [`Dm4Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    StructuralCorruption,
    UnknownType,
    UnsupportedFeature,
    NameDecode,
}

/// Errors that can occur when decoding a DM4 file
#[derive(Debug, Clone, Error)]
pub enum Dm4Error {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The byte layout does not match the DM4 grammar (bad marker, short preamble)
    #[error("Structural corruption at offset {offset}: {reason}")]
    StructuralCorruption { offset: u64, reason: String },

    /// Type code is not in the type registry
    #[error("Unknown data type code {type_code}")]
    UnknownType { type_code: i64 },

    /// Layout is recognised but not decodable (arrays of groups)
    #[error("Array of groups length {count} and type {type_code} is not supported")]
    UnsupportedFeature {
        /// Array length, taken from the last type info entry
        count: u64,
        type_code: i64,
    },

    /// Tag name bytes are not valid UTF-8
    #[error("Tag name at offset {offset} is not valid UTF-8")]
    NameDecode { offset: u64 },
}

impl Dm4Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Dm4Error::Io(_) => ErrorKind::Io,
            Dm4Error::StructuralCorruption { .. } => ErrorKind::StructuralCorruption,
            Dm4Error::UnknownType { .. } => ErrorKind::UnknownType,
            Dm4Error::UnsupportedFeature { .. } => ErrorKind::UnsupportedFeature,
            Dm4Error::NameDecode { .. } => ErrorKind::NameDecode,
        }
    }

    /// Whether the reader downgrades this error instead of failing.
    ///
    /// Only undecodable tag names qualify; they become anonymous tags.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Dm4Error::NameDecode { .. })
    }
}

pub type Result<T> = std::result::Result<T, Dm4Error>;
