//! `Dm4File`, the handle that owns an open DM4 stream.
//!
//! # Usage
//!
//! ```no_run
//! use dm4_reader::Dm4File;
//!
//! # fn main() -> Result<(), dm4_reader::Dm4Error> {
//! let mut file = Dm4File::open("image.dm4")?;
//! let root = file.read_directory(None)?;
//!
//! if let Some(tag) = root.find_tag("ImageList/Name") {
//!     println!("{}", file.read_tag_data(tag)?);
//! }
//! file.close();
//! # Ok(())
//! # }
//! ```
//!
//! The global header and the root directory header are read when the handle
//! is created. The tag tree is only built by [`Dm4File::read_directory`], and
//! values are only read by [`Dm4File::read_tag_data`].
//!
//! A handle owns a single stream cursor, so it cannot be shared between
//! threads for concurrent reads. Open one handle per thread instead.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use tracing::{debug, info};

use crate::error::{IoError, Result};
use crate::format::{
    read_root_directory_header, read_tag_value, walk_directory, DirectoryHeader, Endian,
    GlobalHeader, TagDirectory, TagHeader, TagValue,
};

// =============================================================================
// ReaderOptions
// =============================================================================

/// Options controlling how tag values are decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Return [`TagValue::Unknown`] for unregistered type codes instead of
    /// failing with an error.
    pub permissive: bool,

    /// Value byte order to use instead of the one resolved from the header.
    pub byte_order: Option<Endian>,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permissive(mut self, permissive: bool) -> Self {
        self.permissive = permissive;
        self
    }

    /// Decode value bytes in `endian` regardless of the stored flag.
    pub fn with_byte_order(mut self, endian: Endian) -> Self {
        self.byte_order = Some(endian);
        self
    }
}

// =============================================================================
// Dm4File
// =============================================================================

/// An open DM4 file.
#[derive(Debug)]
pub struct Dm4File<R> {
    /// `None` once the handle has been closed
    stream: Option<R>,
    header: GlobalHeader,
    endian: Endian,
    root: DirectoryHeader,
    options: ReaderOptions,
}

impl Dm4File<BufReader<File>> {
    /// Open a DM4 file from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, ReaderOptions::default())
    }

    /// Open a DM4 file from disk with custom options.
    pub fn open_with_options(path: impl AsRef<Path>, options: ReaderOptions) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| IoError::Open {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        info!(path = %path.display(), "opened DM4 file");
        Self::with_options(BufReader::new(file), options)
    }
}

impl<R: Read + Seek> Dm4File<R> {
    /// Wrap an already-open stream and read its headers.
    pub fn new(stream: R) -> Result<Self> {
        Self::with_options(stream, ReaderOptions::default())
    }

    pub fn with_options(mut stream: R, options: ReaderOptions) -> Result<Self> {
        let header = GlobalHeader::read(&mut stream)?;
        let endian = options.byte_order.unwrap_or_else(|| header.endian());
        let root = read_root_directory_header(&mut stream, endian)?;

        debug!(
            version = header.version,
            root_length = header.root_length,
            ?endian,
            root_tags = root.num_tags,
            "read DM4 header"
        );

        Ok(Self {
            stream: Some(stream),
            header,
            endian,
            root,
            options,
        })
    }

    pub fn header(&self) -> &GlobalHeader {
        &self.header
    }

    /// Byte order of value bytes in this file.
    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn root_directory_header(&self) -> &DirectoryHeader {
        &self.root
    }

    pub fn options(&self) -> ReaderOptions {
        self.options
    }

    pub fn is_closed(&self) -> bool {
        self.stream.is_none()
    }

    /// Build the tag tree below `directory`, or below the root when `None`.
    pub fn read_directory(&mut self, directory: Option<&DirectoryHeader>) -> Result<TagDirectory> {
        let endian = self.endian;
        let header = directory.unwrap_or(&self.root).clone();
        let stream = self.stream.as_mut().ok_or(IoError::Closed)?;
        walk_directory(stream, endian, &header)
    }

    /// Decode the value of a data tag.
    ///
    /// The stream is left at the end of the tag's payload whether or not
    /// decoding succeeds.
    pub fn read_tag_data(&mut self, tag: &TagHeader) -> Result<TagValue> {
        let endian = self.endian;
        let permissive = self.options.permissive;
        let stream = self.stream.as_mut().ok_or(IoError::Closed)?;
        read_tag_value(stream, tag, endian, permissive)
    }

    /// Current position of the stream cursor.
    pub fn position(&mut self) -> Result<u64> {
        let stream = self.stream.as_mut().ok_or(IoError::Closed)?;
        Ok(crate::io::StructuralRead::offset(stream)?)
    }

    /// Release the stream. Further reads fail with [`IoError::Closed`].
    ///
    /// Calling `close` on a closed handle does nothing.
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            debug!("closed DM4 file");
        }
    }

    /// Release the stream and return it.
    pub fn into_inner(mut self) -> Option<R> {
        self.stream.take()
    }
}
