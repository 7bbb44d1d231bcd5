//! # DM4 Reader
//!
//! A lazy reader for Digital Micrograph 4 (DM4) files, the container format
//! written by Gatan microscopy software.
//!
//! A DM4 file is a tree of tag directories whose leaves are typed data tags.
//! This library walks that tree from tag headers alone, skipping every payload
//! by its declared length, and decodes individual tag values only when asked.
//! Traversing a multi-gigabyte file touches a few kilobytes of it.
//!
//! ## Features
//!
//! - **Header-only traversal**: builds the full tag tree without reading image data
//! - **On-demand values**: scalars, groups, and bulk numeric arrays
//! - **Mixed byte order**: big-endian structure with file-declared value order
//! - **Tree printer**: readable dump of a file's tags and small values
//!
//! ## Architecture
//!
//! - [`io`] - Big-endian structural reads and cursor restoration
//! - [`mod@format`] - Header, tag, directory, and value parsing
//! - [`reader`] - [`Dm4File`], the handle that owns the stream
//! - [`printer`] - Text rendering of a tag tree
//! - [`config`] - CLI configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use dm4_reader::{Dm4File, TagValue};
//!
//! fn main() -> Result<(), dm4_reader::Dm4Error> {
//!     let mut file = Dm4File::open("image.dm4")?;
//!     let root = file.read_directory(None)?;
//!
//!     for (name, tag) in &root.named_tags {
//!         if let TagValue::Scalar(value) = file.read_tag_data(tag)? {
//!             println!("{} = {}", name, value);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod io;
pub mod printer;
pub mod reader;

// Re-export commonly used types
pub use config::{Config, OutputFormat};
pub use error::{Dm4Error, ErrorKind, IoError};
pub use format::{
    lookup, registry, ArrayData, DataType, DirectoryHeader, Endian, GlobalHeader, Scalar,
    TagDirectory, TagEntry, TagHeader, TagValue, TypeDescriptor, ARRAY_TYPE_CODE,
    GROUP_TYPE_CODE, TAG_MARKER,
};
pub use printer::{PrintOptions, TreePrinter, DEFAULT_MAX_INLINE_BYTES, DEFAULT_STRING_LIMIT};
pub use reader::{Dm4File, ReaderOptions};
