//! DM4 format parsing.
//!
//! # Key Concepts
//!
//! - **Mixed byte order**: structural fields (lengths, counts, type codes) are
//!   always big-endian. Value bytes follow the flag in the global header.
//!
//! - **Tag directories**: the file body is a tree of directories (tag type 20)
//!   whose leaves are data tags. Walking the tree reads headers only.
//!
//! - **Lazy values**: a data tag's payload is decoded on request from the
//!   offsets recorded in its [`TagHeader`].

mod directory;
mod header;
mod tags;
mod types;
mod values;

pub use directory::{walk_directory, TagDirectory};
pub use header::{
    read_root_directory_header, Endian, GlobalHeader, GLOBAL_HEADER_SIZE,
    ROOT_DIRECTORY_HEADER_SIZE,
};
pub use tags::{
    decode_tag_name, read_tag_entry, DirectoryHeader, TagEntry, TagHeader, DIRECTORY_TAG_TYPE,
    END_TAG_TYPE, TAG_MARKER,
};
pub use types::{lookup, registry, DataType, TypeDescriptor, ARRAY_TYPE_CODE, GROUP_TYPE_CODE};
pub use values::{read_scalar, read_tag_value, ArrayData, Scalar, TagValue};
