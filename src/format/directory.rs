//! Tag directory tree.
//!
//! A DM4 file is a tree of directories whose leaves are data tags. Walking
//! the tree reads headers only: each data tag is skipped by its declared byte
//! length, so the full structure of a multi-gigabyte file is available after
//! touching a few kilobytes of it.

use std::collections::BTreeMap;
use std::io::{Read, Seek};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::io::StructuralRead;

use super::header::Endian;
use super::tags::{read_tag_entry, DirectoryHeader, TagEntry, TagHeader};

/// A directory and everything below it.
///
/// Named children are keyed by name; when a name repeats, the last entry in
/// the file wins. Anonymous children keep file order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagDirectory {
    pub name: Option<String>,
    pub header: DirectoryHeader,
    pub named_subdirs: BTreeMap<String, TagDirectory>,
    pub unnamed_subdirs: Vec<TagDirectory>,
    pub named_tags: BTreeMap<String, TagHeader>,
    pub unnamed_tags: Vec<TagHeader>,
}

impl TagDirectory {
    /// An empty directory for `header`.
    pub fn new(header: DirectoryHeader) -> Self {
        Self {
            name: header.name.clone(),
            header,
            named_subdirs: BTreeMap::new(),
            unnamed_subdirs: Vec::new(),
            named_tags: BTreeMap::new(),
            unnamed_tags: Vec::new(),
        }
    }

    pub fn tag(&self, name: &str) -> Option<&TagHeader> {
        self.named_tags.get(name)
    }

    pub fn subdir(&self, name: &str) -> Option<&TagDirectory> {
        self.named_subdirs.get(name)
    }

    /// Follow a `/`-separated path of directory names, ending at a data tag.
    ///
    /// ```ignore
    /// let tag = root.find_tag("ImageList/DataType");
    /// ```
    pub fn find_tag(&self, path: &str) -> Option<&TagHeader> {
        let (dirs, tag) = match path.rsplit_once('/') {
            Some((dirs, tag)) => (Some(dirs), tag),
            None => (None, path),
        };
        let dir = match dirs {
            Some(dirs) => self.find_subdir(dirs)?,
            None => self,
        };
        dir.tag(tag)
    }

    /// Follow a `/`-separated path of directory names.
    pub fn find_subdir(&self, path: &str) -> Option<&TagDirectory> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |dir, segment| dir.subdir(segment))
    }

    /// Number of children filed directly in this directory.
    pub fn len(&self) -> usize {
        self.named_subdirs.len()
            + self.unnamed_subdirs.len()
            + self.named_tags.len()
            + self.unnamed_tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert_subdir(&mut self, dir: TagDirectory) {
        match dir.name.clone() {
            Some(name) => {
                self.named_subdirs.insert(name, dir);
            }
            None => self.unnamed_subdirs.push(dir),
        }
    }

    fn insert_tag(&mut self, tag: TagHeader) {
        match tag.name.clone() {
            Some(name) => {
                self.named_tags.insert(name, tag);
            }
            None => self.unnamed_tags.push(tag),
        }
    }
}

/// Build the tree below `header`.
///
/// Reads up to `header.num_tags` entries starting at the header's child
/// offset, recursing into subdirectories. A sentinel entry ends the
/// directory early without an error.
pub fn walk_directory<R: Read + Seek + ?Sized>(
    stream: &mut R,
    endian: Endian,
    header: &DirectoryHeader,
) -> Result<TagDirectory> {
    stream.seek_to(header.child_base_offset)?;
    walk_children(stream, endian, header.clone())
}

fn walk_children<R: Read + Seek + ?Sized>(
    stream: &mut R,
    endian: Endian,
    header: DirectoryHeader,
) -> Result<TagDirectory> {
    debug!(
        name = ?header.name,
        num_tags = header.num_tags,
        offset = header.child_base_offset,
        "reading tag directory"
    );

    let num_tags = header.num_tags;
    let mut dir = TagDirectory::new(header);

    for index in 0..num_tags {
        match read_tag_entry(stream, endian)? {
            TagEntry::End => {
                warn!(
                    name = ?dir.name,
                    declared = num_tags,
                    found = index,
                    "tag directory ended before its declared tag count"
                );
                break;
            }
            // Children follow the directory header directly, so the cursor
            // is already at the first child
            TagEntry::Directory(sub) => {
                let subdir = walk_children(stream, endian, sub)?;
                dir.insert_subdir(subdir);
            }
            TagEntry::Tag(tag) => dir.insert_tag(tag),
        }
    }

    Ok(dir)
}
