//! Human-readable dump of a tag tree.
//!
//! Each directory prints, in order:
//! 1. anonymous tags in file order
//! 2. named tags sorted by name
//! 3. anonymous subdirectories (`Unnamed directory`, children indented)
//! 4. named subdirectories sorted by name (children indented)
//!
//! Tag lines are `<name>\t<value>`, indented with one tab per level.

use std::io::{Read, Seek, Write};

use crate::error::{Dm4Error, IoError, Result};
use crate::format::{TagDirectory, TagHeader, TagValue};
use crate::reader::Dm4File;

/// Payloads longer than this are reported instead of decoded.
pub const DEFAULT_MAX_INLINE_BYTES: u64 = 2048;

/// u16 arrays shorter than this are shown as text when they are valid UTF-16.
pub const DEFAULT_STRING_LIMIT: usize = 2048;

/// Options for [`TreePrinter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrintOptions {
    pub max_inline_bytes: u64,
    pub string_limit: usize,
}

impl Default for PrintOptions {
    fn default() -> Self {
        Self {
            max_inline_bytes: DEFAULT_MAX_INLINE_BYTES,
            string_limit: DEFAULT_STRING_LIMIT,
        }
    }
}

impl PrintOptions {
    pub fn with_max_inline_bytes(mut self, max_inline_bytes: u64) -> Self {
        self.max_inline_bytes = max_inline_bytes;
        self
    }

    pub fn with_string_limit(mut self, string_limit: usize) -> Self {
        self.string_limit = string_limit;
        self
    }
}

/// Writes a tag tree and its small values to `out`.
pub struct TreePrinter<W> {
    out: W,
    options: PrintOptions,
}

impl<W: Write> TreePrinter<W> {
    pub fn new(out: W) -> Self {
        Self::with_options(out, PrintOptions::default())
    }

    pub fn with_options(out: W, options: PrintOptions) -> Self {
        Self { out, options }
    }

    /// Print `dir` and everything below it.
    ///
    /// Arrays of groups are reported inline and printing continues. Any other
    /// error stops printing and is returned.
    pub fn print_tree<R: Read + Seek>(
        &mut self,
        file: &mut Dm4File<R>,
        dir: &TagDirectory,
    ) -> Result<()> {
        self.print_directory(file, dir, 0)?;
        self.out
            .flush()
            .map_err(|e| Dm4Error::from(IoError::Write(e.to_string())))
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn print_directory<R: Read + Seek>(
        &mut self,
        file: &mut Dm4File<R>,
        dir: &TagDirectory,
        level: usize,
    ) -> Result<()> {
        for tag in &dir.unnamed_tags {
            self.print_tag(file, tag, level)?;
        }
        for tag in dir.named_tags.values() {
            self.print_tag(file, tag, level)?;
        }

        for subdir in &dir.unnamed_subdirs {
            self.line(level, "Unnamed directory")?;
            self.print_directory(file, subdir, level + 1)?;
        }
        for (name, subdir) in &dir.named_subdirs {
            self.line(level, name)?;
            self.print_directory(file, subdir, level + 1)?;
        }
        Ok(())
    }

    fn print_tag<R: Read + Seek>(
        &mut self,
        file: &mut Dm4File<R>,
        tag: &TagHeader,
        level: usize,
    ) -> Result<()> {
        let label = tag.name.as_deref().unwrap_or("Unnamed tag");

        if tag.byte_length > self.options.max_inline_bytes {
            let text = format!(
                "{}\tArray length {} too long to read",
                label, tag.type_info_len
            );
            return self.line(level, &text);
        }

        match file.read_tag_data(tag) {
            Ok(value) => {
                let text = format!("{}\t{}", label, self.format_value(&value));
                self.line(level, &text)
            }
            Err(e @ Dm4Error::UnsupportedFeature { .. }) => {
                self.line(level, &format!("***{}***", e))
            }
            Err(e) => Err(e),
        }
    }

    /// Render a value, showing short u16 arrays as text when possible.
    fn format_value(&self, value: &TagValue) -> String {
        if let TagValue::Array(data) = value {
            if data.len() < self.options.string_limit {
                if let Some(text) = data.to_utf16_string() {
                    return text;
                }
            }
        }
        value.to_string()
    }

    fn line(&mut self, level: usize, text: &str) -> Result<()> {
        writeln!(self.out, "{}{}", "\t".repeat(level), text)
            .map_err(|e| Dm4Error::from(IoError::Write(e.to_string())))
    }
}
