//! Configuration for the `dm4-reader` command-line tool.
//!
//! Every option can be given on the command line or through an environment
//! variable with the `DM4_` prefix:
//!
//! - `DM4_FORMAT` - Output format, `text` or `json` (default: text)
//! - `DM4_MAX_INLINE_BYTES` - Largest payload decoded in text output (default: 2048)
//! - `DM4_STRING_LIMIT` - u16 arrays shorter than this print as text (default: 2048)
//! - `DM4_PERMISSIVE` - Print unknown data types instead of failing (default: false)

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::printer::{PrintOptions, DEFAULT_MAX_INLINE_BYTES, DEFAULT_STRING_LIMIT};
use crate::reader::ReaderOptions;

/// Output format for the tag tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Indented tag tree with decoded values
    #[default]
    Text,
    /// Tag and directory headers as JSON, without values
    Json,
}

/// DM4 Reader - Print the tag tree of a Digital Micrograph 4 file.
#[derive(Parser, Debug, Clone)]
#[command(name = "dm4-reader")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Path to the DM4 file.
    pub path: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, env = "DM4_FORMAT")]
    pub format: OutputFormat,

    /// Payloads larger than this many bytes are not decoded in text output.
    #[arg(long, default_value_t = DEFAULT_MAX_INLINE_BYTES, env = "DM4_MAX_INLINE_BYTES")]
    pub max_inline_bytes: u64,

    /// u16 arrays shorter than this are printed as UTF-16 text.
    #[arg(long, default_value_t = DEFAULT_STRING_LIMIT, env = "DM4_STRING_LIMIT")]
    pub string_limit: usize,

    /// Print tags with unknown data types instead of stopping.
    #[arg(long, default_value_t = false, env = "DM4_PERMISSIVE")]
    pub permissive: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.path.as_os_str().is_empty() {
            return Err("A DM4 file path is required".to_string());
        }

        if self.max_inline_bytes == 0 {
            return Err("max_inline_bytes must be greater than 0".to_string());
        }

        if self.string_limit == 0 {
            return Err("string_limit must be greater than 0".to_string());
        }

        Ok(())
    }

    pub fn reader_options(&self) -> ReaderOptions {
        ReaderOptions::new().with_permissive(self.permissive)
    }

    pub fn print_options(&self) -> PrintOptions {
        PrintOptions::default()
            .with_max_inline_bytes(self.max_inline_bytes)
            .with_string_limit(self.string_limit)
    }
}

// =============================================================================
// Tests
// =============================================================================
