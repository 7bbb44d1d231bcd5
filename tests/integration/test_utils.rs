//! Test utilities for integration tests.
//!
//! Helpers that lay out DM4 files byte by byte, plus a reader wrapper that
//! counts how many bytes were consumed.

#![allow(dead_code)]

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dm4_reader::{Dm4File, Endian, ReaderOptions};

// =============================================================================
// Value Encoding
// =============================================================================

/// A primitive that can be written in either byte order.
pub trait WireValue: Copy {
    fn to_bytes(self, endian: Endian) -> Vec<u8>;
}

macro_rules! impl_wire_value {
    ($($t:ty),*) => {
        $(
            impl WireValue for $t {
                fn to_bytes(self, endian: Endian) -> Vec<u8> {
                    match endian {
                        Endian::Little => self.to_le_bytes().to_vec(),
                        Endian::Big => self.to_be_bytes().to_vec(),
                    }
                }
            }
        )*
    };
}

impl_wire_value!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64);

/// Encode a slice of values back to back.
pub fn encode_all<T: WireValue>(values: &[T], endian: Endian) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_bytes(endian)).collect()
}

/// The byte order that is not the host's.
pub fn foreign_endian() -> Endian {
    match Endian::native() {
        Endian::Little => Endian::Big,
        Endian::Big => Endian::Little,
    }
}

// =============================================================================
// File Layout
// =============================================================================

fn name_field(bytes: &mut Vec<u8>, name: &str) {
    bytes.extend_from_slice(&(name.len() as u16).to_be_bytes());
    bytes.extend_from_slice(name.as_bytes());
}

/// Global header followed by the root directory header.
pub fn file_header(version: u32, flag: u32, sorted: bool, closed: bool, num_tags: u64) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&version.to_be_bytes());
    bytes.extend_from_slice(&0u64.to_be_bytes());
    bytes.extend_from_slice(&flag.to_be_bytes());
    bytes.push(sorted as u8);
    bytes.push(closed as u8);
    bytes.extend_from_slice(&num_tags.to_be_bytes());
    bytes
}

/// A complete file whose root holds `entries`, followed by trailing zeros.
pub fn dm4_file(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = file_header(4, 1, true, false, entries.len() as u64);
    for entry in entries {
        bytes.extend_from_slice(entry);
    }
    bytes.extend_from_slice(&[0; 8]);
    bytes
}

/// A data tag with an arbitrary type info list and raw value bytes.
pub fn tag(name: &str, type_info: &[i64], value_bytes: &[u8]) -> Vec<u8> {
    let mut payload = b"%%%%".to_vec();
    payload.extend_from_slice(&(type_info.len() as u64).to_be_bytes());
    for code in type_info {
        payload.extend_from_slice(&code.to_be_bytes());
    }
    payload.extend_from_slice(value_bytes);

    let mut bytes = vec![21];
    name_field(&mut bytes, name);
    bytes.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    bytes.extend(payload);
    bytes
}

/// A data tag holding one scalar.
pub fn scalar_tag<T: WireValue>(name: &str, type_code: i64, value: T, endian: Endian) -> Vec<u8> {
    tag(name, &[type_code], &value.to_bytes(endian))
}

/// A data tag holding an array of `values`.
pub fn array_tag<T: WireValue>(
    name: &str,
    type_code: i64,
    values: &[T],
    endian: Endian,
) -> Vec<u8> {
    tag(
        name,
        &[20, type_code, values.len() as i64],
        &encode_all(values, endian),
    )
}

/// A data tag holding a UTF-16 string as a u16 array.
pub fn string_tag(name: &str, text: &str, endian: Endian) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().collect();
    array_tag(name, 4, &units, endian)
}

/// A directory tag whose children follow it.
pub fn dir(name: &str, children: &[Vec<u8>]) -> Vec<u8> {
    let mut bytes = vec![20];
    name_field(&mut bytes, name);
    bytes.extend_from_slice(&0u64.to_be_bytes());
    bytes.extend_from_slice(&[0, 0]);
    bytes.extend_from_slice(&(children.len() as u64).to_be_bytes());
    for child in children {
        bytes.extend_from_slice(child);
    }
    bytes
}

/// Open an in-memory file.
pub fn open_bytes(bytes: Vec<u8>) -> Dm4File<Cursor<Vec<u8>>> {
    Dm4File::new(Cursor::new(bytes)).expect("valid DM4 header")
}

/// Open an in-memory file whose values were encoded in `endian`.
pub fn open_in(bytes: Vec<u8>, endian: Endian) -> Dm4File<Cursor<Vec<u8>>> {
    let options = ReaderOptions::new().with_byte_order(endian);
    Dm4File::with_options(Cursor::new(bytes), options).expect("valid DM4 header")
}

// =============================================================================
// Counting Reader
// =============================================================================

/// Wraps a reader and counts the bytes read through it.
pub struct CountingReader<R> {
    inner: R,
    bytes_read: Arc<AtomicU64>,
}

impl<R> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            bytes_read: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Shared counter, readable after the reader has been moved.
    pub fn counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.bytes_read)
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.bytes_read.fetch_add(n as u64, Ordering::SeqCst);
        Ok(n)
    }
}

impl<R: Seek> Seek for CountingReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

pub fn bytes_read(counter: &Arc<AtomicU64>) -> u64 {
    counter.load(Ordering::SeqCst)
}
