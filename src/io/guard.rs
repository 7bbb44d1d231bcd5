use std::io::{Seek, SeekFrom};
use std::ops::{Deref, DerefMut};

use tracing::warn;

/// Borrows a stream and seeks it to a fixed offset when dropped.
///
/// Value decoding may stop anywhere inside a payload (an error, an early
/// return, a panic). Wrapping the stream in this guard leaves the cursor at
/// the start of the next sibling tag on every exit path.
pub struct RestorePosition<'a, R: Seek + ?Sized> {
    stream: &'a mut R,
    target: u64,
}

impl<'a, R: Seek + ?Sized> RestorePosition<'a, R> {
    pub fn new(stream: &'a mut R, target: u64) -> Self {
        Self { stream, target }
    }

    /// Offset the cursor is restored to on drop.
    pub fn target(&self) -> u64 {
        self.target
    }
}

impl<R: Seek + ?Sized> Deref for RestorePosition<'_, R> {
    type Target = R;

    fn deref(&self) -> &R {
        self.stream
    }
}

impl<R: Seek + ?Sized> DerefMut for RestorePosition<'_, R> {
    fn deref_mut(&mut self) -> &mut R {
        self.stream
    }
}

impl<R: Seek + ?Sized> Drop for RestorePosition<'_, R> {
    fn drop(&mut self) {
        if let Err(e) = self.stream.seek(SeekFrom::Start(self.target)) {
            warn!(target = self.target, error = %e, "failed to restore stream position");
        }
    }
}
