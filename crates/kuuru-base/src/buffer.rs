//! FIFO byte buffer over an [`Allocator`].
//!
//! Writes go to the end of the unread region and reads consume it from the
//! front:
//!
//! ```text
//! 0          last_read          last_read + len          cap
//! [ consumed |      unread       |         free          ]
//! ```
//!
//! A write that does not fit first tries to reclaim the consumed prefix and
//! only then grows the buffer to `max(cap * 2, needed)`. The buffer is also a
//! [`std::io::Read`] and [`std::io::Write`] stream.

use std::fmt;
use std::io;

use kuuru_log::trace;

use crate::allocator::Allocator;
use crate::error::{Error, Result};
use crate::slice::OwnedSlice;

/// Growable FIFO of bytes whose storage comes from an [`Allocator`].
///
/// Invariant: `last_read + len <= capacity()`.
pub struct BytesBuffer<'a> {
    data: OwnedSlice<'a, u8>,
    last_read: usize,
    len: usize,
}

impl<'a> BytesBuffer<'a> {
    /// Creates a buffer with `initial_cap` zeroed bytes of storage.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the allocator cannot provide them.
    pub fn init(allocator: Allocator<'a>, initial_cap: usize) -> Result<Self> {
        let data = allocator
            .make_slice::<u8>(initial_cap)
            .ok_or(Error::oom(initial_cap, 1))?;
        Ok(BytesBuffer {
            data,
            last_read: 0,
            len: 0,
        })
    }

    /// The allocator that owns the storage.
    #[must_use]
    pub fn allocator(&self) -> Allocator<'a> {
        self.data.allocator()
    }

    /// Size of the storage in bytes.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if there is nothing left to read.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Free bytes after the unread region.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity() - (self.last_read + self.len)
    }

    /// The unread bytes, without consuming them.
    ///
    /// The slice is invalidated by the next mutation of the buffer.
    #[must_use]
    pub fn unread(&self) -> &[u8] {
        &self.data[self.last_read..self.last_read + self.len]
    }

    /// Appends `bytes` after the unread region.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the buffer had to grow and could
    /// not; nothing is written in that case.
    pub fn push(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() > self.remaining() {
            let needed = self
                .len
                .checked_add(bytes.len())
                .ok_or(Error::oom(usize::MAX, 1))?;
            if needed <= self.capacity() {
                self.clean_read_bytes();
            } else {
                self.resize(needed.max(self.capacity().saturating_mul(2)))?;
            }
        }

        let end = self.last_read + self.len;
        self.data[end..end + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
        Ok(())
    }

    /// Moves up to `dest.len()` unread bytes into `dest` and returns how
    /// many were moved.
    pub fn pull(&mut self, dest: &mut [u8]) -> usize {
        let n = dest.len().min(self.len);
        dest[..n].copy_from_slice(&self.data[self.last_read..self.last_read + n]);
        self.last_read += n;
        self.len -= n;
        n
    }

    /// Shifts the unread bytes back to the start of the buffer.
    pub fn clean_read_bytes(&mut self) {
        let start = self.last_read;
        self.data.copy_within(start..start + self.len, 0);
        self.last_read = 0;
    }

    /// Drops all content and zeroes the storage. Capacity is kept.
    pub fn reset(&mut self) {
        self.last_read = 0;
        self.len = 0;
        self.data.fill(0);
    }

    /// Moves the unread bytes into fresh storage of `new_cap` bytes.
    ///
    /// Unread bytes past `new_cap` are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] and leaves the buffer untouched if the
    /// allocator cannot provide the new storage.
    pub fn resize(&mut self, new_cap: usize) -> Result<()> {
        let allocator = self.allocator();
        let mut data = allocator
            .make_slice::<u8>(new_cap)
            .ok_or(Error::oom(new_cap, 1))?;

        let keep = self.len.min(new_cap);
        data[..keep].copy_from_slice(&self.data[self.last_read..self.last_read + keep]);
        trace!("bytes buffer resized from {} to {new_cap}", self.capacity());

        self.data = data;
        self.last_read = 0;
        self.len = keep;
        Ok(())
    }
}

impl io::Write for BytesBuffer<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.push(buf)
            .map(|()| buf.len())
            .map_err(|err| io::Error::new(io::ErrorKind::OutOfMemory, err))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl io::Read for BytesBuffer<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.pull(buf))
    }
}

impl fmt::Debug for BytesBuffer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BytesBuffer")
            .field("cap", &self.capacity())
            .field("last_read", &self.last_read)
            .field("len", &self.len)
            .finish()
    }
}
