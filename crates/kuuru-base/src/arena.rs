//! Bump-pointer arena over a caller-supplied buffer.
//!
//! The arena never allocates its backing memory. It borrows a byte buffer
//! for its whole lifetime and hands out aligned, zero-filled regions from it
//! by advancing an offset:
//!
//! ```text
//! data                          data + offset       data + capacity
//! |[ a ][pad][   b   ][pad][ c ]|                   |
//!  <------ live allocations ---> <---- remaining --->
//! ```
//!
//! Individual frees are ignored. The whole region is reclaimed at once with
//! [`Arena::reset`] (borrow-checked) or [`Allocate::free_all`] (unsafe).
//!
//! # Examples
//!
//! ```
//! use kuuru_base::{Arena, DynamicArray};
//!
//! let mut backing = [0u8; 256];
//! let mut arena = Arena::from(&mut backing[..]);
//!
//! {
//!     let mut arr = DynamicArray::create(arena.allocator());
//!     arr.append(7u32);
//!     arr.append(9u32);
//!     assert_eq!(&arr[..], &[7, 9]);
//! }
//!
//! assert!(arena.offset() > 0);
//! arena.reset();
//! assert_eq!(arena.offset(), 0);
//! ```

use std::cell::Cell;
use std::marker::PhantomData;
use std::ptr::NonNull;

use kuuru_log::debug;

use crate::allocator::{Allocate, Allocator, Capabilities};
use crate::mem::checked_align_forward;

/// Bump allocator over a borrowed byte buffer.
///
/// Invariant: `0 <= offset <= capacity`, and every live allocation lies in
/// `[data, data + offset)` without overlapping another.
///
/// `Arena` is `!Sync`; the offset is a plain [`Cell`].
pub struct Arena<'buf> {
    data: NonNull<u8>,
    capacity: usize,
    offset: Cell<usize>,
    _buf: PhantomData<&'buf mut [u8]>,
}

impl<'buf> Arena<'buf> {
    /// Creates an arena that allocates out of `buf`.
    #[must_use]
    pub fn new(buf: &'buf mut [u8]) -> Self {
        let capacity = buf.len();
        Arena {
            data: NonNull::from(buf).cast(),
            capacity,
            offset: Cell::new(0),
            _buf: PhantomData,
        }
    }

    /// Returns an allocator handle for this arena.
    #[must_use]
    pub fn allocator(&self) -> Allocator<'_> {
        Allocator::new(self)
    }

    /// Bytes consumed so far, including alignment padding.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset.get()
    }

    /// Size of the backing buffer.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes left before the arena is full, ignoring alignment padding.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.capacity - self.offset.get()
    }

    /// Reclaims the whole buffer.
    ///
    /// Requires exclusive access, so no allocator handle or container that
    /// could still point into the buffer can be alive.
    pub fn reset(&mut self) {
        self.rewind();
    }

    fn rewind(&self) {
        let used = self.offset.replace(0);
        debug!("arena reset, reclaimed {used} of {} bytes", self.capacity);
    }

    /// Carves `size` zeroed bytes aligned to `align` out of the buffer.
    ///
    /// Returns `None` if `size` is 0 or the request does not fit; the
    /// offset is left unchanged in both cases.
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two.
    pub fn alloc(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }

        let offset = self.offset.get();
        let start = self.data.as_ptr().addr();
        let base = start + offset;
        let aligned = checked_align_forward(base, align)?;
        let padding = aligned - base;
        let end = aligned.checked_add(size)?;

        if end > start + self.capacity {
            return None;
        }

        self.offset.set(offset + padding + size);

        // SAFETY: [offset + padding, offset + padding + size) is inside the
        // borrowed buffer (checked above) and was not handed out before.
        unsafe {
            let ptr = self.data.add(offset + padding);
            ptr.write_bytes(0, size);
            Some(ptr)
        }
    }
}

impl<'buf> From<&'buf mut [u8]> for Arena<'buf> {
    fn from(buf: &'buf mut [u8]) -> Self {
        Arena::new(buf)
    }
}

impl Allocate for Arena<'_> {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALLOC_ANY | Capabilities::FREE_ALL | Capabilities::ALIGN_ANY
    }

    fn alloc(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        Arena::alloc(self, size, align)
    }

    unsafe fn free(&self, _ptr: *mut u8, _align: usize) {}

    unsafe fn free_all(&self) {
        self.rewind();
    }
}

impl std::fmt::Debug for Arena<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("data", &self.data)
            .field("capacity", &self.capacity)
            .field("offset", &self.offset.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(align(16))]
    struct Backing([u8; 128]);

    impl Backing {
        fn new() -> Self {
            Backing([0xAA; 128])
        }
    }

    #[test]
    fn test_arena_offsets_follow_alignment() {
        let mut buf = Backing::new();
        let arena = Arena::from(&mut buf.0[..]);
        let a = arena.allocator();

        let before = arena.offset();
        a.make::<i32>().unwrap();
        assert_eq!(arena.offset(), before + 4);

        let before = arena.offset();
        a.make::<i8>().unwrap();
        assert_eq!(arena.offset(), before + 1);

        let before = arena.offset();
        a.make::<i32>().unwrap();
        assert_eq!(arena.offset(), before + 3 + 4);

        let before = arena.offset();
        a.make::<i64>().unwrap();
        assert_eq!(arena.offset(), before + 4 + 8);
    }

    #[test]
    fn test_arena_exhaustion_leaves_offset() {
        let mut buf = Backing::new();
        let arena = Arena::from(&mut buf.0[..]);
        let a = arena.allocator();

        a.alloc(100, 1).unwrap();
        assert_eq!(arena.offset(), 100);
        assert!(a.alloc(29, 1).is_none());
        assert_eq!(arena.offset(), 100);

        let p = a.alloc(28, 1).unwrap();
        assert_eq!(p.as_ptr().addr(), buf_start(&arena) + 100);
        assert_eq!(arena.offset(), 128);
        assert_eq!(arena.remaining(), 0);
        assert!(a.alloc(1, 1).is_none());
    }

    #[test]
    fn test_arena_free_all_reuses_start() {
        let mut buf = Backing::new();
        let arena = Arena::from(&mut buf.0[..]);
        let a = arena.allocator();

        let first = a.alloc(16, 8).unwrap();
        a.alloc(32, 8).unwrap();
        assert!(a.make_slice::<u8>(128).is_none());

        unsafe { a.free_all() };
        assert_eq!(arena.offset(), 0);

        let again = a.alloc(16, 8).unwrap();
        assert_eq!(first, again);
    }

    #[test]
    fn test_arena_memory_is_zeroed() {
        let mut buf = Backing::new();
        let arena = Arena::from(&mut buf.0[..]);
        let p = arena.alloc(64, 1).unwrap();
        let bytes = unsafe { std::slice::from_raw_parts(p.as_ptr(), 64) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_arena_free_is_ignored() {
        let mut buf = Backing::new();
        let arena = Arena::from(&mut buf.0[..]);
        let a = arena.allocator();
        let p = a.alloc(8, 8).unwrap();
        unsafe { a.free(p.as_ptr(), 8) };
        assert_eq!(arena.offset(), 8);
    }

    #[test]
    fn test_arena_capabilities() {
        let mut buf = Backing::new();
        let arena = Arena::from(&mut buf.0[..]);
        let caps = arena.allocator().capabilities();
        assert!(caps.contains(Capabilities::FREE_ALL | Capabilities::ALIGN_ANY));
        assert!(!caps.contains(Capabilities::FREE_ANY));
    }

    #[test]
    fn test_arena_zero_size_and_empty_buffer() {
        let mut empty: [u8; 0] = [];
        let arena = Arena::from(&mut empty[..]);
        assert!(arena.alloc(0, 1).is_none());
        assert!(arena.alloc(1, 1).is_none());
        assert_eq!(arena.offset(), 0);
    }

    #[test]
    fn test_arena_reset() {
        let mut buf = Backing::new();
        let mut arena = Arena::from(&mut buf.0[..]);
        arena.alloc(40, 4).unwrap();
        arena.reset();
        assert_eq!(arena.offset(), 0);
        assert_eq!(arena.remaining(), 128);
    }

    fn buf_start(arena: &Arena<'_>) -> usize {
        arena.data.as_ptr().addr()
    }
}
