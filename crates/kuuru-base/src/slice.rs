//! Allocator-owned slices.
//!
//! Borrowed views are ordinary `&[T]` / `&mut [T]`: bounds-checked, no
//! ownership, and out-of-range indexing panics. [`OwnedSlice`] is the owning
//! counterpart produced by [`DynamicArray::extract_slice`],
//! [`DynamicArray::build_slice`] and [`Allocator::make_slice`]. It remembers
//! the allocator its memory came from and returns it there when dropped.
//!
//! [`DynamicArray::extract_slice`]: crate::DynamicArray::extract_slice
//! [`DynamicArray::build_slice`]: crate::DynamicArray::build_slice

use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

use crate::allocator::Allocator;

/// A fixed-length buffer of `T` owned through an [`Allocator`].
///
/// Dropping it drops the elements and frees the buffer through the same
/// allocator. [`into_raw_parts`](Self::into_raw_parts) gives that duty to the
/// caller instead.
pub struct OwnedSlice<'a, T> {
    ptr: NonNull<T>,
    len: usize,
    allocator: Allocator<'a>,
    _owns: PhantomData<T>,
}

impl<'a, T> OwnedSlice<'a, T> {
    /// An empty slice that owns no memory.
    #[must_use]
    pub fn empty(allocator: Allocator<'a>) -> Self {
        OwnedSlice {
            ptr: NonNull::dangling(),
            len: 0,
            allocator,
            _owns: PhantomData,
        }
    }

    /// Takes ownership of `len` initialized values at `ptr`.
    ///
    /// # Safety
    ///
    /// If `len * size_of::<T>() > 0`, `ptr` must have been allocated by
    /// `allocator` with `align_of::<T>()` and hold `len` initialized values.
    /// Otherwise `ptr` must be non-null and aligned (e.g. dangling).
    #[must_use]
    pub unsafe fn from_raw_parts(ptr: NonNull<T>, len: usize, allocator: Allocator<'a>) -> Self {
        OwnedSlice {
            ptr,
            len,
            allocator,
            _owns: PhantomData,
        }
    }

    /// Releases ownership without freeing anything.
    #[must_use]
    pub fn into_raw_parts(self) -> (NonNull<T>, usize, Allocator<'a>) {
        let parts = (self.ptr, self.len, self.allocator);
        std::mem::forget(self);
        parts
    }

    /// The allocator that owns the buffer.
    #[must_use]
    pub fn allocator(&self) -> Allocator<'a> {
        self.allocator
    }

    /// Borrowed view of the elements.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: ptr is valid for len initialized values (or dangling with len 0).
        unsafe { slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Mutable view of the elements.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as above, and we hold the only handle.
        unsafe { slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T> Drop for OwnedSlice<'_, T> {
    fn drop(&mut self) {
        // SAFETY: elements are initialized and owned; the buffer came from
        // `allocator` (or holds no allocation, which free_array skips).
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(self.ptr.as_ptr(), self.len));
            self.allocator.free_array(self.ptr, self.len);
        }
    }
}

impl<T> Deref for OwnedSlice<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for OwnedSlice<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: fmt::Debug> fmt::Debug for OwnedSlice<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq<[T]> for OwnedSlice<'_, T> {
    fn eq(&self, other: &[T]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq, const N: usize> PartialEq<[T; N]> for OwnedSlice<'_, T> {
    fn eq(&self, other: &[T; N]) -> bool {
        self.as_slice() == other
    }
}

impl<T: PartialEq> PartialEq for OwnedSlice<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeapAllocator;

    #[test]
    fn test_make_slice_is_zeroed_and_writable() {
        let mut s = HeapAllocator::get().make_slice::<u32>(8).unwrap();
        assert_eq!(s.len(), 8);
        assert!(s.iter().all(|&v| v == 0));

        s[7] = 42;
        s.reverse();
        assert_eq!(s[0], 42);
        assert_eq!(s, [42, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    #[should_panic]
    fn test_out_of_bounds_panics() {
        let s = HeapAllocator::get().make_slice::<u8>(4).unwrap();
        let _ = s[4];
    }

    #[test]
    fn test_into_raw_parts_transfers_ownership() {
        let heap = HeapAllocator::get();
        let s = heap.make_slice::<u64>(3).unwrap();
        let (ptr, len, alloc) = s.into_raw_parts();
        assert_eq!(len, 3);
        assert!(alloc.same_as(heap));
        let back = unsafe { OwnedSlice::from_raw_parts(ptr, len, alloc) };
        assert_eq!(back, [0, 0, 0]);
    }

    #[test]
    fn test_sub_views() {
        let mut s = HeapAllocator::get().make_slice::<u8>(6).unwrap();
        s.copy_from_slice(b"kuuru!");
        assert_eq!(&s[1..5], b"uuru");
        assert_eq!(&s[3..3], b"");
    }
}
