//! Growable array whose storage comes from an [`Allocator`].
//!
//! `DynamicArray` is the workhorse container of the crate. It keeps
//! `length <= capacity`, the elements in `[0, length)` are live, and the
//! bytes of the slots in `[length, capacity)` are zero.
//!
//! Growth is geometric: a full array grows to
//! `align_forward(length * 2 + 1, align_of::<T>())` slots, which keeps a run
//! of appends amortized O(1). Every reallocation goes through the owning
//! allocator, so an array on an arena leaves its old buffers behind until the
//! arena is reset.
//!
//! # Examples
//!
//! ```
//! use kuuru_base::{DynamicArray, HeapAllocator};
//!
//! let mut arr = DynamicArray::create(HeapAllocator::get());
//! arr.append(6);
//! arr.append(9);
//! arr.insert(0, 4);
//! assert_eq!(&arr[..], &[4, 6, 9]);
//!
//! assert_eq!(arr.remove(1), 6);
//! let frozen = arr.extract_slice();
//! assert_eq!(frozen, [4, 9]);
//! assert_eq!(arr.size(), 0);
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut};
use std::ptr::{self, NonNull};
use std::slice;

use kuuru_log::trace;

use crate::allocator::Allocator;
use crate::error::{Error, Result};
use crate::mem::align_forward;
use crate::slice::OwnedSlice;

/// An owned, resizable sequence backed by an [`Allocator`].
///
/// Zero-sized element types are rejected at compile time.
pub struct DynamicArray<'a, T> {
    data: NonNull<T>,
    capacity: usize,
    length: usize,
    allocator: Allocator<'a>,
    _owns: PhantomData<T>,
}

impl<'a, T> DynamicArray<'a, T> {
    /// Creates an empty array. Nothing is allocated until the first append.
    #[must_use]
    pub fn create(allocator: Allocator<'a>) -> Self {
        const { assert!(mem::size_of::<T>() != 0, "DynamicArray does not support zero-sized types") };
        DynamicArray {
            data: NonNull::dangling(),
            capacity: 0,
            length: 0,
            allocator,
            _owns: PhantomData,
        }
    }

    /// Creates an empty array with room for `capacity` elements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if the allocator cannot provide the
    /// buffer.
    pub fn with_capacity(allocator: Allocator<'a>, capacity: usize) -> Result<Self> {
        let mut arr = Self::create(allocator);
        arr.try_resize(capacity)?;
        Ok(arr)
    }

    /// Number of live elements.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.length
    }

    /// Number of slots in the current buffer.
    #[inline]
    #[must_use]
    pub fn cap(&self) -> usize {
        self.capacity
    }

    /// The allocator that owns the buffer.
    #[must_use]
    pub fn allocator(&self) -> Allocator<'a> {
        self.allocator
    }

    /// Live elements as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: [0, length) is initialized; dangling is fine for length 0.
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.length) }
    }

    /// Live elements as a mutable slice.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as above, with exclusive access.
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.length) }
    }

    /// View of the elements in `[start, end)`.
    ///
    /// # Panics
    ///
    /// Panics unless `start <= end <= size()`.
    #[must_use]
    pub fn sub(&self, start: usize, end: usize) -> &[T] {
        assert!(start <= end && end <= self.length, "Invalid range for slice");
        &self.as_slice()[start..end]
    }

    /// Capacity after making room for `extra` more elements.
    fn grown_capacity(&self, extra: usize) -> usize {
        align_forward(self.length * 2 + extra, mem::align_of::<T>())
    }

    /// Reallocates the buffer to exactly `new_capacity` slots.
    ///
    /// Elements past the new capacity are dropped, the rest move over, and
    /// the old buffer goes back to the allocator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] and leaves the array untouched if the
    /// new buffer cannot be allocated.
    pub fn try_resize(&mut self, new_capacity: usize) -> Result<()> {
        if new_capacity == self.capacity {
            return Ok(());
        }

        let new_data = if new_capacity == 0 {
            NonNull::dangling()
        } else {
            // Allocator memory is zero-filled, which covers the new tail.
            self.allocator.alloc_array::<T>(new_capacity).ok_or_else(|| {
                Error::oom(
                    new_capacity.saturating_mul(mem::size_of::<T>()),
                    mem::align_of::<T>(),
                )
            })?
        };

        let keep = new_capacity.min(self.length);
        let dropped = self.length - keep;
        // Shrink first so a panicking destructor cannot cause a double drop.
        self.length = keep;

        // SAFETY: [keep, keep + dropped) are live and now unreachable; the
        // first `keep` elements are moved into a distinct fresh buffer; the
        // old buffer came from `allocator` with `capacity` slots.
        unsafe {
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.data.as_ptr().add(keep),
                dropped,
            ));
            ptr::copy_nonoverlapping(self.data.as_ptr(), new_data.as_ptr(), keep);
            self.allocator.free_array(self.data, self.capacity);
        }

        trace!(
            "resized {} buffer from {} to {} slots",
            std::any::type_name::<T>(),
            self.capacity,
            new_capacity
        );

        self.data = new_data;
        self.capacity = new_capacity;
        Ok(())
    }

    /// Infallible [`try_resize`](Self::try_resize).
    ///
    /// # Panics
    ///
    /// Panics if the allocator is exhausted.
    pub fn resize(&mut self, new_capacity: usize) {
        if let Err(err) = self.try_resize(new_capacity) {
            panic!("Failed allocation: {err}");
        }
    }

    /// Makes room for `extra` more elements, growing geometrically.
    fn try_reserve(&mut self, extra: usize) -> Result<()> {
        if self.capacity - self.length >= extra {
            return Ok(());
        }
        self.try_resize(self.grown_capacity(extra))
    }

    /// Appends `value`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if growing failed; `value` is dropped.
    pub fn try_append(&mut self, value: T) -> Result<()> {
        self.try_reserve(1)?;
        // SAFETY: length < capacity after the reserve.
        unsafe { self.data.as_ptr().add(self.length).write(value) };
        self.length += 1;
        Ok(())
    }

    /// Appends `value`, growing the buffer when it is full.
    ///
    /// # Panics
    ///
    /// Panics if the allocator is exhausted.
    pub fn append(&mut self, value: T) {
        if let Err(err) = self.try_append(value) {
            panic!("Failed allocation: {err}");
        }
    }

    /// Inserts `value` at `index`, shifting the tail right by one.
    ///
    /// # Panics
    ///
    /// Panics if `index > size()` or the allocator is exhausted.
    pub fn insert(&mut self, index: usize, value: T) {
        assert!(index <= self.length, "Out of bounds insertion to dynamic array");
        if index == self.length {
            return self.append(value);
        }

        if let Err(err) = self.try_reserve(1) {
            panic!("Failed allocation: {err}");
        }

        // SAFETY: index < length < capacity; the tail move stays in bounds.
        unsafe {
            let slot = self.data.as_ptr().add(index);
            ptr::copy(slot, slot.add(1), self.length - index);
            slot.write(value);
        }
        self.length += 1;
    }

    /// Removes and returns the element at `index`, shifting the tail left.
    ///
    /// # Panics
    ///
    /// Panics if `index >= size()`.
    pub fn remove(&mut self, index: usize) -> T {
        assert!(index < self.length, "Out of bounds removal from dynamic array");
        // SAFETY: index is live; after the shift the last slot is vacated.
        unsafe {
            let slot = self.data.as_ptr().add(index);
            let value = slot.read();
            ptr::copy(slot.add(1), slot, self.length - index - 1);
            self.length -= 1;
            self.data.as_ptr().add(self.length).write_bytes(0, 1);
            value
        }
    }

    /// Removes and returns the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.length == 0 {
            return None;
        }
        self.length -= 1;
        // SAFETY: the slot was live and is now outside [0, length).
        unsafe {
            let slot = self.data.as_ptr().add(self.length);
            let value = slot.read();
            slot.write_bytes(0, 1);
            Some(value)
        }
    }

    /// Drops every element, back to front, keeping the buffer.
    pub fn clear(&mut self) {
        let len = self.length;
        while self.length > 0 {
            self.length -= 1;
            // SAFETY: the slot was live and is no longer reachable.
            unsafe { ptr::drop_in_place(self.data.as_ptr().add(self.length)) };
        }
        // SAFETY: [0, len) is inside the buffer.
        unsafe { self.data.as_ptr().write_bytes(0, len) };
    }

    /// Hands the live elements out as an [`OwnedSlice`] and leaves the
    /// array empty with no buffer. Nothing is copied; any spare capacity
    /// travels with the slice.
    ///
    /// An empty array frees its buffer here and hands out an empty slice,
    /// since an empty `OwnedSlice` owns no memory.
    pub fn extract_slice(&mut self) -> OwnedSlice<'a, T> {
        let data = mem::replace(&mut self.data, NonNull::dangling());
        let capacity = mem::take(&mut self.capacity);
        let length = mem::take(&mut self.length);

        if length == 0 {
            // SAFETY: `data` came from this allocator with `capacity` slots.
            unsafe { self.allocator.free_array(data, capacity) };
            return OwnedSlice::empty(self.allocator);
        }
        // SAFETY: `data` holds `length` live elements from `allocator`.
        unsafe { OwnedSlice::from_raw_parts(data, length, self.allocator) }
    }

    /// Frees the elements and the buffer. Equivalent to dropping the array.
    pub fn dealloc(self) {
        drop(self);
    }
}

impl<'a, T: Clone> DynamicArray<'a, T> {
    /// Appends clones of every element of `elems`.
    ///
    /// # Panics
    ///
    /// Panics if the allocator is exhausted.
    pub fn append_slice(&mut self, elems: &[T]) {
        if let Err(err) = self.try_append_slice(elems) {
            panic!("Failed allocation: {err}");
        }
    }

    /// Fallible [`append_slice`](Self::append_slice).
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutOfMemory`] if growing failed; nothing is appended.
    pub fn try_append_slice(&mut self, elems: &[T]) -> Result<()> {
        self.try_reserve(elems.len())?;
        for elem in elems {
            // SAFETY: the reserve made room for every element.
            unsafe { self.data.as_ptr().add(self.length).write(elem.clone()) };
            self.length += 1;
        }
        Ok(())
    }

    /// Clones the live elements into a fresh buffer from `allocator`.
    ///
    /// Returns `None` if `allocator` is exhausted.
    #[must_use]
    pub fn build_slice<'b>(&self, allocator: Allocator<'b>) -> Option<OwnedSlice<'b, T>> {
        if self.length == 0 {
            return Some(OwnedSlice::empty(allocator));
        }
        let data = allocator.alloc_array::<T>(self.length)?;
        for (i, elem) in self.iter().enumerate() {
            // SAFETY: `data` has room for `length` elements.
            unsafe { data.as_ptr().add(i).write(elem.clone()) };
        }
        // SAFETY: every slot was written above.
        Some(unsafe { OwnedSlice::from_raw_parts(data, self.length, allocator) })
    }
}

impl<T> Drop for DynamicArray<'_, T> {
    fn drop(&mut self) {
        self.clear();
        // SAFETY: the buffer came from `allocator` with `capacity` slots.
        unsafe { self.allocator.free_array(self.data, self.capacity) };
    }
}

impl<T> Deref for DynamicArray<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T> DerefMut for DynamicArray<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T> Extend<T> for DynamicArray<'_, T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.append(value);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DynamicArray<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicArray")
            .field("len", &self.length)
            .field("cap", &self.capacity)
            .field("items", &self.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocator::{Allocate, Capabilities};
    use crate::{Arena, HeapAllocator};
    use std::cell::Cell;
    use std::rc::Rc;

    struct Tracked(Rc<Cell<usize>>, u32);

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn test_append_grows_geometrically() {
        let mut arr = DynamicArray::create(HeapAllocator::get());
        assert_eq!(arr.cap(), 0);

        arr.append(1u32);
        assert_eq!(arr.cap(), 4); // align_forward(0 * 2 + 1, 4)
        for i in 2..=5 {
            arr.append(i);
        }
        assert_eq!(arr.cap(), 12); // align_forward(4 * 2 + 1, 4)
        assert_eq!(&arr[..], &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_insert_and_remove_sequence() {
        let mut arr = DynamicArray::create(HeapAllocator::get());
        arr.append(6i32);
        arr.append(9);
        arr.insert(0, 4);
        arr.insert(1, 2);
        arr.insert(2, 0);
        assert_eq!(&arr[..], &[4, 2, 0, 6, 9]);

        arr.remove(arr.size() - 1);
        arr.remove(3);
        assert_eq!(&arr[..], &[4, 2, 0]);
        arr.remove(0);
        arr.remove(0);
        arr.remove(0);
        assert!(arr.is_empty());

        arr.insert(0, 69);
        arr.insert(0, 420);
        assert_eq!(&arr[..], &[420, 69]);
    }

    #[test]
    fn test_insert_at_end_appends() {
        let mut arr = DynamicArray::create(HeapAllocator::get());
        arr.insert(0, 'a');
        arr.insert(1, 'b');
        assert_eq!(&arr[..], &['a', 'b']);
    }

    #[test]
    #[should_panic(expected = "Out of bounds insertion")]
    fn test_insert_out_of_bounds() {
        let mut arr = DynamicArray::create(HeapAllocator::get());
        arr.append(1u8);
        arr.insert(2, 3);
    }

    #[test]
    #[should_panic(expected = "Out of bounds removal")]
    fn test_remove_out_of_bounds() {
        let mut arr: DynamicArray<'_, u8> = DynamicArray::create(HeapAllocator::get());
        arr.remove(0);
    }

    #[test]
    fn test_vacated_slots_are_zeroed() {
        let mut arr = DynamicArray::create(HeapAllocator::get());
        arr.append_slice(&[0xFFu8; 5]);
        arr.remove(0);
        arr.pop();
        let raw = unsafe { std::slice::from_raw_parts(arr.data.as_ptr(), arr.cap()) };
        assert_eq!(&raw[..3], &[0xFF; 3]);
        assert!(raw[3..].iter().all(|&b| b == 0));

        arr.clear();
        let raw = unsafe { std::slice::from_raw_parts(arr.data.as_ptr(), arr.cap()) };
        assert!(raw.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_resize_truncates_and_drops() {
        let drops = Rc::new(Cell::new(0));
        let mut arr = DynamicArray::create(HeapAllocator::get());
        for i in 0..6 {
            arr.append(Tracked(drops.clone(), i));
        }
        arr.resize(2);
        assert_eq!(drops.get(), 4);
        assert_eq!(arr.size(), 2);
        assert_eq!(arr.cap(), 2);
        assert_eq!(arr[1].1, 1);

        arr.resize(10);
        assert_eq!(arr.size(), 2);
        assert_eq!(drops.get(), 4);

        drop(arr);
        assert_eq!(drops.get(), 6);
    }

    #[test]
    fn test_clear_keeps_buffer() {
        let drops = Rc::new(Cell::new(0));
        let mut arr = DynamicArray::create(HeapAllocator::get());
        for i in 0..3 {
            arr.append(Tracked(drops.clone(), i));
        }
        let cap = arr.cap();
        arr.clear();
        assert_eq!(drops.get(), 3);
        assert_eq!(arr.size(), 0);
        assert_eq!(arr.cap(), cap);
    }

    #[test]
    fn test_extract_slice_moves_buffer() {
        let mut arr = DynamicArray::create(HeapAllocator::get());
        arr.extend(1..=4u64);
        let ptr = arr.as_ptr();

        let s = arr.extract_slice();
        assert_eq!(s.len(), 4);
        assert_eq!(s.as_ptr(), ptr);
        assert_eq!(arr.size(), 0);
        assert_eq!(arr.cap(), 0);

        arr.append(9);
        assert_eq!(&arr[..], &[9]);
        assert_eq!(s, [1, 2, 3, 4]);
    }

    #[test]
    fn test_extract_empty_slice() {
        let mut arr: DynamicArray<'_, u16> = DynamicArray::with_capacity(HeapAllocator::get(), 8).unwrap();
        let s = arr.extract_slice();
        assert!(s.is_empty());
        assert_eq!(arr.cap(), 0);
    }

    #[derive(Default)]
    struct CountingHeap {
        frees: Cell<usize>,
    }

    impl Allocate for CountingHeap {
        fn capabilities(&self) -> Capabilities {
            HeapAllocator::get().capabilities()
        }

        fn alloc(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
            HeapAllocator::get().alloc(size, align)
        }

        unsafe fn free(&self, ptr: *mut u8, align: usize) {
            self.frees.set(self.frees.get() + 1);
            unsafe { HeapAllocator::get().free(ptr, align) }
        }

        unsafe fn free_all(&self) {}
    }

    #[test]
    fn test_extract_empty_slice_releases_buffer() {
        let backend = CountingHeap::default();
        let mut arr: DynamicArray<'_, u32> = DynamicArray::with_capacity(Allocator::new(&backend), 4).unwrap();
        arr.append(1);
        arr.pop();

        let s = arr.extract_slice();
        assert!(s.is_empty());
        assert_eq!(backend.frees.get(), 1);
        drop(s);
        drop(arr);
        assert_eq!(backend.frees.get(), 1);
    }

    #[test]
    fn test_build_slice_copies_into_other_allocator() {
        let mut backing = [0u8; 256];
        let arena = Arena::from(&mut backing[..]);

        let mut arr = DynamicArray::create(HeapAllocator::get());
        arr.append_slice(&[String::from("a"), String::from("bc")]);

        let copy = arr.build_slice(arena.allocator()).unwrap();
        assert!(copy.allocator().same_as(arena.allocator()));
        assert_eq!(&copy[..], &arr[..]);
        assert!(arena.offset() > 0);
    }

    #[test]
    fn test_arena_exhaustion_reports_oom() {
        let mut backing = [0u8; 128];
        let arena = Arena::from(&mut backing[..]);
        let mut arr = DynamicArray::create(arena.allocator());

        arr.try_append(1u64).unwrap();
        assert_eq!(arr.cap(), 8);
        let err = arr.try_resize(64).unwrap_err();
        assert!(matches!(err, Error::OutOfMemory { requested: 512, align: 8 }));
        assert_eq!(&arr[..], &[1]);
    }

    #[test]
    fn test_sub_range() {
        let mut arr = DynamicArray::create(HeapAllocator::get());
        arr.extend([1, 2, 3, 4]);
        assert_eq!(arr.sub(1, 3), &[2, 3]);
        assert_eq!(arr.sub(4, 4), &[] as &[i32]);
    }
}
