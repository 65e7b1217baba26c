//! General-purpose allocator backed by the global allocator.
//!
//! `std::alloc::dealloc` needs the allocation's layout, but [`Allocate::free`]
//! only receives the pointer and its alignment. Every block therefore carries
//! a header in front of the returned pointer:
//!
//! ```text
//! base                          ptr (returned)
//! |<-------- max(align, 8) ---->|<------- size -------->|
//! [ padding ...    | total: usize ][ zeroed user bytes ]
//! ```
//!
//! The header width is recomputed from `align` on free, so the alignment
//! passed to `free` must match the one used to allocate.

use std::alloc::{self, Layout};
use std::mem;
use std::ptr::NonNull;

use crate::allocator::{Allocate, Allocator, Capabilities};
use crate::mem::valid_alignment;

const SIZE_SLOT: usize = mem::size_of::<usize>();

/// Allocator that forwards to the process heap.
///
/// Supports arbitrary sizes and alignments and out-of-order frees. It keeps
/// no record of live allocations, so `free_all` is not supported and is
/// ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapAllocator;

static HEAP: HeapAllocator = HeapAllocator;

impl HeapAllocator {
    /// Returns a handle to the process heap.
    ///
    /// # Examples
    ///
    /// ```
    /// use kuuru_base::{Capabilities, HeapAllocator};
    ///
    /// let heap = HeapAllocator::get();
    /// assert_eq!(
    ///     heap.capabilities(),
    ///     Capabilities::ALLOC_ANY | Capabilities::FREE_ANY | Capabilities::ALIGN_ANY
    /// );
    /// ```
    #[must_use]
    pub fn get() -> Allocator<'static> {
        Allocator::new(&HEAP)
    }

    #[inline]
    const fn header_size(align: usize) -> usize {
        if align > SIZE_SLOT { align } else { SIZE_SLOT }
    }

    #[inline]
    const fn block_align(align: usize) -> usize {
        let min = mem::align_of::<usize>();
        if align > min { align } else { min }
    }
}

impl Allocate for HeapAllocator {
    fn capabilities(&self) -> Capabilities {
        Capabilities::ALLOC_ANY | Capabilities::FREE_ANY | Capabilities::ALIGN_ANY
    }

    fn alloc(&self, size: usize, align: usize) -> Option<NonNull<u8>> {
        if size == 0 {
            return None;
        }
        debug_assert!(valid_alignment(align), "Invalid memory alignment: {align}");

        let offset = Self::header_size(align);
        let total = size.checked_add(offset)?;
        // Also rejects non power-of-two alignments in release builds.
        let layout = Layout::from_size_align(total, Self::block_align(align)).ok()?;

        // SAFETY: total > 0.
        let base = NonNull::new(unsafe { alloc::alloc_zeroed(layout) })?;

        // SAFETY: offset < total, and offset is a multiple of both `align`
        // and the usize alignment, so the size slot right before `ptr` is
        // in bounds and aligned.
        unsafe {
            let ptr = base.add(offset);
            ptr.cast::<usize>().sub(1).write(total);
            Some(ptr)
        }
    }

    unsafe fn free(&self, ptr: *mut u8, align: usize) {
        if ptr.is_null() {
            return;
        }
        let offset = Self::header_size(align);
        // SAFETY: the caller guarantees `ptr` came from `alloc` with this
        // alignment, so the header is where `alloc` put it.
        unsafe {
            let total = ptr.cast::<usize>().sub(1).read();
            let base = ptr.sub(offset);
            let layout = Layout::from_size_align_unchecked(total, Self::block_align(align));
            alloc::dealloc(base, layout);
        }
    }

    unsafe fn free_all(&self) {}
}
