//! The allocator interface every container in this crate allocates through.
//!
//! An allocator is anything implementing [`Allocate`]. Callers never hold the
//! implementation directly; they pass around an [`Allocator`] handle, a
//! `Copy` value that borrows the implementation. Which operations a backend
//! really supports is discoverable at runtime through [`Capabilities`].
//!
//! # Failure policy
//!
//! - Running out of memory is not an error: [`Allocate::alloc`] returns
//!   `None` and leaves the allocator untouched.
//! - Calling an operation the backend does not support is a contract
//!   violation. `free` and `free_all` on such backends are silently ignored.
//! - Freeing with a different alignment than the one used to allocate is
//!   undefined behaviour for backends that use the alignment to find the
//!   allocation.
//!
//! # Examples
//!
//! ```
//! use kuuru_base::{Capabilities, HeapAllocator};
//!
//! let heap = HeapAllocator::get();
//! assert!(heap.supports(Capabilities::FREE_ANY));
//!
//! let ptr = heap.alloc(64, 16).expect("heap exhausted");
//! assert_eq!(ptr.as_ptr() as usize % 16, 0);
//! unsafe { heap.free(ptr.as_ptr(), 16) };
//! ```

use std::fmt;
use std::mem;
use std::ptr::{self, NonNull};

use bitflags::bitflags;
use bytemuck::Zeroable;

use crate::slice::OwnedSlice;

bitflags! {
    /// Operations an allocator instance actually supports.
    pub struct Capabilities: u32 {
        /// Allocation of arbitrary sizes.
        const ALLOC_ANY = 1 << 0;
        /// Individual, out-of-order `free`.
        const FREE_ANY = 1 << 1;
        /// Bulk `free_all`.
        const FREE_ALL = 1 << 2;
        /// Arbitrary power-of-two alignment.
        const ALIGN_ANY = 1 << 3;
    }
}

/// An allocation strategy.
///
/// Implementations take `&self` and use interior mutability for their
/// bookkeeping, which is what lets [`Allocator`] be a plain `Copy` handle.
/// No implementation in this crate is thread-safe.
pub trait Allocate {
    /// Reports which operations this instance supports. Never fails.
    fn capabilities(&self) -> Capabilities;

    /// Allocates `size` zero-filled bytes aligned to `align`.
    ///
    /// A `size` of 0 returns `None` without side effects. Exhaustion returns
    /// `None`; implementations must not panic or log on this path.
    fn alloc(&self, size: usize, align: usize) -> Option<NonNull<u8>>;

    /// Releases one allocation. A null `ptr` is a no-op.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or have been returned by `alloc` on this same
    /// instance with the same `align`, and must not have been freed already.
    unsafe fn free(&self, ptr: *mut u8, align: usize);

    /// Releases every allocation made through this instance.
    ///
    /// # Safety
    ///
    /// No pointer or reference into memory obtained from this instance may be
    /// used afterwards.
    unsafe fn free_all(&self);
}

/// A copyable handle to an [`Allocate`] implementation.
#[derive(Clone, Copy)]
pub struct Allocator<'a> {
    imp: &'a dyn Allocate,
}

impl<'a> Allocator<'a> {
    /// Wraps an implementation.
    #[must_use]
    pub const fn new(imp: &'a dyn Allocate) -> Self {
        Allocator { imp }
    }

    /// See [`Allocate::capabilities`].
    #[inline]
    #[must_use]
    pub fn capabilities(self) -> Capabilities {
        self.imp.capabilities()
    }

    /// Returns `true` if every capability in `caps` is supported.
    #[inline]
    #[must_use]
    pub fn supports(self, caps: Capabilities) -> bool {
        self.capabilities().contains(caps)
    }

    /// See [`Allocate::alloc`].
    #[inline]
    #[must_use]
    pub fn alloc(self, size: usize, align: usize) -> Option<NonNull<u8>> {
        self.imp.alloc(size, align)
    }

    /// See [`Allocate::free`].
    ///
    /// # Safety
    ///
    /// Same contract as [`Allocate::free`].
    #[inline]
    pub unsafe fn free(self, ptr: *mut u8, align: usize) {
        unsafe { self.imp.free(ptr, align) }
    }

    /// See [`Allocate::free_all`].
    ///
    /// # Safety
    ///
    /// Same contract as [`Allocate::free_all`].
    #[inline]
    pub unsafe fn free_all(self) {
        unsafe { self.imp.free_all() }
    }

    /// Returns `true` if both handles point at the same implementation.
    #[must_use]
    pub fn same_as(self, other: Allocator<'_>) -> bool {
        ptr::addr_eq(self.imp as *const dyn Allocate, other.imp as *const dyn Allocate)
    }

    /// Allocates one zeroed `T`.
    ///
    /// Returns `None` on exhaustion and for zero-sized `T`.
    #[must_use]
    pub fn make<T: Zeroable>(self) -> Option<NonNull<T>> {
        self.alloc(mem::size_of::<T>(), mem::align_of::<T>())
            .map(NonNull::cast)
    }

    /// Drops the `T` at `ptr` and frees its memory.
    ///
    /// # Safety
    ///
    /// `ptr` must come from [`make`](Self::make) on an allocator backed by
    /// the same implementation, hold an initialized `T`, and not be used
    /// afterwards.
    pub unsafe fn destroy<T>(self, ptr: NonNull<T>) {
        unsafe {
            ptr::drop_in_place(ptr.as_ptr());
            self.free(ptr.as_ptr().cast(), mem::align_of::<T>());
        }
    }

    /// Allocates `n` zeroed `T`s as an owned slice.
    ///
    /// `n == 0` yields an empty slice that owns no memory. Returns `None` on
    /// exhaustion or if the byte size overflows.
    #[must_use]
    pub fn make_slice<T: Zeroable>(self, n: usize) -> Option<OwnedSlice<'a, T>> {
        if n == 0 || mem::size_of::<T>() == 0 {
            return Some(OwnedSlice::empty(self));
        }
        let ptr = self.alloc_array::<T>(n)?;
        // SAFETY: the allocator hands out zeroed memory and T is Zeroable.
        Some(unsafe { OwnedSlice::from_raw_parts(ptr, n, self) })
    }

    /// Allocates room for `n` values of `T` without initializing them.
    pub(crate) fn alloc_array<T>(self, n: usize) -> Option<NonNull<T>> {
        let size = mem::size_of::<T>().checked_mul(n)?;
        self.alloc(size, mem::align_of::<T>()).map(NonNull::cast)
    }

    /// Frees memory from [`alloc_array`](Self::alloc_array). Does nothing
    /// for buffers that never held an allocation.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `alloc_array::<T>(n)` on this allocator, or
    /// `n * size_of::<T>()` must be 0.
    pub(crate) unsafe fn free_array<T>(self, ptr: NonNull<T>, n: usize) {
        if n == 0 || mem::size_of::<T>() == 0 {
            return;
        }
        unsafe { self.free(ptr.as_ptr().cast(), mem::align_of::<T>()) }
    }
}

impl fmt::Debug for Allocator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allocator")
            .field("impl", &(self.imp as *const dyn Allocate).cast::<()>())
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Counts calls and refuses everything.
    #[derive(Default)]
    struct Refusing {
        allocs: Cell<usize>,
        frees: Cell<usize>,
    }

    impl Allocate for Refusing {
        fn capabilities(&self) -> Capabilities {
            Capabilities::ALLOC_ANY
        }

        fn alloc(&self, _size: usize, _align: usize) -> Option<NonNull<u8>> {
            self.allocs.set(self.allocs.get() + 1);
            None
        }

        unsafe fn free(&self, _ptr: *mut u8, _align: usize) {
            self.frees.set(self.frees.get() + 1);
        }

        unsafe fn free_all(&self) {}
    }

    #[test]
    fn test_capability_bits() {
        assert_eq!(Capabilities::ALLOC_ANY.bits(), 1);
        assert_eq!(Capabilities::FREE_ANY.bits(), 2);
        assert_eq!(Capabilities::FREE_ALL.bits(), 4);
        assert_eq!(Capabilities::ALIGN_ANY.bits(), 8);
    }

    #[test]
    fn test_custom_backend_dispatch() {
        let backend = Refusing::default();
        let a = Allocator::new(&backend);

        assert!(a.supports(Capabilities::ALLOC_ANY));
        assert!(!a.supports(Capabilities::ALLOC_ANY | Capabilities::FREE_ALL));
        assert!(a.alloc(16, 8).is_none());
        assert!(a.make::<u64>().is_none());
        assert!(a.make_slice::<u32>(4).is_none());
        assert_eq!(backend.allocs.get(), 3);
    }

    #[test]
    fn test_make_slice_empty_skips_backend() {
        let backend = Refusing::default();
        let a = Allocator::new(&backend);

        let s = a.make_slice::<u8>(0).unwrap();
        assert!(s.is_empty());
        drop(s);
        assert_eq!(backend.allocs.get(), 0);
        assert_eq!(backend.frees.get(), 0);
    }

    #[test]
    fn test_make_slice_overflow() {
        let backend = Refusing::default();
        let a = Allocator::new(&backend);
        assert!(a.make_slice::<u64>(usize::MAX).is_none());
        assert_eq!(backend.allocs.get(), 0);
    }

    #[test]
    fn test_make_then_destroy_drops_once() {
        use crate::HeapAllocator;
        use std::sync::atomic::{AtomicUsize, Ordering};

        static DROPS: AtomicUsize = AtomicUsize::new(0);

        #[repr(C)]
        struct Node {
            id: u64,
            weight: u32,
        }

        // SAFETY: all-zero bytes are a valid `Node`.
        unsafe impl Zeroable for Node {}

        impl Drop for Node {
            fn drop(&mut self) {
                DROPS.fetch_add(1, Ordering::Relaxed);
            }
        }

        let heap = HeapAllocator::get();
        let node = heap.make::<Node>().unwrap();
        assert_eq!(node.as_ptr() as usize % mem::align_of::<Node>(), 0);
        unsafe {
            assert_eq!((node.as_ref().id, node.as_ref().weight), (0, 0));
            (*node.as_ptr()).id = 7;
            assert_eq!(node.as_ref().id, 7);
            heap.destroy(node);
        }
        assert_eq!(DROPS.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_same_as() {
        let one = Refusing::default();
        let two = Refusing::default();
        let a = Allocator::new(&one);
        let b = a;
        assert!(a.same_as(b));
        assert!(!a.same_as(Allocator::new(&two)));
    }
}
