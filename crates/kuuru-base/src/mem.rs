//! Alignment arithmetic shared by the allocators and containers.

/// Returns `true` if `align` is a non-zero power of two.
#[inline]
#[must_use]
pub const fn valid_alignment(align: usize) -> bool {
    align != 0 && (align & (align - 1)) == 0
}

/// Rounds `n` up to the next multiple of `align`.
///
/// # Panics
///
/// Panics if `align` is not a power of two. Overflow panics in debug builds.
///
/// # Examples
///
/// ```
/// use kuuru_base::mem::align_forward;
///
/// assert_eq!(align_forward(13, 8), 16);
/// assert_eq!(align_forward(16, 8), 16);
/// assert_eq!(align_forward(0, 4), 0);
/// ```
#[inline]
#[must_use]
pub const fn align_forward(n: usize, align: usize) -> usize {
    assert!(valid_alignment(align), "Invalid memory alignment");
    let rem = n & (align - 1);
    if rem == 0 { n } else { n + (align - rem) }
}

/// Like [`align_forward`] but returns `None` instead of overflowing.
#[inline]
#[must_use]
pub const fn checked_align_forward(n: usize, align: usize) -> Option<usize> {
    assert!(valid_alignment(align), "Invalid memory alignment");
    let rem = n & (align - 1);
    if rem == 0 { Some(n) } else { n.checked_add(align - rem) }
}
