//! Error type for the fallible parts of the library.
//!
//! Only resource exhaustion, over-long paths and I/O are reported through
//! [`Error`]. Contract violations (bad indices, bad alignments, reading an
//! empty [`Optional`](crate::Optional)) panic instead, and malformed UTF-8
//! is reported in-band by the codec.

use thiserror::Error;

/// Errors reported by containers, buffers and the file helper.
#[derive(Debug, Error)]
pub enum Error {
    /// The allocator could not satisfy a request.
    #[error("out of memory: requested {requested} bytes aligned to {align}")]
    OutOfMemory {
        /// Requested size in bytes.
        requested: usize,
        /// Requested alignment in bytes.
        align: usize,
    },

    /// A path longer than the file helper accepts.
    #[error("path too long: {len} bytes")]
    PathTooLong {
        /// Length of the rejected path in bytes.
        len: usize,
    },

    /// Underlying I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) const fn oom(requested: usize, align: usize) -> Self {
        Error::OutOfMemory { requested, align }
    }
}
