//! Kuuru base runtime layer
//!
//! Memory and text primitives shared by the Kuuru toolchain:
//!
//! - **Allocators**: the [`Allocate`] trait, the copyable [`Allocator`]
//!   handle, and two backends, [`HeapAllocator`] and the bump-pointer
//!   [`Arena`]
//! - **Containers**: [`DynamicArray`], [`OwnedSlice`] and [`BytesBuffer`],
//!   all allocating exclusively through an [`Allocator`]
//! - **Text**: [`StringBuilder`], frozen [`Text`] values and the [`utf8`]
//!   codec
//! - **Files**: [`fs::read_whole_file`] (`fs` feature, on by default)
//!
//! Nothing here is thread-safe. Allocators are passed explicitly; there is no
//! global allocator state.
//!
//! # Example
//!
//! ```
//! use kuuru_base::{Arena, StringBuilder};
//!
//! let mut backing = [0u8; 1024];
//! let arena = Arena::from(&mut backing[..]);
//!
//! let mut sb = StringBuilder::create(arena.allocator());
//! sb.push_str("answer: ");
//! sb.push_integer(42, 10);
//! assert_eq!(sb.build(), "answer: 42");
//! ```

pub mod allocator;
pub mod arena;
pub mod array;
pub mod buffer;
pub mod error;
#[cfg(feature = "fs")]
pub mod fs;
pub mod heap;
pub mod mem;
pub mod optional;
pub mod slice;
pub mod string;
pub mod utf8;

pub use allocator::{Allocate, Allocator, Capabilities};
pub use arena::Arena;
pub use array::DynamicArray;
pub use buffer::BytesBuffer;
pub use error::{Error, Result};
pub use heap::HeapAllocator;
pub use optional::Optional;
pub use slice::OwnedSlice;
pub use string::{StringBuilder, Text};
pub use utf8::Rune;
