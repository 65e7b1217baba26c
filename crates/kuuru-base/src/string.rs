//! Text assembly on top of [`DynamicArray<u8>`].
//!
//! [`StringBuilder`] appends encoded code points, raw strings and formatted
//! integers into an allocator-backed byte buffer. [`StringBuilder::build`]
//! freezes the result into a [`Text`] without copying.
//!
//! # Examples
//!
//! ```
//! use kuuru_base::{HeapAllocator, StringBuilder};
//!
//! let mut sb = StringBuilder::create(HeapAllocator::get());
//! sb.push_str("x = ");
//! sb.push_integer(-255, 16);
//! sb.push_rune(0x1F980);
//!
//! let text = sb.build();
//! assert_eq!(text, "x = -ff🦀");
//! assert_eq!(sb.size(), 0);
//! ```

use std::fmt;
use std::str::Utf8Error;

use kuuru_log::trace;

use crate::allocator::Allocator;
use crate::array::DynamicArray;
use crate::slice::OwnedSlice;
use crate::utf8::{self, Rune};

const DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Growable byte text.
///
/// The bytes are only guaranteed to be valid UTF-8 if nothing but
/// [`push_rune`](Self::push_rune), [`push_str`](Self::push_str) and
/// [`push_integer`](Self::push_integer) was used.
pub struct StringBuilder<'a> {
    data: DynamicArray<'a, u8>,
}

impl<'a> StringBuilder<'a> {
    /// Creates an empty builder. Nothing is allocated until the first push.
    #[must_use]
    pub fn create(allocator: Allocator<'a>) -> Self {
        StringBuilder {
            data: DynamicArray::create(allocator),
        }
    }

    /// The allocator backing the buffer.
    #[must_use]
    pub fn allocator(&self) -> Allocator<'a> {
        self.data.allocator()
    }

    /// Length in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.size()
    }

    /// Returns `true` if nothing has been pushed since the last build or clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The bytes pushed so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Empties the builder, keeping its buffer.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Frees the buffer. Equivalent to dropping the builder.
    pub fn dealloc(self) {
        self.data.dealloc();
    }

    /// Appends the UTF-8 encoding of `r`. Invalid runes append nothing.
    pub fn push_rune(&mut self, r: Rune) {
        let (bytes, n) = utf8::encode(r);
        self.data.append_slice(&bytes[..n]);
    }

    /// Appends raw bytes.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.data.append_slice(bytes);
    }

    /// Appends the UTF-8 bytes of `s`.
    pub fn push_str(&mut self, s: &str) {
        self.push_bytes(s.as_bytes());
    }

    /// Appends anything that views as bytes.
    pub fn push_string(&mut self, s: impl AsRef<[u8]>) {
        self.push_bytes(s.as_ref());
    }

    /// Appends `value` written in `base` (2, 8, 10 or 16, lowercase).
    ///
    /// Negative values get a leading `-`. Any other base appends
    /// `%!(UNKNOWN BASE)` instead of digits.
    ///
    /// ```
    /// # use kuuru_base::{HeapAllocator, StringBuilder};
    /// let mut sb = StringBuilder::create(HeapAllocator::get());
    /// sb.push_integer(5, 2);
    /// sb.push_str(" ");
    /// sb.push_integer(-8, 8);
    /// sb.push_str(" ");
    /// sb.push_integer(0, 10);
    /// assert_eq!(sb.as_bytes(), b"101 -10 0");
    /// ```
    pub fn push_integer(&mut self, value: i64, base: u32) {
        if value < 0 {
            self.push_rune('-' as Rune);
        }

        if !matches!(base, 2 | 8 | 10 | 16) {
            self.push_str("%!(UNKNOWN BASE)");
            return;
        }

        let begin = self.data.size();
        let base = u64::from(base);
        let mut n = value.unsigned_abs();
        loop {
            self.data.append(DIGITS[(n % base) as usize]);
            n /= base;
            if n == 0 {
                break;
            }
        }

        // Digits were produced least significant first.
        self.data[begin..].reverse();
    }

    /// Freezes the contents into a [`Text`] and leaves the builder empty.
    ///
    /// The buffer is shrunk to fit first; if the allocator cannot provide
    /// the smaller buffer, the current one is handed over as is.
    pub fn build(&mut self) -> Text<'a> {
        if let Err(err) = self.data.try_resize(self.data.size()) {
            trace!("string builder kept {} spare bytes: {err}", self.data.cap() - self.data.size());
        }
        Text {
            bytes: self.data.extract_slice(),
        }
    }
}

impl fmt::Write for StringBuilder<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.data.try_append_slice(s.as_bytes()).map_err(|_| fmt::Error)
    }

    fn write_char(&mut self, c: char) -> fmt::Result {
        let mut buf = [0u8; 4];
        self.write_str(c.encode_utf8(&mut buf))
    }
}

impl fmt::Debug for StringBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringBuilder")
            .field("text", &String::from_utf8_lossy(self.as_bytes()))
            .field("cap", &self.data.cap())
            .finish()
    }
}

/// Frozen text produced by [`StringBuilder::build`].
pub struct Text<'a> {
    bytes: OwnedSlice<'a, u8>,
}

impl<'a> Text<'a> {
    /// The raw bytes of the text.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` for the empty text.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Iterates over `(rune, encoded length)` pairs.
    #[must_use]
    pub fn iter(&self) -> utf8::Iter<'_> {
        utf8::Iter::new(&self.bytes)
    }

    /// Views the text as `&str`.
    ///
    /// # Errors
    ///
    /// Fails if the bytes are not valid UTF-8.
    pub fn to_str(&self) -> Result<&str, Utf8Error> {
        std::str::from_utf8(&self.bytes)
    }

    /// The allocator that owns the bytes.
    #[must_use]
    pub fn allocator(&self) -> Allocator<'a> {
        self.bytes.allocator()
    }

    /// Gives up the text wrapper and returns the underlying buffer.
    #[must_use]
    pub fn into_owned_slice(self) -> OwnedSlice<'a, u8> {
        self.bytes
    }
}

impl PartialEq<str> for Text<'_> {
    fn eq(&self, other: &str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<&str> for Text<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl PartialEq<[u8]> for Text<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl PartialEq for Text<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl fmt::Display for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for Text<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&String::from_utf8_lossy(self.as_bytes()), f)
    }
}
