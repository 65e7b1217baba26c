//! UTF-8 encoding, decoding and code point iteration.
//!
//! The codec never panics on bad input. Failures are reported in-band: an
//! encode failure returns the replacement character's bytes with a length of
//! 0, a decode failure returns `(ERROR_RUNE, 0)`.
//!
//! The decoder checks the surrogate range and the continuation byte range but
//! does not reject overlong encodings. `[0xC1, 0xBF]` decodes to `U+007F`
//! with length 2.
//!
//! # Examples
//!
//! ```
//! use kuuru_base::utf8;
//!
//! let (bytes, len) = utf8::encode(0xD55C);
//! assert_eq!(&bytes[..len], "한".as_bytes());
//!
//! let (rune, len) = utf8::decode("한국".as_bytes());
//! assert_eq!((rune, len), (0xD55C, 3));
//!
//! let runes: Vec<_> = utf8::Iter::new(b"a\xCE\xBB").map(|(r, _)| r).collect();
//! assert_eq!(runes, [0x61, 0x3BB]);
//! ```

/// A Unicode code point. Signed so that out-of-range input can be expressed.
pub type Rune = i32;

/// Rune returned by a failed decode (`U+FFFD`).
pub const ERROR_RUNE: Rune = 0xFFFD;

/// Bytes returned by a failed encode: `U+FFFD` followed by a zero pad.
pub const ERROR_RUNE_ENCODED: [u8; 4] = [0xEF, 0xBF, 0xBD, 0x00];

const SURROGATE_MIN: Rune = 0xD800;
const SURROGATE_MAX: Rune = 0xDFFF;

const CONT_MIN: u8 = 0x80;
const CONT_MAX: u8 = 0xBF;

const RANGE_1: Rune = 0x7F;
const RANGE_2: Rune = 0x7FF;
const RANGE_3: Rune = 0xFFFF;
const RANGE_4: Rune = 0x10FFFF;

const MASK_2: u8 = 0x1F; // 0001_1111
const MASK_3: u8 = 0x0F; // 0000_1111
const MASK_4: u8 = 0x07; // 0000_0111
const MASK_X: u8 = 0x3F; // 0011_1111

const SIZE_2: u8 = 0xC0; // 110x_xxxx
const SIZE_3: u8 = 0xE0; // 1110_xxxx
const SIZE_4: u8 = 0xF0; // 1111_0xxx

const CONT: u8 = 0x80; // 10xx_xxxx

const DECODE_ERROR: (Rune, usize) = (ERROR_RUNE, 0);

/// Returns `true` for runes in the UTF-16 surrogate range.
#[inline]
#[must_use]
pub const fn is_surrogate(r: Rune) -> bool {
    r >= SURROGATE_MIN && r <= SURROGATE_MAX
}

#[inline]
const fn cont_byte(r: Rune, shift: u32) -> u8 {
    CONT | ((r >> shift) as u8 & MASK_X)
}

/// Encodes `r`, returning the bytes and how many of them are used.
///
/// Surrogates, negative runes and runes above `U+10FFFF` yield
/// [`ERROR_RUNE_ENCODED`] with a length of 0.
#[must_use]
pub const fn encode(r: Rune) -> ([u8; 4], usize) {
    if is_surrogate(r) || r < 0 || r > RANGE_4 {
        return (ERROR_RUNE_ENCODED, 0);
    }

    if r <= RANGE_1 {
        ([r as u8, 0, 0, 0], 1)
    } else if r <= RANGE_2 {
        ([SIZE_2 | ((r >> 6) as u8 & MASK_2), cont_byte(r, 0), 0, 0], 2)
    } else if r <= RANGE_3 {
        (
            [SIZE_3 | ((r >> 12) as u8 & MASK_3), cont_byte(r, 6), cont_byte(r, 0), 0],
            3,
        )
    } else {
        (
            [
                SIZE_4 | ((r >> 18) as u8 & MASK_4),
                cont_byte(r, 12),
                cont_byte(r, 6),
                cont_byte(r, 0),
            ],
            4,
        )
    }
}

/// Decodes the code point at the start of `bytes`.
///
/// Returns the rune and the number of bytes it occupied, or
/// `(ERROR_RUNE, 0)` if the input is empty, the lead byte is invalid, the
/// sequence is truncated, a continuation byte is out of range or the result
/// is a surrogate.
#[must_use]
pub fn decode(bytes: &[u8]) -> (Rune, usize) {
    let Some(&first) = bytes.first() else {
        return DECODE_ERROR;
    };

    let (len, lead) = if first & CONT == 0 {
        (1, first)
    } else if first & !MASK_2 == SIZE_2 {
        (2, first & MASK_2)
    } else if first & !MASK_3 == SIZE_3 {
        (3, first & MASK_3)
    } else if first & !MASK_4 == SIZE_4 {
        (4, first & MASK_4)
    } else {
        return DECODE_ERROR;
    };

    if bytes.len() < len {
        return DECODE_ERROR;
    }

    let mut codepoint = Rune::from(lead);
    for &b in &bytes[1..len] {
        if !(CONT_MIN..=CONT_MAX).contains(&b) {
            return DECODE_ERROR;
        }
        codepoint = (codepoint << 6) | Rune::from(b & MASK_X);
    }

    if is_surrogate(codepoint) {
        return DECODE_ERROR;
    }

    (codepoint, len)
}

/// Forward-only iterator over the code points of a byte slice.
///
/// Each item is the `(rune, len)` pair from [`decode`]. When the bytes at the
/// cursor are malformed the item is `(ERROR_RUNE, 0)` and the cursor skips a
/// single byte, so iteration always terminates. An exhausted iterator cannot
/// be rewound; build a new one over the same bytes instead.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    data: &'a [u8],
    current: usize,
}

impl<'a> Iter<'a> {
    /// Starts iterating at the beginning of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Iter { data, current: 0 }
    }

    /// Returns `true` once every byte has been consumed.
    #[must_use]
    pub const fn done(&self) -> bool {
        self.current >= self.data.len()
    }

    /// Byte offset of the next code point.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.current
    }
}

impl Iterator for Iter<'_> {
    type Item = (Rune, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done() {
            return None;
        }
        let (rune, len) = decode(&self.data[self.current..]);
        self.current += len.max(1);
        Some((rune, len))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.data.len() - self.current.min(self.data.len());
        (left.div_ceil(4), Some(left))
    }
}

impl std::iter::FusedIterator for Iter<'_> {}
