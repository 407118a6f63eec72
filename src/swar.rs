//! Scalar dotted-quad parsing with SWAR arithmetic.
//!
//! The record is loaded as two 64-bit words and every byte is masked to its
//! low nibble: digits become 0..=9 and `'.'` becomes `0x0E`. The zero detection
//! identity from [`crate::scan`] then yields a per-byte field-end mask (every
//! dot, plus a sentinel one past the record). Two strategies turn that into
//! the packed address:
//!
//! * [`FoldParser`] folds digits into an accumulator, flushing it into the
//!   next byte lane at every field end.
//! * [`SwarParser`] locates each field from the mask and reduces its digits
//!   with a single multiplication by [`MAGIC`].
//!
//! Both must agree bit for bit. Malformed records produce an unspecified value
//! but never panic or read outside the record.

use crate::scan::{self, WINDOW};
use crate::LineParser;

const NIBBLES: u64 = 0x0F0F_0F0F_0F0F_0F0F;
const DOT_NIBBLE: u8 = b'.' & 0x0F;

/// Multiplier placing `100*d0 + 10*d1 + d2` in byte 2 of the product when
/// `d0, d1, d2` occupy bytes 0, 1, 2. Lower bytes of the product stay below
/// 256 so nothing carries into byte 2.
pub const MAGIC: u64 = 1 | 10 << 8 | 100 << 16;

/// Digit-and-dot fold, the general-purpose scalar parser.
pub struct FoldParser;

/// Field-at-a-time parser using [`MAGIC`]. The primary scalar parser.
pub struct SwarParser;

impl LineParser for FoldParser {
    #[inline]
    fn parse_window(window: u128, len: usize) -> u32 {
        fold(window, len)
    }
}

impl LineParser for SwarParser {
    #[inline]
    fn parse_window(window: u128, len: usize) -> u32 {
        magic(window, len)
    }
}

/// Low nibbles of the first `len` bytes of `window`; bytes past `len` are zero.
#[inline(always)]
fn nibble_words(window: u128, len: usize) -> [u64; 2] {
    let keep = !u128::MAX.checked_shl(window_bits(len)).unwrap_or(0);
    let window = window & keep;
    [window as u64 & NIBBLES, (window >> 64) as u64 & NIBBLES]
}

/// High bit set in every byte that ends a field: each dot and byte `len`.
#[inline(always)]
fn field_ends(words: [u64; 2], len: usize) -> u128 {
    let dots = scan::match_bytes(words[0], DOT_NIBBLE) as u128
        | (scan::match_bytes(words[1], DOT_NIBBLE) as u128) << 64;
    dots | 0x80u128.checked_shl(window_bits(len)).unwrap_or(0)
}

#[inline(always)]
fn window_bits(len: usize) -> u32 {
    8 * len.min(WINDOW) as u32
}

#[inline(always)]
fn join(words: [u64; 2]) -> u128 {
    words[0] as u128 | (words[1] as u128) << 64
}

pub(crate) fn fold(window: u128, len: usize) -> u32 {
    let words = nibble_words(window, len);
    let ends = field_ends(words, len);
    let nibbles = join(words);

    let mut shift = 24u32;
    let mut octet = 0u32;
    let mut result = 0u32;
    for i in 0..len.min(WINDOW) {
        let c = (nibbles >> (8 * i)) as u32 & 0xFF;
        let end = (ends >> (8 * i + 7)) as u32 & 1;
        result |= (octet & 0xFF & end.wrapping_neg()).wrapping_shl(shift);
        shift = shift.wrapping_sub(8 * end);
        octet = octet.wrapping_mul(10).wrapping_add(c) & end.wrapping_sub(1);
    }

    result | (octet & 0xFF)
}

pub(crate) fn magic(window: u128, len: usize) -> u32 {
    let words = nibble_words(window, len);
    let nibbles = join(words);
    let mut ends = field_ends(words, len);

    let mut start = 0u32;
    let mut result = 0u32;
    for _ in 0..4 {
        let end = ends.trailing_zeros() >> 3;
        ends &= ends.wrapping_sub(1);
        result = result << 8 | field_value(nibbles, start, end);
        start = end + 1;
    }
    result
}

/// Decimal value of the nibbles in `[start, end)`, at most 3 of them.
#[inline(always)]
fn field_value(nibbles: u128, start: u32, end: u32) -> u32 {
    let width = end.saturating_sub(start).min(3);
    let field = nibbles.checked_shr(8 * start).unwrap_or(0) as u64;
    let digits = field & ((1u64 << (8 * width)) - 1);
    let aligned = digits << (8 * (3 - width));
    (aligned.wrapping_mul(MAGIC) >> 16) as u32 & 0xFF
}
