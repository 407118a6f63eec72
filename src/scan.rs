//! Word-at-a-time record boundary scanning.
//!
//! Records are located with the byte-wise zero detection identity: XOR a word
//! with the broadcast target byte so matches become zero, then
//! `(x - 0x01..01) & !x & 0x80..80` flags them without a branch per byte.

/// Record delimiter.
pub const DELIMITER: u8 = b'\n';

/// Bytes loaded per window. Covers the longest legal record plus its delimiter.
pub const WINDOW: usize = 16;

const ONES: u64 = 0x0101_0101_0101_0101;
const HIGHS: u64 = 0x8080_8080_8080_8080;

/// Sets the high bit of every byte of `word` equal to `byte`.
///
/// The lowest flag is always exact. Higher flags can be spurious only for a
/// byte equal to `byte ^ 0x01` sitting directly above a match, which never
/// happens for the digit, dot and delimiter bytes this crate scans.
#[inline(always)]
pub const fn match_bytes(word: u64, byte: u8) -> u64 {
    let x = word ^ (ONES * byte as u64);
    x.wrapping_sub(ONES) & !x & HIGHS
}

/// Loads up to 16 bytes from the start of `bytes` as a little-endian `u128`.
///
/// Near the end of the buffer the missing bytes read as zero instead of
/// running past the slice.
#[inline(always)]
pub fn read_window(bytes: &[u8]) -> u128 {
    match bytes.first_chunk::<WINDOW>() {
        Some(chunk) => u128::from_le_bytes(*chunk),
        None => {
            let mut padded = [0u8; WINDOW];
            padded[..bytes.len()].copy_from_slice(bytes);
            u128::from_le_bytes(padded)
        }
    }
}

/// Offset of the first delimiter in `window`, or 16 when there is none.
#[inline(always)]
pub fn delimiter_offset(window: u128) -> u32 {
    let low = match_bytes(window as u64, DELIMITER) as u128;
    let high = match_bytes((window >> 64) as u64, DELIMITER) as u128;
    (low | high << 64).trailing_zeros() >> 3
}

/// Position of the next delimiter at or after `offset`.
///
/// Returns `None` when the rest of the buffer holds no delimiter, i.e. the
/// final record runs to the end of the input.
pub fn next_delimiter(bytes: &[u8], mut offset: usize) -> Option<usize> {
    while offset < bytes.len() {
        let found = delimiter_offset(read_window(&bytes[offset..])) as usize;
        if found < WINDOW {
            // zero padding never matches the delimiter
            return Some(offset + found);
        }
        offset += WINDOW;
    }
    None
}
