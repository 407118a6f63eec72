//! Single-shot dotted-quad parsing over a 16-lane byte vector.
//!
//! The record's lanes are compared against `'.'` in parallel, the resulting
//! lane mask plus an end-of-record bit forms the dispatch key, and the plan
//! from [`DISPATCH`] gathers the digits into fixed lanes so every octet can be
//! summed at once. Records the table does not know (longer than 15 bytes or
//! not four 1..=3 digit fields) are handed to the scalar fold.

use wide::{i8x16, CmpEq};

use crate::dispatch::{Plan, WidthClass, DISPATCH, MAX_RECORD};
use crate::{swar, LineParser};

/// Parser dispatching on the record's punctuation layout.
pub struct VectorParser;

impl LineParser for VectorParser {
    #[inline]
    fn parse_window(window: u128, len: usize) -> u32 {
        if len > MAX_RECORD {
            return swar::fold(window, len);
        }
        let bytes = (window & ((1u128 << (8 * len)) - 1)).to_le_bytes();

        let lanes = i8x16::new(bytes.map(|b| b as i8));
        let dots = lanes.cmp_eq(i8x16::splat(b'.' as i8)).move_mask() as u32;
        let key = dots | 1 << len;

        match DISPATCH.lookup(key) {
            Some(plan) => combine(bytes, plan),
            None => swar::fold(window, len),
        }
    }
}

#[cfg(all(target_arch = "x86_64", target_feature = "ssse3"))]
#[inline(always)]
fn combine(bytes: [u8; 16], plan: Plan) -> u32 {
    use safe_arch::*;

    let input = m128i::from(bytes);
    let gathered = shuffle_av_i8z_all_m128i(input, m128i::from(plan.shuffle));
    let digits = sub_saturating_u8_m128i(gathered, set_splat_i8_m128i(b'0' as i8));
    match plan.class {
        WidthClass::One => get_i32_from_m128i_s(digits) as u32,
        WidthClass::Two => tens_and_ones(get_i64_from_m128i_s(digits) as u64),
        WidthClass::Three => {
            let weights = m128i::from(WEIGHTS.map(|w| w as i8));
            let pairs = mul_u8i8_add_horizontal_saturating_m128i(digits, weights);
            let hundreds = combined_byte_shr_imm_m128i::<8>(pairs, pairs);
            let sums = add_i16_m128i(pairs, hundreds);
            get_i32_from_m128i_s(pack_i16_to_u8_m128i(sums, sums)) as u32
        }
    }
}

#[cfg(not(all(target_arch = "x86_64", target_feature = "ssse3")))]
#[inline(always)]
fn combine(bytes: [u8; 16], plan: Plan) -> u32 {
    use wide::u16x8;

    let digits = gather(&bytes, &plan.shuffle);
    match plan.class {
        WidthClass::One => u32::from_le_bytes([digits[0], digits[1], digits[2], digits[3]]),
        WidthClass::Two => {
            let mut low = [0u8; 8];
            low.copy_from_slice(&digits[..8]);
            tens_and_ones(u64::from_le_bytes(low))
        }
        WidthClass::Three => {
            let even = u16x8::new(std::array::from_fn(|i| digits[2 * i] as u16));
            let odd = u16x8::new(std::array::from_fn(|i| digits[2 * i + 1] as u16));
            let even_weights = u16x8::new(std::array::from_fn(|i| WEIGHTS[2 * i] as u16));
            let odd_weights = u16x8::new(std::array::from_fn(|i| WEIGHTS[2 * i + 1] as u16));
            let pairs = (even * even_weights + odd * odd_weights).to_array();
            let octets: [u8; 4] = std::array::from_fn(|j| (pairs[j] + pairs[j + 4]).min(255) as u8);
            u32::from_le_bytes(octets)
        }
    }
}

/// Lane weights for three-digit layouts: `(tens, ones)` pairs, then hundreds.
const WEIGHTS: [u8; 16] = [10, 1, 10, 1, 10, 1, 10, 1, 100, 0, 100, 0, 100, 0, 100, 0];

/// Lanes 0..4 hold tens digits and lanes 4..8 ones digits.
#[inline(always)]
fn tens_and_ones(lanes: u64) -> u32 {
    let tens = lanes as u32;
    let ones = (lanes >> 32) as u32;
    tens.wrapping_mul(10).wrapping_add(ones)
}

/// Portable byte shuffle: digit value of `bytes[plan[i]]`, zero for
/// [`crate::dispatch::ZERO_LANE`].
#[cfg(not(all(target_arch = "x86_64", target_feature = "ssse3")))]
#[inline(always)]
fn gather(bytes: &[u8; 16], plan: &[u8; 16]) -> [u8; 16] {
    std::array::from_fn(|i| match bytes.get(plan[i] as usize) {
        Some(b) => b.saturating_sub(b'0'),
        None => 0,
    })
}
