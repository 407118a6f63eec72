//! Layout dispatch table for [`crate::vector`].
//!
//! A record's layout is fully described by the width (1..=3 digits) of each
//! of its four fields, giving 81 layouts. The vector parser reduces a record
//! to a key, the bitmask of its dot lanes with one extra bit at the record
//! length, and [`slot`] hashes that key into a table of [`SLOTS`] entries.
//!
//! The table is built by a `const fn` when the crate compiles: enumerating all
//! 81 layouts and asserting that no two share a slot, so a collision in the
//! hash fails the build instead of mis-parsing at run time.

/// Longest legal record, `255.255.255.255`.
pub const MAX_RECORD: usize = 15;

/// Number of distinct field-width layouts.
pub const LAYOUTS: usize = 81;

/// Table length: one past the largest slot any legal layout hashes to.
pub const SLOTS: usize = 1229;

/// Shuffle index meaning "produce a zero lane".
pub const ZERO_LANE: u8 = 0x80;

/// Digit lanes needed by a layout: its widest field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidthClass {
    /// Every field is one digit; the gathered lanes are the octets.
    One,
    /// Tens lanes and ones lanes, combined as `10 * tens + ones`.
    Two,
    /// `(tens, ones)` lane pairs plus hundreds lanes, combined by weighted sums.
    Three,
}

/// What the vector parser needs for one layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plan {
    pub class: WidthClass,
    /// Source lane for every output lane, or [`ZERO_LANE`].
    pub shuffle: [u8; 16],
}

pub struct DispatchTable {
    keys: [u16; SLOTS],
    widths: [u8; SLOTS],
    plan_ids: [u8; SLOTS],
    shuffles: [[u8; 16]; LAYOUTS + 1],
}

/// Generated table shared read-only by every worker.
pub static DISPATCH: DispatchTable = DispatchTable::generate();

/// Hashes a field-boundary key into the table.
#[inline(always)]
pub const fn slot(key: u32) -> usize {
    ((key >> 5) ^ (key & 0x3FF)) as usize
}

impl DispatchTable {
    /// Plan for a field-boundary key, or `None` if no legal layout has it.
    #[inline(always)]
    pub fn lookup(&self, key: u32) -> Option<Plan> {
        let slot = slot(key);
        if slot >= SLOTS || self.keys[slot] as u32 != key {
            return None;
        }
        let class = match self.widths[slot] {
            1 => WidthClass::One,
            2 => WidthClass::Two,
            3 => WidthClass::Three,
            _ => return None,
        };
        Some(Plan {
            class,
            shuffle: self.shuffles[self.plan_ids[slot] as usize],
        })
    }

    const fn generate() -> Self {
        let mut table = DispatchTable {
            keys: [0; SLOTS],
            widths: [0; SLOTS],
            plan_ids: [0; SLOTS],
            shuffles: [[ZERO_LANE; 16]; LAYOUTS + 1],
        };

        let mut layout = 0;
        while layout < LAYOUTS {
            let widths = layout_widths(layout);
            let key = layout_key(widths);
            let slot = slot(key);
            assert!(slot < SLOTS, "layout hashes outside the table");
            assert!(table.widths[slot] == 0, "two layouts hash to the same slot");

            let widest = widest(widths);
            // id 0 stays the all-zero hole
            let id = layout + 1;
            table.keys[slot] = key as u16;
            table.widths[slot] = widest as u8;
            table.plan_ids[slot] = id as u8;
            table.shuffles[id] = shuffle_plan(widths, widest);
            layout += 1;
        }
        table
    }
}

/// Field widths of layout number `layout`, in base 3.
pub const fn layout_widths(layout: usize) -> [usize; 4] {
    [
        layout / 27 % 3 + 1,
        layout / 9 % 3 + 1,
        layout / 3 % 3 + 1,
        layout % 3 + 1,
    ]
}

/// Dot lanes of a layout plus the end-of-record bit.
pub const fn layout_key(widths: [usize; 4]) -> u32 {
    let mut key = 0u32;
    let mut end = 0;
    let mut field = 0;
    while field < 4 {
        end += widths[field];
        // a dot after the first three fields, the sentinel after the last
        key |= 1 << end;
        end += 1;
        field += 1;
    }
    key
}

const fn widest(widths: [usize; 4]) -> usize {
    let mut widest = 0;
    let mut field = 0;
    while field < 4 {
        if widths[field] > widest {
            widest = widths[field];
        }
        field += 1;
    }
    widest
}

/// Gathers digits so octet `k` (first octet is `k = 0`) lands in result lane
/// `3 - k`, read back as a little-endian `u32`.
const fn shuffle_plan(widths: [usize; 4], widest: usize) -> [u8; 16] {
    let mut plan = [ZERO_LANE; 16];
    let mut start = 0;
    let mut k = 0;
    while k < 4 {
        let width = widths[k];
        let lane = 3 - k;
        let last = (start + width - 1) as u8;
        match widest {
            1 => plan[lane] = start as u8,
            2 => {
                plan[4 + lane] = last;
                if width == 2 {
                    plan[lane] = start as u8;
                }
            }
            _ => {
                plan[2 * lane + 1] = last;
                if width >= 2 {
                    plan[2 * lane] = last - 1;
                }
                if width == 3 {
                    plan[8 + 2 * lane] = start as u8;
                }
            }
        }
        start += width + 1;
        k += 1;
    }
    plan
}
