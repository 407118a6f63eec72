//! Splitting the input into record-aligned chunks and handing them out.

use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::scan;

/// Nominal split of an input into `chunk_count` ranges of `chunk_size` bytes.
///
/// Every nominal boundary `i * chunk_size` (for `i >= 1`) moves forward to the
/// byte after the next delimiter at or after it. The moved boundary is both
/// the end of chunk `i - 1` and the start of chunk `i`, so the ranges cover the
/// input exactly once and no chunk starts inside a record.
#[derive(Debug, Clone, Copy)]
pub struct ChunkPlan<'a> {
    input: &'a [u8],
    chunk_size: usize,
    chunk_count: usize,
}

impl<'a> ChunkPlan<'a> {
    /// Chunk size is `min(max_chunk_size, ceil(len / threads))`, never below 1.
    pub fn new(input: &'a [u8], threads: usize, max_chunk_size: usize) -> Self {
        let even_share = input.len().div_ceil(threads.max(1));
        let chunk_size = max_chunk_size.min(even_share).max(1);
        Self {
            input,
            chunk_size,
            chunk_count: input.len().div_ceil(chunk_size),
        }
    }

    pub fn input(&self) -> &'a [u8] {
        self.input
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Record-aligned byte range of chunk `index`. May be empty when records
    /// are longer than the chunk size.
    pub fn range(&self, index: usize) -> Range<usize> {
        self.boundary(index)..self.boundary(index + 1)
    }

    /// All chunk ranges in order.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.chunk_count).map(|index| self.range(index))
    }

    fn boundary(&self, index: usize) -> usize {
        if index == 0 {
            return 0;
        }
        let nominal = index.saturating_mul(self.chunk_size);
        if nominal >= self.input.len() {
            return self.input.len();
        }
        scan::next_delimiter(self.input, nominal).map_or(self.input.len(), |at| at + 1)
    }
}

/// Shared pull queue of chunk indices.
///
/// Each claim is a single `fetch_add`; an index at or past the chunk count
/// tells the worker the input is exhausted.
#[derive(Debug, Default)]
pub struct ChunkCursor {
    next: AtomicUsize,
}

impl ChunkCursor {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn claim(&self, plan: &ChunkPlan<'_>) -> Option<usize> {
        let index = self.next.fetch_add(1, Ordering::Relaxed);
        (index < plan.chunk_count()).then_some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::thread;

    fn assert_exact_cover(plan: &ChunkPlan<'_>, input: &[u8]) {
        let mut expected_start = 0;
        for range in plan.ranges() {
            assert_eq!(range.start, expected_start, "gap or overlap at {range:?}");
            assert!(range.start <= range.end);
            if range.start > 0 && range.start < input.len() {
                assert_eq!(input[range.start - 1], b'\n', "chunk starts mid-record");
            }
            expected_start = range.end;
        }
        assert_eq!(expected_start, input.len());
    }

    fn random_input(rng: &mut impl Rng, lines: usize) -> Vec<u8> {
        let mut input = Vec::new();
        for _ in 0..lines {
            let addr = std::net::Ipv4Addr::from(rng.gen::<u32>());
            input.extend_from_slice(addr.to_string().as_bytes());
            input.push(b'\n');
        }
        input
    }

    #[test]
    fn chunk_size_is_capped_by_even_share() {
        let input = vec![b'\n'; 1000];
        let plan = ChunkPlan::new(&input, 4, 1 << 20);
        assert_eq!(plan.chunk_size(), 250);
        assert_eq!(plan.chunk_count(), 4);

        let plan = ChunkPlan::new(&input, 4, 100);
        assert_eq!(plan.chunk_size(), 100);
        assert_eq!(plan.chunk_count(), 10);
    }

    #[test]
    fn empty_input_has_no_chunks() {
        let plan = ChunkPlan::new(&[], 8, 1024);
        assert_eq!(plan.chunk_count(), 0);
        assert_eq!(plan.ranges().count(), 0);
    }

    #[test]
    fn input_smaller_than_one_chunk() {
        let input = b"1.2.3.4\n";
        let plan = ChunkPlan::new(input, 1, 1024);
        assert_eq!(plan.ranges().collect::<Vec<_>>(), vec![0..8]);
    }

    #[test]
    fn boundary_on_delimiter_moves_past_it() {
        let input = b"1.2.3.4\n5.6.7.8\n";
        // nominal boundary 7 is the first delimiter itself
        let plan = ChunkPlan::new(input, 1, 7);
        assert_eq!(plan.ranges().collect::<Vec<_>>(), vec![0..8, 8..16, 16..16]);
    }

    #[test]
    fn exactly_divisible_length() {
        let input = b"1.2.3.4\n5.6.7.8\n";
        let plan = ChunkPlan::new(input, 2, 1024);
        assert_eq!(plan.chunk_size(), 8);
        assert_exact_cover(&plan, input);
    }

    #[test]
    fn covers_random_inputs_for_any_split() {
        let mut rng = rand::thread_rng();
        for _ in 0..50 {
            let lines = rng.gen_range(0..200);
            let mut input = random_input(&mut rng, lines);
            if rng.gen_bool(0.3) {
                // final record without its delimiter
                input.pop();
            }
            for threads in [1, 2, 3, 7, 64] {
                for max_chunk in [1, 5, 16, 17, 100, usize::MAX] {
                    let plan = ChunkPlan::new(&input, threads, max_chunk);
                    assert_exact_cover(&plan, &input);
                }
            }
        }
    }

    #[test]
    fn cursor_hands_out_each_index_once() {
        let input = random_input(&mut rand::thread_rng(), 5000);
        let plan = ChunkPlan::new(&input, 8, 512);
        let cursor = ChunkCursor::new();
        let claimed = Mutex::new(Vec::new());

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    while let Some(index) = cursor.claim(&plan) {
                        claimed.lock().unwrap().push(index);
                    }
                });
            }
        });

        let claimed = claimed.into_inner().unwrap();
        let unique: HashSet<_> = claimed.iter().copied().collect();
        assert_eq!(claimed.len(), plan.chunk_count());
        assert_eq!(unique, (0..plan.chunk_count()).collect());
    }
}
