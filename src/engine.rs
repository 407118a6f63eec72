//! Worker pool and run orchestration.

use std::panic;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::bitset::PresenceBitmap;
use crate::chunks::{ChunkCursor, ChunkPlan};
use crate::config::{EngineConfig, ParserKind};
use crate::error::{Error, Result};
use crate::input::MappedInput;
use crate::scan::{self, WINDOW};
use crate::swar::SwarParser;
use crate::vector::VectorParser;
use crate::{record, LineParser};

/// Outcome of one counting run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    /// Distinct addresses seen.
    pub distinct: u64,
    /// Non-empty records parsed.
    pub lines: u64,
    pub chunks: usize,
    /// Worker threads actually started.
    pub threads: usize,
}

/// Scans one chunk and returns the number of records it inserted.
/// The second argument is the chunk's offset in the whole input.
type ChunkScanner = fn(&[u8], usize, &PresenceBitmap) -> Result<u64>;

struct Scan {
    lines: u64,
    chunks: usize,
    threads: usize,
}

pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Maps the file at `path` and counts it.
    pub fn count_file(&self, path: impl AsRef<Path>) -> Result<Summary> {
        let input = MappedInput::open(path)?;
        self.count(&input)
    }

    pub fn count(&self, input: &[u8]) -> Result<Summary> {
        let start = Instant::now();
        let mut bitmap = PresenceBitmap::new();
        let scan = self.run(input, &bitmap)?;
        // every worker has been joined by `run`
        let distinct = bitmap.count();

        let elapsed = start.elapsed();
        let mib = input.len() as f64 / (1u64 << 20) as f64;
        let mib_per_sec = mib / elapsed.as_secs_f64().max(1e-9);
        info!(
            distinct,
            lines = scan.lines,
            chunks = scan.chunks,
            threads = scan.threads,
            elapsed_ms = elapsed.as_millis() as u64,
            mib_per_sec = (mib_per_sec * 10.0).round() / 10.0,
            "count finished"
        );

        Ok(Summary {
            distinct,
            lines: scan.lines,
            chunks: scan.chunks,
            threads: scan.threads,
        })
    }

    /// Inserts every record of `input` into `bitmap` without counting it.
    /// Returns the number of records parsed.
    pub fn scan_into(&self, input: &[u8], bitmap: &PresenceBitmap) -> Result<u64> {
        self.run(input, bitmap).map(|scan| scan.lines)
    }

    fn run(&self, input: &[u8], bitmap: &PresenceBitmap) -> Result<Scan> {
        let plan = ChunkPlan::new(input, self.config.threads, self.config.max_chunk_size);
        let threads = self.config.threads.min(plan.chunk_count());
        debug!(
            bytes = input.len(),
            chunk_size = plan.chunk_size(),
            chunks = plan.chunk_count(),
            threads,
            parser = %self.config.parser,
            strict = self.config.strict,
            "starting scan"
        );

        let scanner = self.scanner();
        let cursor = ChunkCursor::new();
        let failed = AtomicBool::new(false);

        let lines = thread::scope(|s| {
            let (plan, cursor, failed) = (&plan, &cursor, &failed);

            let mut handles = Vec::with_capacity(threads);
            for id in 0..threads {
                let spawned = thread::Builder::new()
                    .name(format!("ipv4-worker-{id}"))
                    .spawn_scoped(s, move || worker(plan, cursor, failed, bitmap, scanner));
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(err) => {
                        // workers already running see the flag and stop
                        failed.store(true, Ordering::Relaxed);
                        return Err(Error::Spawn(err));
                    }
                }
            }

            let mut lines = 0;
            let mut first_error = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(count)) => lines += count,
                    Ok(Err(err)) => first_error = Some(earliest(first_error, err)),
                    Err(payload) => panic::resume_unwind(payload),
                }
            }
            match first_error {
                Some(err) => Err(err),
                None => Ok(lines),
            }
        });

        let lines = lines.inspect_err(|err| warn!(%err, "scan aborted"))?;
        Ok(Scan {
            lines,
            chunks: plan.chunk_count(),
            threads,
        })
    }

    fn scanner(&self) -> ChunkScanner {
        match (self.config.strict, self.config.parser) {
            (true, _) => scan_chunk_strict,
            (false, ParserKind::Scalar) => {
                |chunk, _, bitmap| Ok(scan_chunk::<SwarParser>(chunk, bitmap))
            }
            (false, ParserKind::Vector) => {
                |chunk, _, bitmap| Ok(scan_chunk::<VectorParser>(chunk, bitmap))
            }
        }
    }
}

fn worker(
    plan: &ChunkPlan<'_>,
    cursor: &ChunkCursor,
    failed: &AtomicBool,
    bitmap: &PresenceBitmap,
    scanner: ChunkScanner,
) -> Result<u64> {
    #[cfg(feature = "max_thread_priority")]
    raise_priority();

    let mut lines = 0;
    while !failed.load(Ordering::Relaxed) {
        let Some(index) = cursor.claim(plan) else {
            break;
        };
        let range = plan.range(index);
        match scanner(&plan.input()[range.clone()], range.start, bitmap) {
            Ok(count) => lines += count,
            Err(err) => {
                failed.store(true, Ordering::Relaxed);
                return Err(err);
            }
        }
    }
    Ok(lines)
}

/// Keeps the malformed record with the lowest offset.
///
/// Chunks are claimed in index order and a claimed chunk is always scanned to
/// its end or its first bad record, so every chunk before the failing one has
/// reported by the time all workers are joined.
fn earliest(current: Option<Error>, next: Error) -> Error {
    match (current, next) {
        (None, next) => next,
        (
            Some(current @ Error::Malformed { offset: a, .. }),
            next @ Error::Malformed { offset: b, .. },
        ) => {
            if b < a {
                next
            } else {
                current
            }
        }
        (Some(current), _) => current,
    }
}

#[cfg(feature = "max_thread_priority")]
fn raise_priority() {
    use thread_priority::{set_current_thread_priority, ThreadPriority};

    if let Err(err) = set_current_thread_priority(ThreadPriority::Max) {
        warn!(?err, "could not raise worker thread priority");
    }
}

/// Parses every record of `chunk` with `P` and inserts it into `bitmap`.
///
/// `chunk` must start at a record boundary. Empty records are skipped and the
/// last record may run to the end of the chunk without a delimiter.
pub fn scan_chunk<P: LineParser>(chunk: &[u8], bitmap: &PresenceBitmap) -> u64 {
    let mut pos = 0;
    let mut lines = 0;
    while pos < chunk.len() {
        let window = scan::read_window(&chunk[pos..]);
        let found = scan::delimiter_offset(window) as usize;
        let len = if found < WINDOW {
            found
        } else {
            // no delimiter in the first window: a long record or the unterminated tail
            let end = scan::next_delimiter(chunk, pos + WINDOW).unwrap_or(chunk.len());
            end - pos
        };

        if len > 0 {
            let value = if len < WINDOW {
                P::parse_window(window, len)
            } else {
                P::parse_line(&chunk[pos..pos + len])
            };
            bitmap.insert(value);
            lines += 1;
        }
        pos += len + 1;
    }
    lines
}

/// Like [`scan_chunk`] but validates every record, failing on the first
/// malformed one. `offset` is the chunk's position in the whole input.
pub fn scan_chunk_strict(chunk: &[u8], offset: usize, bitmap: &PresenceBitmap) -> Result<u64> {
    let mut pos = 0;
    let mut lines = 0;
    while pos < chunk.len() {
        let end = scan::next_delimiter(chunk, pos).unwrap_or(chunk.len());
        let line = &chunk[pos..end];
        let value = record::parse_checked(line)
            .map_err(|reason| Error::malformed(offset + pos, line, reason))?;
        bitmap.insert(value);
        lines += 1;
        pos = end + 1;
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Malformation;
    use rand::Rng;
    use std::collections::HashSet;
    use std::net::Ipv4Addr;

    fn config(threads: usize) -> EngineConfig {
        EngineConfig::default().with_threads(threads)
    }

    fn count(config: EngineConfig, input: &[u8]) -> Summary {
        Engine::new(config).unwrap().count(input).unwrap()
    }

    fn random_lines(lines: usize, pool: u32) -> (Vec<u8>, u64) {
        let mut rng = rand::thread_rng();
        let mut input = Vec::new();
        let mut seen = HashSet::new();
        for _ in 0..lines {
            // a small pool forces duplicates
            let addr = Ipv4Addr::from(rng.gen_range(0..pool).wrapping_mul(2_654_435_761));
            seen.insert(addr);
            input.extend_from_slice(addr.to_string().as_bytes());
            input.push(b'\n');
        }
        (input, seen.len() as u64)
    }

    #[test]
    fn counts_duplicates_once() {
        let summary = count(config(2), b"10.0.0.1\n10.0.0.1\n10.0.0.2\n");
        assert_eq!(summary.distinct, 2);
        assert_eq!(summary.lines, 3);
    }

    #[test]
    fn empty_input() {
        let summary = count(config(4), b"");
        assert_eq!(summary, Summary { distinct: 0, lines: 0, chunks: 0, threads: 0 });
    }

    #[test]
    fn unterminated_last_record_and_empty_lines() {
        let summary = count(config(1), b"1.2.3.4\n\n\n5.6.7.8\n9.9.9.9");
        assert_eq!(summary.distinct, 3);
        assert_eq!(summary.lines, 3);
    }

    #[test]
    fn thread_count_does_not_change_the_answer() {
        let (input, expected) = random_lines(20_000, 5_000);
        for threads in [1, 3, 8] {
            for max_chunk in [7, usize::MAX] {
                let summary = count(config(threads).with_max_chunk_size(max_chunk), &input);
                assert_eq!(summary.distinct, expected, "threads {threads}, chunk {max_chunk}");
                assert_eq!(summary.lines, 20_000);
            }
        }
    }

    #[test]
    fn parsers_agree() {
        let (input, expected) = random_lines(10_000, u32::MAX);
        for parser in [ParserKind::Scalar, ParserKind::Vector] {
            for strict in [false, true] {
                let summary = count(config(4).with_parser(parser).with_strict(strict), &input);
                assert_eq!(summary.distinct, expected, "{parser} strict={strict}");
            }
        }
    }

    #[test]
    fn threads_are_capped_by_chunks() {
        let summary = count(config(16), b"1.1.1.1\n");
        assert!(summary.threads <= summary.chunks);
        assert_eq!(summary.distinct, 1);
    }

    #[test]
    fn long_garbage_records_do_not_panic() {
        let input = b"1.2.3.4\n99999999999999999999999.1.1\n5.6.7.8\n";
        let summary = count(config(2), input);
        assert_eq!(summary.lines, 3);
        assert!(summary.distinct >= 2);
    }

    #[test]
    fn strict_mode_reports_offset() {
        let input = b"1.2.3.4\n5.6.7.8\n1.2.x.4\n";
        let err = Engine::new(config(1).with_strict(true)).unwrap().count(input).unwrap_err();
        match err {
            Error::Malformed { offset, line, reason } => {
                assert_eq!(offset, 16);
                assert_eq!(line, "1.2.x.4");
                assert_eq!(reason, Malformation::InvalidByte(b'x'));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn strict_mode_rejects_empty_records() {
        let engine = Engine::new(config(2).with_strict(true)).unwrap();
        let result = engine.count(b"1.2.3.4\n\n5.6.7.8\n");
        assert!(matches!(
            result,
            Err(Error::Malformed { offset: 8, reason: Malformation::EmptyField, .. })
        ));
    }

    #[test]
    fn strict_mode_reports_the_lowest_offset() {
        let mut input = Vec::new();
        let mut first_bad = None;
        for i in 0..5_000 {
            if i % 500 == 333 {
                first_bad.get_or_insert(input.len());
                input.extend_from_slice(b"1.2.3\n");
            } else {
                input.extend_from_slice(b"10.20.30.40\n");
            }
        }

        let engine = Engine::new(config(8).with_strict(true).with_max_chunk_size(256)).unwrap();
        for _ in 0..20 {
            match engine.count(&input) {
                Err(Error::Malformed { offset, .. }) => assert_eq!(Some(offset), first_bad),
                other => panic!("unexpected result {other:?}"),
            }
        }
    }

    #[test]
    fn earliest_prefers_lower_offset() {
        let at = |offset| Error::malformed(offset, b"x", Malformation::InvalidByte(b'x'));
        let offset_of = |err: Error| match err {
            Error::Malformed { offset, .. } => offset,
            other => panic!("unexpected error {other}"),
        };

        assert_eq!(offset_of(earliest(None, at(30))), 30);
        assert_eq!(offset_of(earliest(Some(at(30)), at(10))), 10);
        assert_eq!(offset_of(earliest(Some(at(10)), at(30))), 10);
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(matches!(Engine::new(config(0)), Err(Error::Config(_))));
    }

    #[test]
    fn scan_into_shared_bitmap() {
        let engine = Engine::new(config(2)).unwrap();
        let mut bitmap = PresenceBitmap::new();
        assert_eq!(engine.scan_into(b"1.1.1.1\n2.2.2.2\n", &bitmap).unwrap(), 2);
        assert_eq!(engine.scan_into(b"2.2.2.2\n3.3.3.3\n", &bitmap).unwrap(), 2);
        assert!(bitmap.contains(0x0303_0303));
        assert_eq!(bitmap.count(), 3);
    }
}
