//! Random input generation for tests, benches and the `generate` command.

use std::io::{self, BufWriter, Write};
use std::net::Ipv4Addr;

use rand::Rng;

/// Endless stream of uniformly random addresses.
pub fn addresses<R: Rng>(rng: &mut R) -> impl Iterator<Item = Ipv4Addr> + '_ {
    std::iter::repeat_with(move || Ipv4Addr::from(rng.gen::<u32>()))
}

/// Writes `count` random dotted-quad records, one per line.
pub fn write_sample<W: Write, R: Rng>(out: W, count: u64, rng: &mut R) -> io::Result<()> {
    let mut out = BufWriter::with_capacity(1 << 20, out);
    for addr in addresses(rng).take(count as usize) {
        writeln!(out, "{addr}")?;
    }
    out.flush()
}

/// In-memory sample, convenient for tests and benches.
pub fn sample_bytes<R: Rng>(count: u64, rng: &mut R) -> Vec<u8> {
    let mut buf = Vec::with_capacity(count as usize * 16);
    for addr in addresses(rng).take(count as usize) {
        buf.extend_from_slice(addr.to_string().as_bytes());
        buf.push(b'\n');
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn every_line_is_an_address() {
        let bytes = sample_bytes(1000, &mut rand::thread_rng());
        let text = std::str::from_utf8(&bytes).unwrap();
        assert_eq!(text.lines().count(), 1000);
        assert!(text.ends_with('\n'));
        for line in text.lines() {
            line.parse::<Ipv4Addr>().unwrap();
        }
    }

    #[test]
    fn seeded_output_is_reproducible() {
        let a = sample_bytes(100, &mut StdRng::seed_from_u64(7));
        let b = sample_bytes(100, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn written_and_in_memory_samples_match() {
        let mut written = Vec::new();
        write_sample(&mut written, 500, &mut StdRng::seed_from_u64(11)).unwrap();
        let in_memory = sample_bytes(500, &mut StdRng::seed_from_u64(11));
        assert_eq!(written, in_memory);
    }

    #[test]
    fn zero_count_is_empty() {
        assert!(sample_bytes(0, &mut rand::thread_rng()).is_empty());
        let mut written = Vec::new();
        write_sample(&mut written, 0, &mut rand::thread_rng()).unwrap();
        assert!(written.is_empty());
    }
}
