//! Command-line front end.
//!
//! ```bash
//! ipv4-distinct count ips.txt
//! ipv4-distinct count ips.txt --threads 8 --parser scalar --strict
//! ipv4-distinct generate 1000000 ips.txt --seed 42
//! ```

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use ipv4_distinct::config::DEFAULT_MAX_CHUNK_SIZE;
use ipv4_distinct::{sample, Engine, EngineConfig, ParserKind};

#[derive(Parser)]
#[command(name = "ipv4-distinct")]
#[command(version, about = "Count distinct IPv4 addresses in a newline-delimited file")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count the distinct addresses in a file
    Count {
        /// File with one dotted-quad address per line
        file: PathBuf,

        /// Worker threads (default: number of CPUs)
        #[arg(short, long, env = "IPV4_DISTINCT_THREADS")]
        threads: Option<usize>,

        /// Upper bound on the bytes handed to a worker at once
        #[arg(
            short,
            long,
            env = "IPV4_DISTINCT_CHUNK_SIZE",
            default_value_t = DEFAULT_MAX_CHUNK_SIZE
        )]
        chunk_size: usize,

        /// Record parser: scalar or vector
        #[arg(short, long, default_value_t = ParserKind::Vector)]
        parser: ParserKind,

        /// Fail on the first malformed record instead of counting it
        #[arg(long)]
        strict: bool,
    },

    /// Write random addresses to a file
    Generate {
        /// Number of lines to write
        count: u64,

        /// Output file
        output: PathBuf,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn count(
    file: PathBuf,
    threads: Option<usize>,
    chunk_size: usize,
    parser: ParserKind,
    strict: bool,
) -> Result<()> {
    let mut config = EngineConfig::default()
        .with_max_chunk_size(chunk_size)
        .with_parser(parser)
        .with_strict(strict);
    if let Some(threads) = threads {
        config = config.with_threads(threads);
    }

    let engine = Engine::new(config)?;
    let summary = engine
        .count_file(&file)
        .with_context(|| format!("failed to count {}", file.display()))?;

    println!("Number of unique IP addresses: {}", summary.distinct);
    Ok(())
}

fn generate(count: u64, output: PathBuf, seed: Option<u64>) -> Result<()> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let file = File::create(&output)
        .with_context(|| format!("failed to create {}", output.display()))?;
    sample::write_sample(file, count, &mut rng)
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!(count, output = %output.display(), "sample written");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ipv4_distinct=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Count {
            file,
            threads,
            chunk_size,
            parser,
            strict,
        } => count(file, threads, chunk_size, parser, strict),
        Commands::Generate { count, output, seed } => generate(count, output, seed),
    }
}
