use std::{
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    process::ExitCode,
    time::{Duration, Instant},
};

use clap::{builder::BoolishValueParser, Parser};
use itertools::Itertools;
use serde_with::serde_as;
use tracing::{error, info};
use vecsum::{
    backend::LocalFs,
    config::{assert_no_unknown_env_vars, DEFAULT_CHUNK_SIZE},
    metrics, Config, Driver, RunReport, Strategy, SumMode,
};

/// Read a file of doubles `passes` times through one data-access strategy and sum it.
#[derive(serde::Serialize, clap::Parser, Clone)]
struct Args {
    /// File of native-endian doubles, a whole number of chunks long.
    #[clap(env = "VECSUM_PATH")]
    path: PathBuf,
    #[clap(long, env = "VECSUM_PASSES", default_value = "1")]
    passes: NonZeroU32,
    /// buffered, zero-copy or local-memory
    #[clap(long, env = "VECSUM_STRATEGY", default_value = "buffered")]
    strategy: Strategy,
    /// Read only, don't sum. The env var also takes 0 and 1.
    #[clap(long, env = "VECSUM_SKIP_SUM", value_parser = BoolishValueParser::new())]
    skip_sum: bool,
    /// Bytes per chunk. Must be a multiple of 64.
    #[clap(long, env = "VECSUM_CHUNK_SIZE", default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: NonZeroUsize,
    /// simd or simple
    #[clap(long, env = "VECSUM_SUM_MODE", default_value = "simd")]
    sum_mode: SumMode,
    /// mlock the in-memory copy of the file for the local-memory strategy
    #[clap(
        long,
        env = "VECSUM_LOCK_MEMORY",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_parser = BoolishValueParser::new()
    )]
    lock_memory: bool,
    #[clap(long, default_value = "benchmark.output.json")]
    output: PathBuf,
}

impl Args {
    fn config(&self) -> Config {
        let mut config = Config::new(&self.path, self.passes, self.strategy);
        config.skip_reduction = self.skip_sum;
        config.chunk_size = self.chunk_size;
        config.sum_mode = self.sum_mode;
        config.lock_memory = self.lock_memory;
        config
    }
}

#[serde_as]
#[derive(serde::Serialize)]
struct BenchmarkOutput<'a> {
    args: &'a Args,
    run: &'a RunReport,
    /// Includes opening the file and, for local-memory, loading it.
    #[serde_as(as = "serde_with::DurationMicroSeconds")]
    wall_time_us: Duration,
    metrics: metrics::Metrics,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_file(true)
        .with_line_number(true)
        .with_env_filter({
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
        })
        .init();

    if let Err(e) = assert_no_unknown_env_vars() {
        error!("{e}");
        return ExitCode::FAILURE;
    }
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let start = Instant::now();
    let backend = LocalFs::new();
    let mut driver = Driver::new(args.config(), &backend);
    let report = driver.run_with(|pass| {
        println!(
            "pass {}: sum = {} in {}",
            pass.pass,
            pass.sum,
            humantime::format_duration(pass.measurement.elapsed)
        );
    })?;
    let wall_time = start.elapsed();

    println!("{} {}", report.strategy, report.measurement);
    println!(
        "total sum = {}, {} chunks of {} bytes, wall time {}",
        report.total_sum,
        report.chunks_read,
        args.chunk_size,
        humantime::format_duration(wall_time)
    );
    println!(
        "pass sums: {}",
        report.passes.iter().map(|p| p.sum).join(" ")
    );
    info!("chunk latency (us): {}", report.chunk_latency);

    let output = BenchmarkOutput {
        args,
        run: &report,
        wall_time_us: wall_time,
        metrics: metrics::global(),
    };
    info!("writing results to {:?}", args.output);
    std::fs::write(&args.output, serde_json::to_string(&output)?)?;
    Ok(())
}
