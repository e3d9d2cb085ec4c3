//! Writes `num-floats` doubles 0.0, 0.5, 1.0, ... to stdout or `--output`, starting over
//! at 0.0 once the value exceeds 100000.

use std::{
    fs::File,
    io::{self, BufWriter, Write},
    num::NonZeroU64,
    path::PathBuf,
    process::ExitCode,
};

use clap::Parser;
use tracing::{error, info};
use vecsum_common::codec::{Endian, F64Writer};

const STEP: f64 = 0.5;
const WRAP_ABOVE: f64 = 100_000.0;

#[derive(clap::Parser)]
struct Args {
    num_floats: NonZeroU64,
    /// little, big or native. vecsum-bench reads native.
    #[clap(long, default_value = "native")]
    endian: Endian,
    #[clap(long)]
    output: Option<PathBuf>,
}

fn values(n: u64) -> impl Iterator<Item = f64> {
    let mut next = 0.0;
    (0..n).map(move |_| {
        if next > WRAP_ABOVE {
            next = 0.0;
        }
        let value = next;
        next += STEP;
        value
    })
}

fn write_floats<W: Write>(out: W, n: u64, endian: Endian) -> io::Result<u64> {
    let mut writer = F64Writer::new(BufWriter::new(out), endian);
    for value in values(n) {
        writer.write(value)?;
    }
    let written = writer.written();
    writer.finish()?;
    Ok(written)
}

fn main() -> ExitCode {
    // stdout may carry the data
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter({
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
        })
        .init();

    let args = Args::parse();
    let n = args.num_floats.get();
    let res = match &args.output {
        Some(path) => File::create(path).and_then(|f| write_floats(f, n, args.endian)),
        None => write_floats(io::stdout().lock(), n, args.endian),
    };
    match res {
        Ok(written) => {
            info!(written, endian = ?args.endian, output = ?args.output, "done");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("writing floats: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use vecsum_common::codec::decode_all;

    use super::*;

    #[test]
    fn half_steps_wrap_after_exceeding_limit() {
        let v: Vec<f64> = values(200_003).collect();
        assert_eq!(&v[..4], &[0.0, 0.5, 1.0, 1.5]);
        assert_eq!(v[200_000], 100_000.0);
        assert_eq!(v[200_001], 0.0);
        assert_eq!(v[200_002], 0.5);
    }

    #[test]
    fn writes_requested_byte_order() {
        for endian in [Endian::Little, Endian::Big, Endian::Native] {
            let mut out = Vec::new();
            assert_eq!(write_floats(&mut out, 10, endian).unwrap(), 10);
            assert_eq!(out.len(), 80);
            let back: Vec<f64> = decode_all(&out, endian).collect();
            assert_eq!(back, values(10).collect::<Vec<_>>());
        }
        let mut big = Vec::new();
        write_floats(&mut big, 2, Endian::Big).unwrap();
        assert_eq!(&big[8..], &0.5f64.to_be_bytes());
    }

    #[test]
    fn output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("floats.bin");
        write_floats(File::create(&path).unwrap(), 1024, Endian::Native).unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 8192);
    }
}
