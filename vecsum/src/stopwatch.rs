//! Wall-clock and thread CPU-time measurement around a pass or a whole run.
//!
//! Clock failures never abort a run: they are logged and the report falls back to
//! [`std::time::Instant`] for elapsed time and omits CPU time.

use std::time::{Duration, Instant};

use nix::{
    sys::resource::{getrusage, UsageWho},
    sys::time::TimeValLike,
    time::{clock_gettime, ClockId},
};
use serde_with::serde_as;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum MeasurementError {
    #[error("clock_gettime(CLOCK_MONOTONIC) failed: {0}")]
    MonotonicClock(#[source] nix::Error),
    #[error("getrusage(RUSAGE_THREAD) failed: {0}")]
    ThreadUsage(#[source] nix::Error),
}

pub struct Stopwatch {
    started: Instant,
    monotonic: Option<Duration>,
    cpu: Option<Duration>,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            monotonic: best_effort(read_monotonic()),
            cpu: best_effort(read_thread_cpu()),
        }
    }

    /// Stop the watch and account `bytes` to the measured interval.
    pub fn stop(self, bytes: u64) -> Measurement {
        let fallback = self.started.elapsed();
        let now_monotonic = best_effort(read_monotonic());
        let now_cpu = best_effort(read_thread_cpu());
        let (elapsed, degraded) = match (self.monotonic, now_monotonic) {
            (Some(start), Some(stop)) => (stop.saturating_sub(start), false),
            _ => (fallback, true),
        };
        let cpu_time = match (self.cpu, now_cpu) {
            (Some(start), Some(stop)) => Some(stop.saturating_sub(start)),
            _ => None,
        };
        Measurement::new(elapsed, cpu_time, bytes, degraded || cpu_time.is_none())
    }
}

fn best_effort(res: Result<Duration, MeasurementError>) -> Option<Duration> {
    match res {
        Ok(d) => Some(d),
        Err(e) => {
            warn!("measurement degraded: {e}");
            None
        }
    }
}

fn read_monotonic() -> Result<Duration, MeasurementError> {
    let ts = clock_gettime(ClockId::CLOCK_MONOTONIC).map_err(MeasurementError::MonotonicClock)?;
    Ok(Duration::from_nanos(ts.num_nanoseconds().max(0) as u64))
}

fn read_thread_cpu() -> Result<Duration, MeasurementError> {
    let usage = getrusage(UsageWho::RUSAGE_THREAD).map_err(MeasurementError::ThreadUsage)?;
    let micros = usage.user_time().num_microseconds() + usage.system_time().num_microseconds();
    Ok(Duration::from_micros(micros.max(0) as u64))
}

const MB: f64 = 1000.0 * 1000.0;
const GIB: f64 = (1u64 << 30) as f64;

/// Elapsed time, CPU time and bytes of one measured interval, plus the derived throughput.
#[serde_as]
#[derive(Debug, Clone, serde::Serialize)]
pub struct Measurement {
    #[serde_as(as = "serde_with::DurationMicroSeconds")]
    pub elapsed: Duration,
    #[serde_as(as = "Option<serde_with::DurationMicroSeconds>")]
    pub cpu_time: Option<Duration>,
    pub bytes: u64,
    pub throughput_mb_per_sec: f64,
    pub throughput_gib_per_sec: f64,
    /// Set if a clock could not be read and the numbers are best-effort.
    pub degraded: bool,
}

impl Measurement {
    pub fn new(elapsed: Duration, cpu_time: Option<Duration>, bytes: u64, degraded: bool) -> Self {
        let secs = elapsed.as_secs_f64();
        let per_sec = |unit: f64| {
            // a zero-length interval can't carry a rate
            if bytes == 0 || secs == 0.0 {
                0.0
            } else {
                (bytes as f64 / unit) / secs
            }
        };
        Self {
            elapsed,
            cpu_time,
            bytes,
            throughput_mb_per_sec: per_sec(MB),
            throughput_gib_per_sec: per_sec(GIB),
            degraded,
        }
    }
}

impl std::fmt::Display for Measurement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "took {:.4} seconds to read {} bytes, for {:.4} GB/s ({:.2} MB/s)",
            self.elapsed.as_secs_f64(),
            self.bytes,
            self.throughput_gib_per_sec,
            self.throughput_mb_per_sec,
        )?;
        if let Some(cpu) = self.cpu_time {
            write!(f, " cpu={:.4}s", cpu.as_secs_f64())?;
        }
        if self.degraded {
            write!(f, " (degraded)")?;
        }
        Ok(())
    }
}
