//! What a run reports: one [`PassReport`] per pass and a [`RunReport`] at the end.

use std::{collections::BTreeMap, time::Duration};

use hdrhistogram::Histogram;

use crate::{Measurement, Strategy};

pub const LATENCY_PERCENTILES: [f64; 5] = [50.0, 90.0, 99.0, 99.9, 99.99];

#[derive(Debug, Clone, serde::Serialize)]
pub struct PassReport {
    pub pass: u32,
    pub sum: f64,
    pub chunks: u64,
    pub measurement: Measurement,
}

impl std::fmt::Display for PassReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "pass {}: sum = {} ({} chunks, {})",
            self.pass, self.sum, self.chunks, self.measurement
        )
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RunReport {
    pub strategy: Strategy,
    pub passes: Vec<PassReport>,
    /// Sum of all pass sums.
    pub total_sum: f64,
    pub chunks_read: u64,
    /// Bytes read over total run wall time.
    pub measurement: Measurement,
    pub chunk_latency: LatencySummary,
}

impl RunReport {
    pub fn bytes_read(&self) -> u64 {
        self.measurement.bytes
    }
}

/// Time to read and reduce one chunk, in microseconds.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LatencySummary {
    pub min_us: f64,
    pub mean_us: f64,
    pub max_us: f64,
    #[serde(serialize_with = "latency_percentiles_serialize")]
    pub percentiles_us: [f64; LATENCY_PERCENTILES.len()],
}

fn latency_percentiles_serialize<S>(
    values: &[f64; LATENCY_PERCENTILES.len()],
    serializer: S,
) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serde::Serialize::serialize(
        &LATENCY_PERCENTILES
            .iter()
            .map(|p| format!("p{p}"))
            .zip(values.iter().cloned())
            .collect::<BTreeMap<_, _>>(),
        serializer,
    )
}

pub(crate) fn make_latency_histogram() -> Histogram<u64> {
    // 1ns to 1h at 3 significant figures
    Histogram::new_with_bounds(1, 3_600_000_000_000, 3).expect("bounds are valid")
}

pub(crate) fn record_latency(histo: &mut Histogram<u64>, latency: Duration) {
    histo.saturating_record(u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX));
}

impl LatencySummary {
    pub(crate) fn from_histogram(histo: &Histogram<u64>) -> Self {
        if histo.is_empty() {
            return Self::default();
        }
        let us = |ns: u64| ns as f64 / 1000.0;
        let mut percentiles_us = [0.0; LATENCY_PERCENTILES.len()];
        for (value, p) in percentiles_us.iter_mut().zip(LATENCY_PERCENTILES) {
            *value = us(histo.value_at_percentile(p));
        }
        Self {
            min_us: us(histo.min()),
            mean_us: histo.mean() / 1000.0,
            max_us: us(histo.max()),
            percentiles_us,
        }
    }
}

impl std::fmt::Display for LatencySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "min={:.0} mean={:.0} max={:.0}",
            self.min_us, self.mean_us, self.max_us
        )?;
        for (v, p) in self.percentiles_us.iter().zip(LATENCY_PERCENTILES) {
            write!(f, " p{p}={v:.0}")?;
        }
        Ok(())
    }
}
