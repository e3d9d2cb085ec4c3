//! The vector sum applied to every chunk.
//!
//! [`simd_sum`] keeps four independent 2-wide accumulators. Each loop iteration loads the
//! 8 doubles of one group as four 2-wide lanes (offsets 0, 2, 4, 6) and adds lane `k` into
//! accumulator `k`, so consecutive additions don't wait on each other. The accumulators
//! are folded together once at the end and the last 2-wide lane is reduced to a scalar.
//!
//! The addition order differs from [`simple_sum`], so the two can differ in the last bits.
//! For a given chunk size and input the result is deterministic.
//!
//! Values are read in native byte order with unaligned loads.

use std::str::FromStr;

use vecsum_common::codec::F64_SIZE;

pub const ELEMENT_SIZE: usize = F64_SIZE;
pub const DOUBLES_PER_LOOP_ITER: usize = 8;
const BYTES_PER_LOOP_ITER: usize = DOUBLES_PER_LOOP_ITER * ELEMENT_SIZE;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SumMode {
    #[default]
    Simd,
    /// Left-to-right scalar sum, as a correctness baseline.
    Simple,
}

impl FromStr for SumMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simd" => Ok(SumMode::Simd),
            "simple" => Ok(SumMode::Simple),
            x => Err(format!("invalid sum mode: {x:?}, expected simd or simple")),
        }
    }
}

impl std::fmt::Display for SumMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SumMode::Simd => "simd",
            SumMode::Simple => "simple",
        })
    }
}

/// Reduces chunks according to the configured [`SumMode`].
///
/// With `skip_reduction` set, [`VectorSummer::sum`] returns `0.0` without looking at the
/// buffer, which leaves only the I/O cost in the measurement.
#[derive(Clone, Copy, Debug)]
pub struct VectorSummer {
    mode: SumMode,
    skip_reduction: bool,
}

impl VectorSummer {
    pub fn new(mode: SumMode, skip_reduction: bool) -> Self {
        Self {
            mode,
            skip_reduction,
        }
    }

    pub fn sum(&self, bytes: &[u8]) -> f64 {
        if self.skip_reduction {
            return 0.0;
        }
        match self.mode {
            SumMode::Simd => simd_sum(bytes),
            SumMode::Simple => simple_sum(bytes),
        }
    }

    pub fn skips_reduction(&self) -> bool {
        self.skip_reduction
    }
}

pub fn simple_sum(bytes: &[u8]) -> f64 {
    let mut sum = 0.0;
    for value in bytes.chunks_exact(ELEMENT_SIZE).map(read_f64) {
        sum += value;
    }
    sum
}

pub fn simd_sum(bytes: &[u8]) -> f64 {
    debug_assert_eq!(bytes.len() % BYTES_PER_LOOP_ITER, 0);
    let whole = bytes.len() - bytes.len() % BYTES_PER_LOOP_ITER;
    let (groups, rest) = bytes.split_at(whole);

    #[cfg(target_arch = "x86_64")]
    // SAFETY: SSE2 is part of the x86_64 baseline.
    let sum = unsafe { sse2::sum(groups) };
    #[cfg(not(target_arch = "x86_64"))]
    let sum = portable::sum(groups);

    if rest.is_empty() {
        sum
    } else {
        sum + simple_sum(rest)
    }
}

/// Sum a slice of doubles with [`simd_sum`].
pub fn simd_sum_f64(values: &[f64]) -> f64 {
    // SAFETY: any initialized `f64` is 8 initialized bytes; `u8` has no alignment requirement.
    let bytes = unsafe {
        std::slice::from_raw_parts(values.as_ptr() as *const u8, std::mem::size_of_val(values))
    };
    simd_sum(bytes)
}

#[inline(always)]
fn read_f64(bytes: &[u8]) -> f64 {
    let mut raw = [0u8; ELEMENT_SIZE];
    raw.copy_from_slice(&bytes[..ELEMENT_SIZE]);
    f64::from_ne_bytes(raw)
}

#[cfg(target_arch = "x86_64")]
mod sse2 {
    use std::arch::x86_64::*;

    use super::BYTES_PER_LOOP_ITER;

    /// `groups.len()` must be a multiple of [`BYTES_PER_LOOP_ITER`].
    #[target_feature(enable = "sse2")]
    pub(super) unsafe fn sum(groups: &[u8]) -> f64 {
        let mut sum0 = _mm_setzero_pd();
        let mut sum1 = _mm_setzero_pd();
        let mut sum2 = _mm_setzero_pd();
        let mut sum3 = _mm_setzero_pd();
        for group in groups.chunks_exact(BYTES_PER_LOOP_ITER) {
            let base = group.as_ptr() as *const f64;
            let x0 = _mm_loadu_pd(base);
            let x1 = _mm_loadu_pd(base.add(2));
            let x2 = _mm_loadu_pd(base.add(4));
            let x3 = _mm_loadu_pd(base.add(6));
            sum0 = _mm_add_pd(sum0, x0);
            sum1 = _mm_add_pd(sum1, x1);
            sum2 = _mm_add_pd(sum2, x2);
            sum3 = _mm_add_pd(sum3, x3);
        }
        let mut x0 = _mm_setzero_pd();
        x0 = _mm_add_pd(x0, sum0);
        x0 = _mm_add_pd(x0, sum1);
        x0 = _mm_add_pd(x0, sum2);
        x0 = _mm_add_pd(x0, sum3);
        let mut hi = 0.0;
        let mut lo = 0.0;
        _mm_storeh_pd(&mut hi, x0);
        _mm_storel_pd(&mut lo, x0);
        hi + lo
    }
}

/// Same lanes and addition order as the SSE2 version, spelled with `[f64; 2]`.
#[cfg_attr(target_arch = "x86_64", allow(dead_code))]
mod portable {
    use super::{read_f64, BYTES_PER_LOOP_ITER, ELEMENT_SIZE};

    type Lane = [f64; 2];

    #[inline(always)]
    fn add(a: Lane, b: Lane) -> Lane {
        [a[0] + b[0], a[1] + b[1]]
    }

    #[inline(always)]
    fn load(bytes: &[u8], idx: usize) -> Lane {
        let at = idx * ELEMENT_SIZE;
        [read_f64(&bytes[at..]), read_f64(&bytes[at + ELEMENT_SIZE..])]
    }

    pub(crate) fn sum(groups: &[u8]) -> f64 {
        let mut acc: [Lane; 4] = [[0.0; 2]; 4];
        for group in groups.chunks_exact(BYTES_PER_LOOP_ITER) {
            for (k, lane) in acc.iter_mut().enumerate() {
                *lane = add(*lane, load(group, 2 * k));
            }
        }
        let mut x0: Lane = [0.0; 2];
        for lane in acc {
            x0 = add(x0, lane);
        }
        x0[1] + x0[0]
    }
}
