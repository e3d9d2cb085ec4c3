pub(crate) mod mock_backend;

use std::io::Write;

use vecsum_common::codec::{encode_all, Endian};

/// `n` doubles 0.0, 0.5, 1.0, ... encoded in native byte order.
pub(crate) fn half_steps(n: usize) -> Vec<u8> {
    let values: Vec<f64> = (0..n).map(|i| i as f64 * 0.5).collect();
    encode_all(&values, Endian::Native)
}

/// Exact sum of [`half_steps`]`(n)`.
pub(crate) fn half_steps_sum(n: usize) -> f64 {
    let n = n as f64;
    0.5 * n * (n - 1.0) / 2.0
}

/// Route `debug!` output through the test harness so failing tests show the state transitions.
pub(crate) fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub(crate) fn temp_file_with(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(bytes).unwrap();
    f.flush().unwrap();
    f
}
