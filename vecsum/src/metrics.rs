use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide counters, see [`global`].
#[non_exhaustive]
#[derive(Debug, Clone, serde::Serialize)]
pub struct Metrics {
    pub passes_completed: u64,
    pub chunks_read: u64,
    pub bytes_read: u64,
    pub zero_copy_buffers_acquired: u64,
    pub zero_copy_buffers_released: u64,
}

pub(crate) struct MetricsStorage {
    pub(crate) passes_completed: AtomicU64,
    pub(crate) chunks_read: AtomicU64,
    pub(crate) bytes_read: AtomicU64,
    pub(crate) zero_copy_buffers_acquired: AtomicU64,
    pub(crate) zero_copy_buffers_released: AtomicU64,
}

impl MetricsStorage {
    pub(crate) const fn new_const() -> Self {
        MetricsStorage {
            passes_completed: AtomicU64::new(0),
            chunks_read: AtomicU64::new(0),
            bytes_read: AtomicU64::new(0),
            zero_copy_buffers_acquired: AtomicU64::new(0),
            zero_copy_buffers_released: AtomicU64::new(0),
        }
    }

    pub(crate) fn inc(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn make_pub(&self) -> Metrics {
        Metrics {
            passes_completed: self.passes_completed.load(Ordering::Relaxed),
            chunks_read: self.chunks_read.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            zero_copy_buffers_acquired: self.zero_copy_buffers_acquired.load(Ordering::Relaxed),
            zero_copy_buffers_released: self.zero_copy_buffers_released.load(Ordering::Relaxed),
        }
    }
}

pub(crate) static GLOBAL_STORAGE: MetricsStorage = MetricsStorage::new_const();

pub fn global() -> Metrics {
    GLOBAL_STORAGE.make_pub()
}
