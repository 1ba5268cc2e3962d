use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Global counters for one rotation run.
///
/// Purpose:
/// - Track catalog traffic (requests, pages)
/// - Track degraded input (tombstones, failed reads)
/// - Track what actually landed at the remote
///
/// Design:
/// - Lock-free (Atomics)
/// - Cheap to update
/// - Safe in async + multithreaded contexts
#[derive(Default)]
pub struct RuntimeMetrics {
    // Catalog traffic
    pub requests_issued: AtomicUsize,
    pub pages_read: AtomicUsize,

    // Degraded input
    pub tombstones_dropped: AtomicUsize,
    pub read_failures: AtomicUsize,

    // Mutations
    pub chunks_applied: AtomicUsize,
    pub items_added: AtomicUsize,
    pub items_removed: AtomicUsize,
}

impl RuntimeMetrics {
    /// Single low-noise summary line.
    pub fn summary(&self) -> String {
        format!(
            "[METRICS] requests={} pages={} tombstones={} read_fail={} chunks={} added={} removed={}",
            self.requests_issued.load(Ordering::Relaxed),
            self.pages_read.load(Ordering::Relaxed),
            self.tombstones_dropped.load(Ordering::Relaxed),
            self.read_failures.load(Ordering::Relaxed),
            self.chunks_applied.load(Ordering::Relaxed),
            self.items_added.load(Ordering::Relaxed),
            self.items_removed.load(Ordering::Relaxed),
        )
    }
}

/// Global metrics registry (singleton)
pub static METRICS: Lazy<Arc<RuntimeMetrics>> =
    Lazy::new(|| Arc::new(RuntimeMetrics::default()));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reports_every_counter() {
        let m = RuntimeMetrics::default();
        m.pages_read.fetch_add(3, Ordering::Relaxed);
        m.items_added.fetch_add(237, Ordering::Relaxed);

        let line = m.summary();
        assert!(line.contains("pages=3"));
        assert!(line.contains("added=237"));
        assert!(line.contains("removed=0"));
    }
}
