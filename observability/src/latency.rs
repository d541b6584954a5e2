use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Fixed-capacity ring of recent latency samples.
///
/// Writers claim a slot with one `fetch_add` on the cursor and store into it;
/// readers copy the filled prefix and sort the copy. Nothing ever blocks.
#[derive(Debug)]
pub struct LatencyReservoir {
    samples: Box<[AtomicU64]>,
    cursor: AtomicU64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LatencyPercentiles {
    pub samples: usize,
    pub p50_ms: Option<u64>,
    pub p95_ms: Option<u64>,
    pub p99_ms: Option<u64>
}

impl LatencyReservoir {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: (0..capacity).map(|_| AtomicU64::new(0)).collect(),
            cursor: AtomicU64::new(0)
        }
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn record(&self, latency_ms: u64) {
        let slot = self.cursor.fetch_add(1, Ordering::AcqRel) as usize % self.samples.len();
        self.samples[slot].store(latency_ms, Ordering::Release);
    }

    pub fn percentiles(&self) -> LatencyPercentiles {
        let filled = (self.cursor.load(Ordering::Acquire) as usize).min(self.samples.len());
        if filled == 0 {
            return LatencyPercentiles::default();
        }

        let mut sorted: Vec<u64> = self.samples[..filled]
            .iter()
            .map(|s| s.load(Ordering::Acquire))
            .collect();
        sorted.sort_unstable();

        LatencyPercentiles {
            samples: filled,
            p50_ms: nearest_rank(&sorted, 50.0),
            p95_ms: nearest_rank(&sorted, 95.0),
            p99_ms: nearest_rank(&sorted, 99.0)
        }
    }
}

/// Nearest-rank percentile over an ascending slice.
pub fn nearest_rank(sorted: &[u64], percentile: f64) -> Option<u64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((percentile / 100.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    Some(sorted[index])
}
