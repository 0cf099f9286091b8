//! Scan configuration (§5 "Concurrency & resource model").

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

/// Tunables for a single scan run.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Root directory all carved children and info records are written
    /// under, and against which input paths are resolved.
    pub unpack_root: PathBuf,
    /// Number of worker threads draining the scan queue.
    pub worker_count: usize,
    /// How long a worker blocks on an empty queue before concluding the scan
    /// is finished (§5 "Termination").
    pub queue_timeout: Duration,
}

impl ScanConfig {
    pub fn new(unpack_root: impl Into<PathBuf>) -> Self {
        Self {
            unpack_root: unpack_root.into(),
            ..Self::default_tuning()
        }
    }

    fn default_tuning() -> Self {
        let worker_count = std::thread::available_parallelism()
            .unwrap_or(NonZeroUsize::new(1).expect("1 is nonzero"))
            .get();
        Self {
            unpack_root: PathBuf::new(),
            worker_count,
            // Matches the source this engine is descended from's job timeout.
            queue_timeout: Duration::from_secs(86_400),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::default_tuning()
    }
}
