use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Advisory "operation running" flag. Counts overlapping calls so the flag
/// stays raised until the last one finishes.
#[derive(Debug, Default)]
pub struct InFlight {
    count: AtomicUsize,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag until the returned guard is dropped.
    pub fn start(&self) -> InFlightGuard<'_> {
        self.count.fetch_add(1, Ordering::SeqCst);
        InFlightGuard { flag: self }
    }

    pub fn is_active(&self) -> bool {
        self.count.load(Ordering::SeqCst) > 0
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

pub struct InFlightGuard<'a> {
    flag: &'a InFlight,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared cancellation flag. Results are only committed while it is live.
#[derive(Debug, Clone, Default)]
pub struct RequestToken {
    cancelled: Arc<AtomicBool>,
}

impl RequestToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
