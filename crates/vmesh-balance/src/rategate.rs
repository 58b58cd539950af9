//! Log suppression for hot-path warnings

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use vmesh_core::time::unix_ms_now;

/// Allows one event per window. Used to keep per-request warnings (a dead
/// node in every candidate set) from flooding the log at request rate.
#[derive(Debug)]
pub(crate) struct RateGate {
    window_ms: i64,
    last_ms: AtomicI64,
}

impl RateGate {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window_ms: window.as_millis() as i64,
            last_ms: AtomicI64::new(0),
        }
    }

    /// Returns true at most once per window, racing callers excluded by the
    /// compare-exchange.
    pub(crate) fn allow(&self) -> bool {
        let now = unix_ms_now();
        let last = self.last_ms.load(Ordering::Relaxed);
        if now - last < self.window_ms {
            return false;
        }
        self.last_ms
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_opens_once_per_window() {
        let gate = RateGate::new(Duration::from_secs(60));
        assert!(gate.allow());
        assert!(!gate.allow());
        assert!(!gate.allow());
    }

    #[test]
    fn test_gate_reopens_after_window() {
        let gate = RateGate::new(Duration::from_millis(1));
        assert!(gate.allow());
        std::thread::sleep(Duration::from_millis(5));
        assert!(gate.allow());
    }
}
