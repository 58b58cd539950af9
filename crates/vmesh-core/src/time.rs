//! Wall-clock helpers
//!
//! Telemetry receipt times are compared across threads and against probe
//! times, so they are kept as unix milliseconds rather than `Instant`s.

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in unix milliseconds
pub fn unix_ms_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unix_ms_monotone_enough() {
        let a = unix_ms_now();
        let b = unix_ms_now();
        assert!(a > 1_600_000_000_000); // past 2020
        assert!(b >= a);
    }
}
