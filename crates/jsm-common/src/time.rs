//! ---
//! jsm_section: "01-core-functionality"
//! jsm_subsection: "module"
//! jsm_type: "source"
//! jsm_scope: "code"
//! jsm_description: "Shared primitives and utilities for the translator runtime."
//! jsm_version: "v0.0.0-prealpha"
//! jsm_owner: "tbd"
//! ---
use std::time::{Duration, Instant};

/// Capture an instant suitable for elapsed-time comparisons.
pub fn monotonic_now() -> Instant {
    Instant::now()
}

/// Convert a duration into milliseconds, saturating at `u64::MAX`.
pub fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Milliseconds elapsed since construction. Never goes backwards.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn start() -> Self {
        Self {
            origin: monotonic_now(),
        }
    }

    pub fn elapsed_millis(&self) -> u64 {
        duration_to_millis(self.origin.elapsed())
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        let clock = MonotonicClock::start();
        let first = clock.elapsed_millis();
        std::thread::sleep(Duration::from_millis(2));
        let second = clock.elapsed_millis();
        assert!(second >= first);
        assert!(second >= 2);
    }

    #[test]
    fn millis_saturate() {
        assert_eq!(duration_to_millis(Duration::from_millis(1500)), 1500);
        assert_eq!(duration_to_millis(Duration::MAX), u64::MAX);
    }
}
