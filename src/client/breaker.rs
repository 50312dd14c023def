use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use tracing::{info, warn};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;

/// Stops outgoing calls after `threshold` consecutive failures.
///
/// Once halted it stays halted until [`CircuitBreaker::reset`] is called by
/// the user; it never reopens on a timer.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    failures: AtomicU32,
    halted: AtomicBool,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD)
    }
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            failures: AtomicU32::new(0),
            halted: AtomicBool::new(false),
        }
    }

    pub fn record_success(&self) {
        self.failures.store(0, Ordering::SeqCst);
        if self.halted.swap(false, Ordering::SeqCst) {
            info!("Portal API calls resumed");
        }
    }

    pub fn record_failure(&self) {
        let failures = self.failures.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        if failures >= self.threshold && !self.halted.swap(true, Ordering::SeqCst) {
            warn!(failures, "Portal API halted after consecutive failures");
        }
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.failures.store(0, Ordering::SeqCst);
        if self.halted.swap(false, Ordering::SeqCst) {
            info!("Portal API breaker reset");
        }
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures.load(Ordering::SeqCst)
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn halts_at_threshold() {
        let breaker = CircuitBreaker::default();
        for _ in 0..4 {
            breaker.record_failure();
        }
        assert!(!breaker.is_halted());
        breaker.record_failure();
        assert!(breaker.is_halted());
        assert_eq!(breaker.consecutive_failures(), 5);
    }

    #[test]
    fn success_clears_the_streak() {
        let breaker = CircuitBreaker::new(3);
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert!(!breaker.is_halted());
        assert_eq!(breaker.consecutive_failures(), 2);
    }

    #[test]
    fn reset_resumes() {
        let breaker = CircuitBreaker::new(1);
        breaker.record_failure();
        assert!(breaker.is_halted());
        breaker.reset();
        assert!(!breaker.is_halted());
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[test]
    fn zero_threshold_is_clamped() {
        let breaker = CircuitBreaker::new(0);
        assert_eq!(breaker.threshold(), 1);
        assert!(!breaker.is_halted());
    }

    #[test]
    fn failures_from_many_threads_are_counted() {
        let breaker = Arc::new(CircuitBreaker::new(40));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let breaker = breaker.clone();
                thread::spawn(move || {
                    for _ in 0..10 {
                        breaker.record_failure();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(breaker.consecutive_failures(), 40);
        assert!(breaker.is_halted());
    }
}
