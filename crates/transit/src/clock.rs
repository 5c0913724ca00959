//! Injectable clock, so liveness/handshake timing is testable without sleeping.
//!
//! Same trait-seam pattern used throughout this crate: the production path
//! uses real wall-clock time, tests substitute a deterministic source.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now", in milliseconds. PING/PONG skew math is defined
/// entirely in terms of these millisecond timestamps.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Real wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before UNIX_EPOCH")
            .as_millis() as i64
    }
}

/// A clock whose value is set explicitly, for deterministic tests of the
/// PING/PONG round-trip and clock-skew arithmetic.
#[derive(Debug, Default)]
pub struct TestClock {
    now: AtomicI64,
}

impl TestClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    pub fn set(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for TestClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
