//! Cooperative cancellation.
//!
//! A [`HaltMonitor`] is cloned into whatever controls the run (a stop button
//! on another thread, a debugger) and into the running interpreter, which
//! polls it between statements.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Shared halt flag. Cloning shares the same flag.
#[derive(Debug, Clone, Default)]
pub struct HaltMonitor {
    halted: Arc<AtomicBool>,
}

impl HaltMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the running program stop at the next statement boundary.
    pub fn halt(&self) {
        self.halted.store(true, Ordering::SeqCst);
    }

    /// Clear a previous halt so the monitor can drive another run.
    pub fn resume(&self) {
        self.halted.store(false, Ordering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` in slices of at most `slice`, re-checking the
    /// flag between slices. Returns `false` if the sleep was cut short.
    pub fn sleep(&self, duration: Duration, slice: Duration) -> bool {
        let deadline = Instant::now() + duration;
        let slice = slice.max(Duration::from_millis(1));
        loop {
            if self.is_halted() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            thread::sleep(slice.min(deadline - now));
        }
    }
}
