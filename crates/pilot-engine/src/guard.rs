//! Re-entrancy guard for externally triggered passes.

use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Non-blocking single-entry latch, one per pass kind.
///
/// The trigger source fires on a fixed cadence regardless of how long a
/// pass takes. If a pass of the same kind is still running, the new trigger
/// must be a no-op: overlapping passes would double-place orders or
/// double-close trades. This is intentional backpressure, not queueing:
/// `try_acquire` never blocks and never retries.
#[derive(Debug)]
pub struct PassGuard {
    name: &'static str,
    running: AtomicBool,
}

impl PassGuard {
    /// Create a released guard. `name` appears in skip logs.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            running: AtomicBool::new(false),
        }
    }

    /// Try to enter the pass. Returns None if one is already running.
    ///
    /// The returned permit releases the guard on drop, including on panic
    /// and early return.
    #[must_use]
    pub fn try_acquire(&self) -> Option<PassPermit<'_>> {
        if self.running.swap(true, Ordering::AcqRel) {
            debug!(pass = self.name, "Pass already running, trigger dropped");
            return None;
        }
        Some(PassPermit { guard: self })
    }

    /// Whether a pass is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// RAII handle for a running pass.
#[derive(Debug)]
pub struct PassPermit<'a> {
    guard: &'a PassGuard,
}

impl Drop for PassPermit<'_> {
    fn drop(&mut self) {
        self.guard.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_noop() {
        let guard = PassGuard::new("monitor");
        let permit = guard.try_acquire();
        assert!(permit.is_some());
        assert!(guard.try_acquire().is_none());
        drop(permit);
        assert!(guard.try_acquire().is_some());
    }

    #[test]
    fn test_permit_releases_on_drop() {
        let guard = PassGuard::new("analysis");
        {
            let _permit = guard.try_acquire().unwrap();
            assert!(guard.is_running());
        }
        assert!(!guard.is_running());
    }

    #[test]
    fn test_independent_guards_do_not_interfere() {
        let analysis = PassGuard::new("analysis");
        let monitor = PassGuard::new("monitor");

        let _a = analysis.try_acquire().unwrap();
        // A running analysis pass must never block the monitor cadence.
        assert!(monitor.try_acquire().is_some());
    }

    #[test]
    fn test_only_one_thread_wins() {
        use std::sync::{Arc, Barrier};

        let guard = Arc::new(PassGuard::new("monitor"));
        let start = Arc::new(Barrier::new(8));
        let done = Arc::new(Barrier::new(8));
        let acquired = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let start = Arc::clone(&start);
                let done = Arc::clone(&done);
                let acquired = Arc::clone(&acquired);
                std::thread::spawn(move || {
                    start.wait();
                    let permit = guard.try_acquire();
                    if permit.is_some() {
                        acquired.fetch_add(1, Ordering::SeqCst);
                    }
                    // Hold every outcome until all threads have attempted.
                    done.wait();
                    drop(permit);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(acquired.load(Ordering::SeqCst), 1);
    }
}
