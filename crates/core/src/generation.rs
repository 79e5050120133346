//! Stale-response guard for overlapping async reads.
//!
//! Every read that may be superseded (a license refresh racing a manual check,
//! a tenant lookup racing a navigation) takes a [`Generation`] ticket before it
//! suspends. When the result arrives, it is applied only if the ticket is still
//! the newest one issued.

use std::sync::atomic::{AtomicU64, Ordering};

/// Ticket identifying one in-flight read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Monotonic ticket dispenser.
#[derive(Debug, Default)]
pub struct GenerationGuard {
    current: AtomicU64,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new read. Any ticket issued earlier becomes stale.
    pub fn begin(&self) -> Generation {
        Generation(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `generation` is still the newest ticket.
    pub fn is_current(&self, generation: Generation) -> bool {
        self.current.load(Ordering::SeqCst) == generation.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_newer_ticket_supersedes_older() {
        let guard = GenerationGuard::new();
        let first = guard.begin();
        assert!(guard.is_current(first));

        let second = guard.begin();
        assert!(!guard.is_current(first));
        assert!(guard.is_current(second));
        assert!(second > first);
    }
}
