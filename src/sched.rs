//! Cooperative debounce timers for persistence.
//!
//! All timers here are plain `Instant` deadlines owned by an explicit
//! scheduler value and checked from the session's tick loop — no ambient
//! process-wide timer state, nothing to leak on shutdown beyond calling
//! [`PersistScheduler::cancel_pending`].

use std::time::{Duration, Instant};

/// Quiet period after the last mutation before a save fires.
pub const SAVE_DEBOUNCE: Duration = Duration::from_secs(1);

/// Quiet period after the last mutation before the archive sweep runs.
pub const ARCHIVE_DEBOUNCE: Duration = Duration::from_secs(5);

/// A one-shot cooperative timer. Re-arming replaces any pending deadline,
/// which is what collapses a burst of triggers into a single firing.
#[derive(Debug)]
pub struct Debounce {
    delay: Duration,
    due: Option<Instant>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Debounce { delay, due: None }
    }

    /// Arm (or re-arm) the timer relative to `now`.
    pub fn trigger(&mut self, now: Instant) {
        self.due = Some(now + self.delay);
    }

    /// Drop any pending deadline without firing.
    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn pending(&self) -> bool {
        self.due.is_some()
    }

    /// True exactly once when the deadline has passed; firing clears it.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

/// The two mutation-triggered timers: debounced save and the slower
/// archive sweep. Both re-arm on every mutation.
#[derive(Debug)]
pub struct PersistScheduler {
    pub save: Debounce,
    pub archive: Debounce,
}

impl PersistScheduler {
    pub fn new() -> Self {
        PersistScheduler {
            save: Debounce::new(SAVE_DEBOUNCE),
            archive: Debounce::new(ARCHIVE_DEBOUNCE),
        }
    }

    /// Record a mutation: both timers restart their quiet period.
    pub fn mark_mutated(&mut self, now: Instant) {
        self.save.trigger(now);
        self.archive.trigger(now);
    }

    /// Clear everything pending. Called on shutdown after the final flush.
    pub fn cancel_pending(&mut self) {
        self.save.cancel();
        self.archive.cancel();
    }
}

impl Default for PersistScheduler {
    fn default() -> Self {
        PersistScheduler::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn does_not_fire_before_the_deadline() {
        let base = Instant::now();
        let mut d = Debounce::new(Duration::from_secs(1));
        d.trigger(base);
        assert!(!d.fire(base));
        assert!(!d.fire(base + Duration::from_millis(999)));
        assert!(d.pending());
    }

    #[test]
    fn fires_once_then_clears() {
        let base = Instant::now();
        let mut d = Debounce::new(Duration::from_secs(1));
        d.trigger(base);
        assert!(d.fire(base + Duration::from_secs(1)));
        assert!(!d.fire(base + Duration::from_secs(2)));
        assert!(!d.pending());
    }

    #[test]
    fn retrigger_replaces_the_deadline() {
        let base = Instant::now();
        let mut d = Debounce::new(Duration::from_secs(1));
        d.trigger(base);
        d.trigger(base + Duration::from_millis(800));
        // The original deadline has passed, but the re-arm moved it.
        assert!(!d.fire(base + Duration::from_millis(1100)));
        assert!(d.fire(base + Duration::from_millis(1800)));
    }

    #[test]
    fn cancel_drops_pending_deadline() {
        let base = Instant::now();
        let mut d = Debounce::new(Duration::from_secs(1));
        d.trigger(base);
        d.cancel();
        assert!(!d.fire(base + Duration::from_secs(5)));
    }

    #[test]
    fn mutation_arms_both_timers() {
        let base = Instant::now();
        let mut sched = PersistScheduler::new();
        sched.mark_mutated(base);
        assert!(sched.save.fire(base + SAVE_DEBOUNCE));
        // The archive sweep has its own, longer window.
        assert!(!sched.archive.fire(base + SAVE_DEBOUNCE));
        assert!(sched.archive.fire(base + ARCHIVE_DEBOUNCE));
    }
}
