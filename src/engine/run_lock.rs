// src/engine/run_lock.rs

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

/// Coalescing guard for re-runs of one watch target.
///
/// States:
/// - idle: no run in flight.
/// - running: a run is in flight, nothing queued.
/// - running with pending: a run is in flight and exactly one follow-up is
///   owed. Further triggers are absorbed.
///
/// Transitions never block and never await, so the dispatcher can call them
/// straight from its event loop.
#[derive(Debug, Default)]
pub struct RunLock {
    state: Mutex<LockState>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
enum LockState {
    #[default]
    Idle,
    Running {
        /// Path that caused the owed follow-up, if any.
        pending: Option<PathBuf>,
    },
}

/// What happened to a trigger offered to [`RunLock::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The lock was idle; the caller owns a run now.
    Started,
    /// A run was in flight; a follow-up is now owed.
    Coalesced,
    /// A follow-up was already owed; nothing changed.
    AlreadyPending,
}

/// What the owner of a run must do after it finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Start exactly one more run, triggered by the given path. The caller
    /// still owns the lock.
    RunAgain(PathBuf),
    /// The lock is idle again.
    Released,
}

impl RunLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a trigger.
    pub fn try_acquire(&self, trigger: PathBuf) -> Admission {
        let mut state = self.lock();
        let admission = match &*state {
            LockState::Idle => Admission::Started,
            LockState::Running { pending: None } => Admission::Coalesced,
            LockState::Running { pending: Some(_) } => Admission::AlreadyPending,
        };

        match admission {
            Admission::Started => *state = LockState::Running { pending: None },
            Admission::Coalesced => {
                debug!(trigger = ?trigger, "run in flight; follow-up queued");
                *state = LockState::Running {
                    pending: Some(trigger),
                };
            }
            Admission::AlreadyPending => {
                debug!(trigger = ?trigger, "follow-up already queued; trigger absorbed");
            }
        }
        admission
    }

    /// Called by the owner when a run ends.
    pub fn finish(&self) -> Completion {
        let mut state = self.lock();
        match std::mem::take(&mut *state) {
            LockState::Running {
                pending: Some(trigger),
            } => {
                *state = LockState::Running { pending: None };
                Completion::RunAgain(trigger)
            }
            LockState::Running { pending: None } | LockState::Idle => Completion::Released,
        }
    }

    /// Drop any owed follow-up and go idle. Used on shutdown.
    pub fn release(&self) -> bool {
        let mut state = self.lock();
        let had_pending = matches!(&*state, LockState::Running { pending: Some(_) });
        *state = LockState::Idle;
        had_pending
    }

    pub fn is_running(&self) -> bool {
        matches!(&*self.lock(), LockState::Running { .. })
    }

    pub fn has_pending(&self) -> bool {
        matches!(&*self.lock(), LockState::Running { pending: Some(_) })
    }

    fn lock(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> PathBuf {
        PathBuf::from(s)
    }

    #[test]
    fn idle_lock_starts_a_run() {
        let lock = RunLock::new();
        assert_eq!(lock.try_acquire(p("a.sass")), Admission::Started);
        assert!(lock.is_running());
        assert_eq!(lock.finish(), Completion::Released);
        assert!(!lock.is_running());
    }

    #[test]
    fn triggers_during_a_run_collapse_into_one_follow_up() {
        let lock = RunLock::new();
        assert_eq!(lock.try_acquire(p("a.sass")), Admission::Started);

        assert_eq!(lock.try_acquire(p("b.sass")), Admission::Coalesced);
        assert_eq!(lock.try_acquire(p("c.sass")), Admission::AlreadyPending);
        assert_eq!(lock.try_acquire(p("d.sass")), Admission::AlreadyPending);

        // The first queued trigger is reported for the follow-up.
        assert_eq!(lock.finish(), Completion::RunAgain(p("b.sass")));
        assert!(lock.is_running());
        assert!(!lock.has_pending());
        assert_eq!(lock.finish(), Completion::Released);
    }

    #[test]
    fn release_drops_pending_follow_up() {
        let lock = RunLock::new();
        lock.try_acquire(p("a.sass"));
        lock.try_acquire(p("b.sass"));

        assert!(lock.release());
        assert!(!lock.is_running());
        assert_eq!(lock.try_acquire(p("c.sass")), Admission::Started);
    }
}
