//! `OnceGuard` — a single-use, cross-thread gate.
//!
//! Of any number of racing [`OnceGuard::run`] calls exactly one executes its
//! action; the rest park until that action finishes and then return without
//! running their own. The `Release` swap that finishes the gate pairs with the
//! `Acquire` loads of every later caller, so whatever the action wrote is
//! visible to all of them.

use super::{wait_on_u32, wake_all_u32, AtomicU32, Ordering};

const INCOMPLETE: u32 = 0;
const RUNNING: u32 = 1;
// Running, and at least one thread is parked on the state word.
const QUEUED: u32 = 2;
const COMPLETE: u32 = 3;
const POISONED: u32 = 4;

/// Observable state of a [`OnceGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardState {
    /// No `run` call has started yet.
    NotStarted,
    /// An action is executing.
    InProgress,
    /// The action finished successfully; the gate is permanently open.
    Completed,
    /// The action failed or panicked; the gate never runs anything again.
    Poisoned,
}

/// Why a [`OnceGuard::run`] call did not end with a completed gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError<E> {
    /// This call executed the action and it returned an error.
    Failed(E),
    /// Another call's action failed (or panicked) earlier.
    Poisoned,
}

/// A single-use gate guaranteeing one execution across threads.
///
/// There is no cancellation and no timeout. Calling `run` on the same guard
/// from inside its own action deadlocks.
///
/// # Example
///
/// ```rust
/// use lazy_singleton::OnceGuard;
///
/// static GUARD: OnceGuard = OnceGuard::new();
///
/// let mut runs = 0;
/// GUARD.run(|| { runs += 1; Ok::<(), ()>(()) }).unwrap();
/// GUARD.run(|| { runs += 1; Ok::<(), ()>(()) }).unwrap();
/// assert_eq!(runs, 1);
/// ```
pub struct OnceGuard {
    state: AtomicU32,
}

impl OnceGuard {
    /// Creates a guard in the `NotStarted` state.
    #[cfg(not(loom))]
    #[inline]
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(INCOMPLETE),
        }
    }

    /// Creates a guard in the `NotStarted` state.
    #[cfg(loom)]
    pub fn new() -> Self {
        Self {
            state: AtomicU32::new(INCOMPLETE),
        }
    }

    /// Returns `true` once an action has completed successfully.
    ///
    /// A `true` result synchronizes-with the completing thread.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.state.load(Ordering::Acquire) == COMPLETE
    }

    /// Returns the current state.
    pub fn state(&self) -> GuardState {
        match self.state.load(Ordering::Acquire) {
            INCOMPLETE => GuardState::NotStarted,
            RUNNING | QUEUED => GuardState::InProgress,
            COMPLETE => GuardState::Completed,
            _ => GuardState::Poisoned,
        }
    }

    /// Executes `action` if no other call has, otherwise waits for the call
    /// that did.
    ///
    /// Returns `Ok(())` once the gate is completed, whoever completed it.
    ///
    /// # Errors
    ///
    /// - [`RunError::Failed`] if this call ran `action` and it returned an
    ///   error. The gate is poisoned.
    /// - [`RunError::Poisoned`] if some earlier action failed or panicked.
    ///
    /// A panic inside `action` poisons the gate, wakes the waiters and
    /// keeps unwinding through this call.
    pub fn run<F, E>(&self, action: F) -> Result<(), RunError<E>>
    where
        F: FnOnce() -> Result<(), E>,
    {
        let mut state = self.state.load(Ordering::Acquire);
        loop {
            match state {
                COMPLETE => return Ok(()),
                POISONED => return Err(RunError::Poisoned),
                INCOMPLETE => {
                    if let Err(current) = self.state.compare_exchange_weak(
                        INCOMPLETE,
                        RUNNING,
                        Ordering::Acquire,
                        Ordering::Acquire,
                    ) {
                        state = current;
                        continue;
                    }
                    return self.execute(action);
                }
                RUNNING => {
                    if let Err(current) = self.state.compare_exchange_weak(
                        RUNNING,
                        QUEUED,
                        Ordering::Relaxed,
                        Ordering::Acquire,
                    ) {
                        state = current;
                        continue;
                    }
                    state = QUEUED;
                }
                QUEUED => {
                    wait_on_u32(&self.state, QUEUED);
                    state = self.state.load(Ordering::Acquire);
                }
                _ => unreachable!("invalid once-guard state {state}"),
            }
        }
    }

    fn execute<F, E>(&self, action: F) -> Result<(), RunError<E>>
    where
        F: FnOnce() -> Result<(), E>,
    {
        let mut finish = Finish {
            state: &self.state,
            outcome: POISONED,
        };
        let result = action();
        if result.is_ok() {
            finish.outcome = COMPLETE;
        }
        drop(finish);
        result.map_err(RunError::Failed)
    }
}

impl Default for OnceGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for OnceGuard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OnceGuard").field("state", &self.state()).finish()
    }
}

/// Publishes the outcome of the running action, also on unwind.
struct Finish<'a> {
    state: &'a AtomicU32,
    outcome: u32,
}

impl Drop for Finish<'_> {
    fn drop(&mut self) {
        if self.state.swap(self.outcome, Ordering::AcqRel) == QUEUED {
            wake_all_u32(self.state);
        }
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_state_transitions() {
        let guard = OnceGuard::new();
        assert_eq!(guard.state(), GuardState::NotStarted);

        guard
            .run(|| {
                assert_eq!(guard.state(), GuardState::InProgress);
                Ok::<(), ()>(())
            })
            .unwrap();

        assert_eq!(guard.state(), GuardState::Completed);
        assert!(guard.is_completed());
    }

    #[test]
    fn test_failure_poisons() {
        let guard = OnceGuard::new();
        assert_eq!(guard.run(|| Err("boom")), Err(RunError::Failed("boom")));
        assert_eq!(guard.state(), GuardState::Poisoned);

        let mut ran = false;
        let second = guard.run(|| {
            ran = true;
            Ok::<(), &str>(())
        });
        assert_eq!(second, Err(RunError::Poisoned));
        assert!(!ran);
    }

    #[test]
    fn test_panic_poisons() {
        let guard = OnceGuard::new();
        let result = std::panic::catch_unwind(|| {
            let _ = guard.run::<_, ()>(|| panic!("constructor blew up"));
        });
        assert!(result.is_err());
        assert_eq!(guard.state(), GuardState::Poisoned);
    }

    #[test]
    fn test_waiters_park_until_completion() {
        let guard = OnceGuard::new();
        let runs = AtomicUsize::new(0);
        let written = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    guard
                        .run(|| {
                            runs.fetch_add(1, Ordering::Relaxed);
                            thread::sleep(Duration::from_millis(20));
                            written.store(42, Ordering::Relaxed);
                            Ok::<(), ()>(())
                        })
                        .unwrap();
                    // The gate's release/acquire edge covers the relaxed store.
                    assert_eq!(written.load(Ordering::Relaxed), 42);
                });
            }
        });

        assert_eq!(runs.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_debug_shows_state() {
        let guard = OnceGuard::new();
        assert_eq!(format!("{guard:?}"), "OnceGuard { state: NotStarted }");
    }
}
