#![cfg(not(loom))]

use lazy_singleton::{GuardState, OnceGuard, RunError};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

static GLOBAL_GUARD: OnceGuard = OnceGuard::new();
static GLOBAL_RUNS: AtomicUsize = AtomicUsize::new(0);

#[test]
fn test_static_guard_runs_once() {
    let handles: Vec<_> = (0..8)
        .map(|_| {
            thread::spawn(|| {
                GLOBAL_GUARD
                    .run(|| {
                        GLOBAL_RUNS.fetch_add(1, Ordering::SeqCst);
                        Ok::<(), ()>(())
                    })
                    .unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(GLOBAL_RUNS.load(Ordering::SeqCst), 1);
    assert_eq!(GLOBAL_GUARD.state(), GuardState::Completed);
}

#[test]
fn test_sixty_four_racers_one_execution() {
    let guard = Arc::new(OnceGuard::new());
    let runs = Arc::new(AtomicUsize::new(0));
    let barrier = Arc::new(Barrier::new(64));

    let handles: Vec<_> = (0..64)
        .map(|_| {
            let guard = guard.clone();
            let runs = runs.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                guard
                    .run(|| {
                        runs.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(10));
                        Ok::<(), ()>(())
                    })
                    .unwrap();
                // Every racer returns only after the action finished.
                assert!(guard.is_completed());
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_action_reported_to_runner_only() {
    let guard = OnceGuard::new();
    let barrier = &Barrier::new(4);
    let guard = &guard;

    let results: Vec<Result<(), RunError<String>>> = thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                s.spawn(move || {
                    barrier.wait();
                    guard.run(|| {
                        thread::sleep(Duration::from_millis(20));
                        Err("disk full".to_string())
                    })
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let failed: Vec<_> = results
        .iter()
        .filter_map(|r| match r {
            Err(RunError::Failed(msg)) => Some(msg.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(failed, ["disk full"]);
    assert_eq!(
        results.iter().filter(|r| **r == Err(RunError::Poisoned)).count(),
        3
    );
    assert_eq!(guard.state(), GuardState::Poisoned);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_any_thread_count_runs_action_once(threads in 1usize..24) {
        let guard = OnceGuard::new();
        let runs = AtomicUsize::new(0);
        let (guard, runs) = (&guard, &runs);

        thread::scope(|s| {
            for _ in 0..threads {
                s.spawn(move || {
                    guard
                        .run(|| {
                            runs.fetch_add(1, Ordering::SeqCst);
                            Ok::<(), ()>(())
                        })
                        .unwrap();
                });
            }
        });

        prop_assert_eq!(runs.load(Ordering::SeqCst), 1);
        prop_assert!(guard.is_completed());
    }
}
