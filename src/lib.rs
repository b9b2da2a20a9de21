//! # `lazy-singleton` - Per-Type Process Singletons
//!
//! Thread-safe, lazily constructed singletons: for any type implementing
//! [`Singleton`], at most one instance exists per process. It is built on the
//! first [`LazySingleton::access`] by exactly one thread, however many threads
//! race for it, and (unless the type opts out) dropped once during orderly
//! process exit.
//!
//! ## Guarantees
//!
//! - **Exactly-once construction**: construction runs behind a [`OnceGuard`];
//!   racing callers park on the guard's state word until the winner is done.
//! - **No partially built instances**: the instance pointer is published before
//!   the guard's `Release` completion, and every access reads the guard with
//!   `Acquire`. A naive check-then-lock without that edge can hand out a
//!   pointer before the constructor's writes are visible; this cannot.
//! - **Stable identity**: the instance never moves once built.
//! - **Pay for what you use**: a type that is never accessed is never
//!   constructed, never destroyed and never even gets a slot.
//!
//! ## Architecture
//!
//! 1. **`OnceGuard`** ([`sync`]): single-use gate over an `AtomicU32`,
//!    parking on `futex` (Linux) or `WaitOnAddress` (Windows).
//! 2. **Capability probe** ([`capability`]): [`Singleton::NO_DESTROY`] is an
//!    associated const, so the opt-out is resolved at compile time.
//! 3. **Exit hook**: one `atexit` callback per destroyable type; callbacks run
//!    in reverse registration order and reset the slot to a null sentinel.
//! 4. **Registry** ([`registry`]): `TypeId`-keyed slots, standing in for the
//!    generic statics Rust does not have.
//!
//! ## Construction failure
//!
//! A failed construction is reported once, to the caller that triggered it.
//! The type is then poisoned: the constructor never runs again and every later
//! [`LazySingleton::try_access`] returns [`SingletonError::Poisoned`].
//!
//! ## Example
//!
//! ```rust
//! use lazy_singleton::{singleton, LazySingleton};
//! use std::sync::Mutex;
//!
//! #[derive(Default)]
//! struct Registry {
//!     names: Mutex<Vec<String>>,
//! }
//! singleton!(Registry);
//!
//! std::thread::scope(|s| {
//!     for i in 0..4 {
//!         s.spawn(move || {
//!             let registry = LazySingleton::<Registry>::access();
//!             registry.names.lock().unwrap().push(format!("worker-{i}"));
//!         });
//!     }
//! });
//!
//! assert_eq!(LazySingleton::<Registry>::access().names.lock().unwrap().len(), 4);
//! ```

#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

#[macro_use]
mod trace;

pub mod capability;
mod error;
mod exit_hook;
pub mod registry;
mod singleton;
pub mod sync;

pub use error::SingletonError;
pub use singleton::{ConstructResult, LazySingleton, Singleton};
pub use sync::{GuardState, OnceGuard, RunError};

// Compile-time layout checks.
#[cfg(not(loom))]
const _: () = {
    use core::mem;

    // The accessor is a pure type-level handle.
    assert!(mem::size_of::<LazySingleton<u64>>() == 0);

    // The gate is a single state word.
    assert!(mem::size_of::<OnceGuard>() == mem::size_of::<u32>());
};
