//! `LazySingleton` — the per-type accessor.

use core::any::type_name;
use core::marker::PhantomData;
use core::sync::atomic::Ordering;

use crate::capability;
use crate::error::SingletonError;
use crate::exit_hook;
use crate::registry::{self, Slot};
use crate::sync::RunError;

/// Result type returned by [`Singleton::construct`].
pub type ConstructResult<T> = anyhow::Result<T>;

/// A type with one process-wide instance, reached through [`LazySingleton`].
///
/// Most types implement this with the [`singleton!`](crate::singleton!) macro,
/// which constructs the instance with `Default::default`. Implement it by hand
/// for a constructor that can fail.
///
/// ```rust
/// use lazy_singleton::{ConstructResult, LazySingleton, Singleton};
///
/// struct Limits {
///     max_connections: usize,
/// }
///
/// impl Singleton for Limits {
///     fn construct() -> ConstructResult<Self> {
///         let max_connections = "128".parse()?;
///         Ok(Self { max_connections })
///     }
/// }
///
/// assert_eq!(LazySingleton::<Limits>::access().max_connections, 128);
/// ```
pub trait Singleton: Sized + Send + Sync + 'static {
    /// Opt-out marker: when `true` the instance is never destroyed, not even at
    /// process exit, and no exit hook is registered for the type.
    const NO_DESTROY: bool = false;

    /// Builds the instance. Runs at most once per process.
    ///
    /// # Errors
    ///
    /// Any error is reported once to the caller that triggered construction,
    /// after which the type is poisoned for the rest of the process.
    fn construct() -> ConstructResult<Self>;
}

/// Implements [`Singleton`] for a `Default` type.
///
/// ```rust
/// use lazy_singleton::{singleton, LazySingleton};
///
/// #[derive(Default)]
/// struct Counters {
///     hits: std::sync::atomic::AtomicU64,
/// }
/// singleton!(Counters);
///
/// #[derive(Default)]
/// struct Interner;
/// singleton!(Interner, no_destroy);
///
/// let a = LazySingleton::<Counters>::access();
/// let b = LazySingleton::<Counters>::access();
/// assert!(std::ptr::eq(a, b));
/// ```
#[macro_export]
macro_rules! singleton {
    ($ty:ty) => {
        impl $crate::Singleton for $ty {
            fn construct() -> $crate::ConstructResult<Self> {
                ::core::result::Result::Ok(<$ty as ::core::default::Default>::default())
            }
        }
    };
    ($ty:ty, no_destroy) => {
        impl $crate::Singleton for $ty {
            const NO_DESTROY: bool = true;

            fn construct() -> $crate::ConstructResult<Self> {
                ::core::result::Result::Ok(<$ty as ::core::default::Default>::default())
            }
        }
    };
}

/// Accessor for the process-wide instance of `T`.
///
/// The instance is built on the first [`access`](Self::access) from any
/// thread. Threads that arrive while it is being built block until it is
/// done; every caller sees the same, fully constructed instance. Unless `T`
/// opts out through [`Singleton::NO_DESTROY`], the instance is dropped once
/// during normal process exit.
///
/// Interior mutability of `T` is `T`'s own business: the accessor only ever
/// hands out shared references.
pub struct LazySingleton<T>(PhantomData<fn() -> T>);

impl<T: Singleton> LazySingleton<T> {
    /// Returns the instance, constructing it on first use.
    ///
    /// # Panics
    ///
    /// If construction fails: the triggering caller panics with the
    /// constructor's error (a panicking constructor keeps unwinding), and every
    /// later caller panics with the poisoned error. Aborts the process if the
    /// instance was already destroyed by the exit hook.
    #[inline]
    pub fn access() -> &'static T {
        match Self::try_access() {
            Ok(instance) => instance,
            Err(err) => panic!("{err}"),
        }
    }

    /// Returns the instance, constructing it on first use.
    ///
    /// # Errors
    ///
    /// - [`SingletonError::Construction`] for the caller whose call ran a
    ///   failing constructor.
    /// - [`SingletonError::Poisoned`] for everyone after that, including
    ///   threads that were waiting on the failed construction.
    pub fn try_access() -> Result<&'static T, SingletonError> {
        let slot = registry::slot::<T>();
        if !slot.guard.is_completed() {
            slot.guard
                .run(|| Self::initialize(slot))
                .map_err(|err| match err {
                    RunError::Failed(source) => SingletonError::construction::<T>(source),
                    RunError::Poisoned => SingletonError::poisoned::<T>(),
                })?;
        }
        Ok(Self::load(slot))
    }

    /// Returns the instance if it has been constructed, without constructing it.
    ///
    /// Returns `None` before construction, after a failed construction, and
    /// once the exit hook has destroyed the instance.
    pub fn get() -> Option<&'static T> {
        let slot = registry::find::<T>()?;
        if !slot.guard.is_completed() {
            return None;
        }
        let instance = slot.value.load(Ordering::Acquire).cast::<T>();
        // SAFETY: non-null means the boxed instance is live; see `load`.
        unsafe { instance.as_ref() }
    }

    /// Returns `true` if the instance has been constructed.
    pub fn is_initialized() -> bool {
        registry::find::<T>().is_some_and(|slot| slot.guard.is_completed())
    }

    fn initialize(slot: &'static Slot) -> ConstructResult<()> {
        log_debug!(type_name = type_name::<T>(), "constructing singleton");

        let instance = Box::new(T::construct()?);
        slot.value
            .store(Box::into_raw(instance).cast::<()>(), Ordering::Release);

        if capability::destroys_at_exit::<T>() {
            exit_hook::register::<T>();
        }
        Ok(())
    }

    #[inline]
    fn load(slot: &'static Slot) -> &'static T {
        let instance = slot.value.load(Ordering::Acquire).cast::<T>();
        if instance.is_null() {
            destroyed_instance::<T>();
        }
        // SAFETY: the pointer came from `Box::into_raw` in `initialize` and was
        // published before the guard completed. It is only freed by the exit
        // hook, which runs during process exit after ordinary use has ended.
        unsafe { &*instance }
    }
}

/// A completed guard with no instance: the exit hook already ran.
#[cold]
#[inline(never)]
fn destroyed_instance<T>() -> ! {
    log_error!(type_name = type_name::<T>(), "singleton accessed after destruction");
    eprintln!(
        "lazy-singleton: `{}` accessed after its instance was destroyed at exit",
        type_name::<T>()
    );
    std::process::abort()
}
