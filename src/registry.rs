//! Process-wide slot storage, one slot per singleton type.
//!
//! Rust has no generic statics, so each type's gate and instance pointer live
//! in a leaked [`Slot`] found through a `TypeId`-keyed map. Slots are never
//! removed, which keeps their addresses, and so every instance's identity,
//! fixed for the life of the process.
//!
//! Every lookup, including the fast path of an already constructed singleton,
//! takes the map's read lock. Readers never block each other, but one can wait
//! briefly while another type's first access holds the write lock to insert
//! its slot. That wait is bounded by a single map insertion, never by a
//! constructor: slots are inserted before their construction starts.

use core::any::TypeId;
use core::ptr;
use core::sync::atomic::AtomicPtr;
use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use crate::sync::OnceGuard;

/// Storage for one singleton type.
pub(crate) struct Slot {
    /// Gates construction of the instance.
    pub(crate) guard: OnceGuard,
    /// The boxed instance, type-erased. Null before construction and after
    /// the exit hook has destroyed it.
    pub(crate) value: AtomicPtr<()>,
}

impl Slot {
    fn new() -> Self {
        Self {
            guard: OnceGuard::new(),
            value: AtomicPtr::new(ptr::null_mut()),
        }
    }
}

type SlotMap = HashMap<TypeId, &'static Slot>;

fn slots() -> &'static RwLock<SlotMap> {
    static SLOTS: OnceLock<RwLock<SlotMap>> = OnceLock::new();
    SLOTS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Returns the slot for `T`, if one was ever created.
pub(crate) fn find<T: 'static>() -> Option<&'static Slot> {
    // The map only grows, so a poisoned lock still holds a consistent map.
    let map = slots().read().unwrap_or_else(PoisonError::into_inner);
    map.get(&TypeId::of::<T>()).copied()
}

/// Returns the slot for `T`, creating it on first use.
pub(crate) fn slot<T: 'static>() -> &'static Slot {
    if let Some(slot) = find::<T>() {
        return slot;
    }

    let mut map = slots().write().unwrap_or_else(PoisonError::into_inner);
    *map.entry(TypeId::of::<T>()).or_insert_with(|| {
        log_debug!(type_name = core::any::type_name::<T>(), "allocating singleton slot");
        &*Box::leak(Box::new(Slot::new()))
    })
}

/// Number of types that have a slot.
///
/// A type gets a slot the first time it is accessed; types that are only
/// queried through [`LazySingleton::get`](crate::LazySingleton::get) or
/// [`LazySingleton::is_initialized`](crate::LazySingleton::is_initialized)
/// never do.
pub fn len() -> usize {
    slots().read().unwrap_or_else(PoisonError::into_inner).len()
}

/// Returns `true` if `T` has a slot, i.e. it has been accessed at least once.
pub fn contains<T: 'static>() -> bool {
    find::<T>().is_some()
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::thread;

    struct Alpha;
    struct Beta;
    struct Untouched;

    #[test]
    fn test_slot_is_stable_per_type() {
        let a1: *const Slot = slot::<Alpha>();
        let a2: *const Slot = slot::<Alpha>();
        let b: *const Slot = slot::<Beta>();

        assert_eq!(a1, a2);
        assert_ne!(a1, b);
        assert!(contains::<Alpha>());
        assert!(len() >= 2);
    }

    #[test]
    fn test_find_does_not_create() {
        assert!(find::<Untouched>().is_none());
        assert!(!contains::<Untouched>());
    }

    #[test]
    fn test_concurrent_insert_yields_one_slot() {
        struct Raced;

        let addrs: Vec<usize> = thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| s.spawn(|| slot::<Raced>() as *const Slot as usize))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(addrs.windows(2).all(|w| w[0] == w[1]));
    }
}
