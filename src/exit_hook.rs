//! Exit-time destruction of singleton instances.
//!
//! Each destroyable type registers one `extern "C"` callback with the C
//! runtime's `atexit` list while its instance is being constructed. The list
//! runs in reverse registration order during normal termination only: returning
//! from `main` or calling [`std::process::exit`]. Aborts and signal deaths skip
//! it, and so leak the instances.
//!
//! Exit-time destruction is an unscoped release. It suits genuine
//! process-lifetime singletons; anything with a narrower lifetime should own
//! its value and rely on `Drop` instead.

use core::ptr;
use core::sync::atomic::Ordering;
use std::panic::{self, AssertUnwindSafe};

use crate::{registry, Singleton};

/// Registers the destroy callback for `T`.
///
/// If the C runtime refuses the registration a warning is logged and the
/// instance lives until the process is gone.
pub(crate) fn register<T: Singleton>() {
    // SAFETY: `destroy::<T>` is a plain `extern "C" fn()` that never unwinds.
    let status = unsafe { libc::atexit(destroy::<T>) };
    if status == 0 {
        log_debug!(type_name = core::any::type_name::<T>(), "registered exit hook");
    } else {
        log_warn!(
            type_name = core::any::type_name::<T>(),
            status,
            "atexit registration failed; instance will not be destroyed"
        );
    }
}

extern "C" fn destroy<T: Singleton>() {
    let Some(slot) = registry::find::<T>() else {
        return;
    };

    // Null is the "gone" sentinel; later accesses detect it instead of reading
    // freed memory.
    let instance = slot.value.swap(ptr::null_mut(), Ordering::AcqRel).cast::<T>();
    if instance.is_null() {
        return;
    }

    log_debug!(type_name = core::any::type_name::<T>(), "destroying singleton at exit");

    // SAFETY: the pointer came from `Box::into_raw` in `LazySingleton::initialize`
    // and the swap above makes this the only place that ever frees it.
    let dropped = panic::catch_unwind(AssertUnwindSafe(|| unsafe {
        drop(Box::from_raw(instance));
    }));
    if dropped.is_err() {
        log_error!(type_name = core::any::type_name::<T>(), "singleton destructor panicked during exit");
    }
}
