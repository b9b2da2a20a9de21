//! Synchronization primitives backing the singleton slots.
//!
//! The gate parks waiters on the address of its state word: `futex` on Linux,
//! `WaitOnAddress` on Windows, and a yield loop everywhere else. Under
//! `--cfg loom` the atomics and the parking are swapped for loom's so the
//! gate can be model checked.

pub mod once_guard;

pub use once_guard::{GuardState, OnceGuard, RunError};

#[cfg(not(loom))]
pub(crate) use core::sync::atomic::{AtomicU32, Ordering};
#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicU32, Ordering};

#[cfg(all(windows, not(loom)))]
use windows_sys::Win32::System::Threading::{WaitOnAddress, WakeByAddressAll};

#[cfg(all(target_os = "linux", not(loom)))]
use libc::{SYS_futex, FUTEX_PRIVATE_FLAG, FUTEX_WAIT, FUTEX_WAKE};

#[cfg(all(target_os = "linux", not(loom)))]
#[inline]
fn futex_wait(addr: *const u32, expected: u32) {
    // Spurious returns (EINTR, EAGAIN) are fine: callers re-check the state.
    unsafe {
        libc::syscall(
            SYS_futex,
            addr,
            FUTEX_WAIT | FUTEX_PRIVATE_FLAG,
            expected,
            core::ptr::null::<libc::timespec>(),
        );
    }
}

#[cfg(all(target_os = "linux", not(loom)))]
#[inline]
fn futex_wake(addr: *const u32, count: i32) {
    unsafe {
        libc::syscall(SYS_futex, addr, FUTEX_WAKE | FUTEX_PRIVATE_FLAG, count);
    }
}

/// Blocks the calling thread while `addr` still holds `expected`.
///
/// May return spuriously; callers must reload and re-check.
#[cfg(not(loom))]
#[inline]
pub(crate) fn wait_on_u32(addr: &AtomicU32, expected: u32) {
    #[cfg(windows)]
    unsafe {
        let expected_ptr = core::ptr::addr_of!(expected).cast::<core::ffi::c_void>();
        let addr_ptr = addr.as_ptr().cast::<core::ffi::c_void>();
        WaitOnAddress(addr_ptr, expected_ptr, core::mem::size_of::<u32>(), u32::MAX);
    }
    #[cfg(target_os = "linux")]
    {
        if addr.load(Ordering::Acquire) == expected {
            futex_wait(addr.as_ptr(), expected);
        }
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    while addr.load(Ordering::Acquire) == expected {
        std::thread::yield_now();
    }
}

/// Wakes every thread parked on `addr`.
#[cfg(not(loom))]
#[inline]
pub(crate) fn wake_all_u32(addr: &AtomicU32) {
    #[cfg(windows)]
    unsafe {
        WakeByAddressAll(addr.as_ptr().cast::<core::ffi::c_void>());
    }
    #[cfg(target_os = "linux")]
    {
        futex_wake(addr.as_ptr(), i32::MAX);
    }
    #[cfg(not(any(windows, target_os = "linux")))]
    let _ = addr;
}

#[cfg(loom)]
pub(crate) fn wait_on_u32(addr: &AtomicU32, expected: u32) {
    while addr.load(Ordering::Acquire) == expected {
        loom::thread::yield_now();
    }
}

#[cfg(loom)]
pub(crate) fn wake_all_u32(_addr: &AtomicU32) {}
