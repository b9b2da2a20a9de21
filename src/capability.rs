//! Compile-time probe for the destruction opt-out.
//!
//! A type opts out of exit-time destruction by setting
//! [`Singleton::NO_DESTROY`] to `true`. The flag is an associated const, so
//! the branch that would register the exit hook is a constant condition,
//! folded away during monomorphisation. Nothing is looked up at runtime.
//!
//! `Singleton` requires `Sized`, so the destroy path can never be instantiated
//! for a type whose size is not known; declaring one fails to compile:
//!
//! ```compile_fail
//! use lazy_singleton::{ConstructResult, Singleton};
//!
//! // A local unsized type, so only the `Sized` bound can reject the impl.
//! struct Names([String]);
//!
//! impl Singleton for Names {
//!     fn construct() -> ConstructResult<Self> {
//!         unimplemented!()
//!     }
//! }
//! ```

use crate::Singleton;

/// Returns `true` if instances of `T` are destroyed at process exit.
#[inline]
pub const fn destroys_at_exit<T: Singleton>() -> bool {
    !T::NO_DESTROY
}
