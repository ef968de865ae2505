//! Panic containment for pluggable extractors and validators.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run a closure, converting a panic into its message.
///
/// Plugins only borrow run data immutably, so a panic cannot leave
/// shared state half-updated.
pub fn contain<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

/// Best-effort text of a panic payload
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
