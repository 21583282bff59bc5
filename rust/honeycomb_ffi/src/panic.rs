//! Contract violation handling.

use std::{fmt::Arguments, panic::Location};

/// Reports a failed contract check.
///
/// The failure is emitted as an error event. Panics if assertions are enabled in the current
/// [`Config`](crate::config::Config), unless the thread is already unwinding.
#[cold]
#[track_caller]
pub fn check_failed(args: Arguments<'_>) {
    let location = Location::caller();
    tracing::error!(
        file = location.file(),
        line = location.line(),
        "{args}"
    );

    // A second panic while unwinding would abort the process.
    if crate::config::current().dchecks() && !std::thread::panicking() {
        panic!("{args}");
    }
}

/// Invokes a closure, aborting the process if a panic occurs.
///
/// Used by exported entry points such as [`honey_shutdown`](crate::shutdown::honey_shutdown).
/// The trampolines installed into structures are plain `extern "C"` functions, for which a
/// panic already aborts the process.
pub fn abort_on_panic<R>(f: impl FnOnce() -> R) -> R {
    std::panic::catch_unwind(std::panic::AssertUnwindSafe(f))
        .unwrap_or_else(|_err| std::process::abort())
}
