//! Shutdown ordering checks.
//!
//! Once the library has been shut down, no wrapper may be created, used or destroyed. Each
//! wrapper operation calls [`assert_not_shutdown`], which reports a contract violation if
//! [`set_is_shutdown`] was called before. The checks are only performed if enabled in the
//! current [`Config`](crate::config::Config).
use std::sync::atomic::{AtomicBool, Ordering};

static CHECKER: ShutdownChecker = ShutdownChecker::new();

/// A flag recording whether shutdown has begun.
#[derive(Debug, Default)]
pub struct ShutdownChecker {
    is_shutdown: AtomicBool,
}

impl ShutdownChecker {
    /// Constructs a new checker in the running state.
    pub const fn new() -> Self {
        Self {
            is_shutdown: AtomicBool::new(false),
        }
    }

    /// Records the start of shutdown.
    ///
    /// Shutdown may only be signalled once.
    #[track_caller]
    pub fn set_is_shutdown(&self) {
        let was_shutdown = self.is_shutdown.swap(true, Ordering::SeqCst);
        dcheck!(!was_shutdown, "shutdown was already signalled");
    }

    /// Returns whether shutdown has begun.
    pub fn is_shutdown(&self) -> bool {
        self.is_shutdown.load(Ordering::SeqCst)
    }

    /// Reports a contract violation if shutdown has begun.
    #[track_caller]
    pub fn assert_not_shutdown(&self) {
        dcheck!(
            !self.is_shutdown(),
            "object reference incorrectly held at shutdown"
        );
    }
}

/// Records the start of shutdown for the process.
#[track_caller]
pub fn set_is_shutdown() {
    if crate::config::current().shutdown_checks() {
        CHECKER.set_is_shutdown();
        tracing::debug!("shutdown checks armed");
    }
}

/// Returns whether the process started shutting down.
pub fn is_shutdown() -> bool {
    CHECKER.is_shutdown()
}

/// Reports a contract violation if the process started shutting down.
#[track_caller]
pub fn assert_not_shutdown() {
    if crate::config::current().shutdown_checks() {
        CHECKER.assert_not_shutdown();
    }
}

/// Shuts down the library.
///
/// Must be called after all objects have been released. Any wrapper that is used afterwards
/// is reported as a contract violation.
#[no_mangle]
pub extern "C" fn honey_shutdown() {
    crate::panic::abort_on_panic(|| {
        tracing::info!("shutting down");
        set_is_shutdown();
    })
}
