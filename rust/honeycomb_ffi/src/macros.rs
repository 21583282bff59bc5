/// Checks a contract condition.
///
/// A failed check is logged as an error. If assertions are enabled in the current
/// [`Config`](crate::config::Config) the thread panics, which aborts the process when it
/// happens inside an `extern "C"` function. Otherwise execution continues and the caller is
/// expected to fall back to a safe default.
///
/// # Examples
///
/// ```
/// use honeycomb_ffi::dcheck;
///
/// let value = 5;
/// dcheck!(value > 0);
/// dcheck!(value < 10, "value {value} is out of range");
/// ```
#[macro_export]
macro_rules! dcheck {
    ($cond:expr $(,)?) => {
        $crate::dcheck!($cond, "check failed: {}", ::core::stringify!($cond))
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::panic::check_failed(::core::format_args!($($arg)+));
        }
    };
}

/// Checks that two expressions are equal, see [`dcheck!`].
#[macro_export]
macro_rules! dcheck_eq {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left, right) => $crate::dcheck!(
                *left == *right,
                "check failed: {} == {} ({:?} vs. {:?})",
                ::core::stringify!($left),
                ::core::stringify!($right),
                left,
                right
            ),
        }
    };
}

/// Marks a code path that must not be reached, see [`dcheck!`].
#[macro_export]
macro_rules! notreached {
    ($($arg:tt)+) => {
        $crate::panic::check_failed(::core::format_args!($($arg)+))
    };
}
