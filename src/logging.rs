//! Logging facade for the routing core.
//!
//! Every decision the router makes (parse result, gate verdict, debounce
//! suppression, discarded job) is logged through these macros so the host
//! application picks the backend with a Cargo feature instead of the crate
//! forcing one on it:
//!
//! | Feature    | Backend         | Default |
//! |------------|-----------------|---------|
//! | `log`      | `log` crate     | yes     |
//! | `tracing`  | `tracing` crate | no      |
//!
//! Enable at most one. With neither enabled the macros expand to nothing.
//! Every macro expands to statements, so invoke them in statement position
//! (wrap them in braces inside match arms).
//!
//! Level conventions used throughout the crate:
//!
//! - `trace_log!`: matcher attempts, memo hits, per-emission decisions.
//! - `debug_log!`: parse results, tab gate verdicts, job registration.
//! - `info_log!`: entry points and completed navigations.
//! - `warn_log!`: failed navigations and missing tabs.
//! - `error_log!`: host state errors (logged, then swallowed).
//!
//! ```ignore
//! use canvas_navigator::{debug_log, warn_log};
//!
//! debug_log!("Parsed '{}' as {:?}", reference, route.kind());
//! warn_log!("Push of '{}' suppressed by debounce", tag);
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:ident, $($arg:tt)*) => {
        #[cfg(feature = "tracing")]
        ::tracing::$level!($($arg)*);
        #[cfg(feature = "log")]
        ::log::$level!($($arg)*);
    };
}

/// Emit a **trace**-level log message.
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        $crate::__log_at!(trace, $($arg)*)
    };
}

/// Emit a **debug**-level log message.
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::__log_at!(debug, $($arg)*)
    };
}

/// Emit an **info**-level log message.
#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        $crate::__log_at!(info, $($arg)*)
    };
}

/// Emit a **warn**-level log message.
#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        $crate::__log_at!(warn, $($arg)*)
    };
}

/// Emit an **error**-level log message.
///
/// Host state errors are logged at this level and then reported to the
/// caller as a failed navigation, never raised.
#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        $crate::__log_at!(error, $($arg)*)
    };
}
