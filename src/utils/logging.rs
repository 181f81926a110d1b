//! Conditional logging macros gated on a module-level `ENABLE_LOGS` flag and
//! tagged with a module-level `LOG_TARGET`.
//!
//! Usage:
//! ```rust,ignore
//! const ENABLE_LOGS: bool = true;
//! const LOG_TARGET: &str = "lane_cycle::cycle";
//!
//! use crate::{log_info, log_warn};
//!
//! log_info!("servicing lane {}", 2);
//! ```
//!
//! Records go through the `log` facade, so `RUST_LOG=lane_cycle::cycle=debug`
//! narrows output to a single module.

/// Info-level record, emitted only when the calling module's `ENABLE_LOGS` is set.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!(target: LOG_TARGET, $($arg)*);
        }
    };
}

/// Warn-level record, emitted only when the calling module's `ENABLE_LOGS` is set.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!(target: LOG_TARGET, $($arg)*);
        }
    };
}

/// Error-level record, emitted only when the calling module's `ENABLE_LOGS` is set.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!(target: LOG_TARGET, $($arg)*);
        }
    };
}

/// Debug-level record for per-turn chatter (timeouts, staged reloads).
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!(target: LOG_TARGET, $($arg)*);
        }
    };
}
