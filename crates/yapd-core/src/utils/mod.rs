//! Formatting and synchronisation helpers.

pub mod format;

use std::sync::{Mutex, MutexGuard, PoisonError};

// Re-export commonly used functions at module level
pub use format::{format_number, format_percent, format_timestamp};

/// Lock a mutex, recovering the data if a previous holder panicked.
/// Every critical section in this crate is a single map operation, so
/// the data is never left half-updated.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
