//! Job records: one user-requested extraction and its evolving state.
//!
//! Records are plain data. All mutation goes through the queue engine,
//! which owns the collection and publishes [`QueueSnapshot`]s.

mod types;

pub use types::*;

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, used for created/started/finished stamps.
pub fn now_unix_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}
