//! Timestamps are stored as unix seconds so that `free_at = 0` means
//! "allocatable since the epoch", i.e. immediately.

use chrono::Utc;

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// Current wall-clock time as unix seconds
pub fn now_ts() -> Timestamp {
    Utc::now().timestamp()
}
