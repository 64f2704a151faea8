//! Shared speech utilities.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Milliseconds since UNIX epoch, for request timing in logs.
pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Process-unique id for tagging TTS requests in logs.
pub(crate) fn gen_id() -> String {
    format!("tts-{}", NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
}
