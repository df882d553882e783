//! Statement logging for pooled connections.
//!
//! Every connection built by [`crate::create_pool`] reports each finished
//! statement through SQLite's profile hook, under the `relmap::sql` target:
//! at `debug` level normally, and at `warn` level when the statement ran
//! longer than the slow-query threshold.
//!
//! The hook is a plain function pointer, so the threshold is process-wide,
//! like the tracing subscriber it feeds. The most recent
//! [`set_slow_query_threshold`] call wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use rusqlite::Connection;

/// Threshold used until a pool is created with different settings.
pub const DEFAULT_SLOW_QUERY_MS: u64 = 1_000;

static SLOW_QUERY_MS: AtomicU64 = AtomicU64::new(DEFAULT_SLOW_QUERY_MS);

pub fn set_slow_query_threshold(threshold: Duration) {
    let millis = u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX);
    SLOW_QUERY_MS.store(millis, Ordering::Relaxed);
}

pub fn slow_query_threshold() -> Duration {
    Duration::from_millis(SLOW_QUERY_MS.load(Ordering::Relaxed))
}

/// Installs the statement logger on `conn`.
pub(crate) fn install_statement_logger(conn: &mut Connection) {
    conn.profile(Some(log_statement));
}

fn log_statement(sql: &str, elapsed: Duration) {
    if is_slow(elapsed, slow_query_threshold()) {
        tracing::warn!(target: "relmap::sql", ?elapsed, sql, "slow statement");
    } else {
        tracing::debug!(target: "relmap::sql", ?elapsed, sql, "statement");
    }
}

fn is_slow(elapsed: Duration, threshold: Duration) -> bool {
    elapsed > threshold
}
