use std::sync::atomic::{AtomicU32, Ordering};

/// The depth limit every process starts out with.
pub const DEFAULT_DEPTH_LIMIT: u32 = 10_000_000;

static DEPTH_LIMIT: AtomicU32 = AtomicU32::new(DEFAULT_DEPTH_LIMIT);

/// Returns the process wide default depth limit.
///
/// This is the limit a matcher picks up when it is built without an explicit
/// one. It is read exactly once, when the matcher is built.
pub fn default_depth_limit() -> u32 {
    DEPTH_LIMIT.load(Ordering::SeqCst)
}

/// Set the process wide default depth limit and return the previous one.
///
/// Matchers that already exist keep whatever limit they were built with.
///
/// Only the integer itself is synchronized. A matcher being built on
/// another thread at the same time may observe either the old or the new
/// value.
pub fn set_default_depth_limit(limit: u32) -> u32 {
    DEPTH_LIMIT.swap(limit, Ordering::SeqCst)
}
