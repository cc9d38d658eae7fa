//! Shared defaults.

/// Default interval between change checks, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// Poll intervals below this are accepted but flagged during validation.
pub const MIN_RECOMMENDED_POLL_INTERVAL_MS: u64 = 100;

/// How many times `pin()` re-reads the published version after losing a race
/// with a swap before giving up.
pub const MAX_PIN_ATTEMPTS: usize = 8;

/// Prefix for watcher thread names.
pub const WATCHER_THREAD_PREFIX: &str = "reload-";

/// Default service file used by the `reloadable` binary.
pub const DEFAULT_SERVICE_FILE: &str = "reloadable.toml";
