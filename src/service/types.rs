//! Types shared by the reloadable service.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle state of a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// Constructed, `start()` not yet called.
    Unstarted,
    /// Serving components and, if configured, polling for changes.
    Running,
    /// Stopped for good.
    Stopped,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unstarted => "unstarted",
            Self::Running => "running",
            Self::Stopped => "stopped",
        })
    }
}

/// What a single reload attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Resources unchanged since the last successful build; nothing rebuilt.
    Unchanged,
    /// A new version was published.
    Reloaded { generation: u64 },
    /// The build succeeded but the service stopped meanwhile, so the new
    /// version was destroyed instead of published.
    Discarded { generation: u64 },
    /// The service was not running.
    Skipped,
}

/// Details of the most recent failed build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadFailure {
    /// When the failing attempt started.
    pub at: DateTime<Utc>,
    /// Rendered error chain.
    pub message: String,
}

/// Observability snapshot of a service.
///
/// Comparing `last_reload_attempt` with `last_successful_reload` reveals a
/// reload that keeps failing while the service serves its last good version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadStatus {
    pub state: ServiceState,
    /// Generation of the published version, 0 if none was ever published.
    pub generation: u64,
    pub last_reload_attempt: Option<DateTime<Utc>>,
    pub last_successful_reload: Option<DateTime<Utc>>,
    /// Cleared by the next successful build.
    pub last_failure: Option<ReloadFailure>,
}

impl ReloadStatus {
    pub(super) fn new() -> Self {
        Self {
            state: ServiceState::Unstarted,
            generation: 0,
            last_reload_attempt: None,
            last_successful_reload: None,
            last_failure: None,
        }
    }

    /// True when the latest reload attempt failed.
    pub fn is_failing(&self) -> bool {
        self.last_failure.is_some()
    }
}
