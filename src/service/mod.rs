//! Reloadable services.
//!
//! A [`ReloadableService`] owns the configuration resources of one component,
//! builds it on start, and rebuilds it whenever the resources change. New
//! versions are published with an atomic swap; superseded versions live on
//! until their last reader lets go.
//!
//! ```text
//! Unstarted ──start()──▶ Running ──stop()──▶ Stopped
//!     │                                        ▲
//!     └────────stop() / failed fail-fast start─┘
//! ```

mod reloadable;
mod types;
mod watcher;


pub use reloadable::ReloadableService;
pub use types::{ReloadFailure, ReloadOutcome, ReloadStatus, ServiceState};
