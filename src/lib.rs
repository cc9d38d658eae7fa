//! Hot-reloadable components with reference-counted teardown.
//!
//! A [`ReloadableService`] builds a component from a set of configuration
//! resources, watches those resources for changes, and atomically publishes
//! a rebuilt version whenever they change. Readers pin the version they use;
//! superseded versions are destroyed once their last pin is released, so a
//! request that started on the old configuration finishes on it.
//!
//! - [`component`] - versioned, pinnable component wrappers
//! - [`service`] - the reloadable service and its watcher
//! - [`resource`] - configuration sources and change detection
//! - [`container`] / [`strategy`] - an isolated bean container per build and
//!   the rule that extracts the service from it
//! - [`scope`] - per-lookup bean resolution against the current version
//! - [`config`] - TOML service files

pub mod builder;
pub mod component;
pub mod config;
pub mod constants;
pub mod container;
pub mod error;
pub mod merge;
pub mod resource;
pub mod scope;
pub mod service;
pub mod strategy;

pub use builder::ComponentBuilder;
pub use component::{PinnedComponent, ServiceableComponent};
pub use error::{Error, Result};
pub use service::{ReloadOutcome, ReloadStatus, ReloadableService, ServiceState};
