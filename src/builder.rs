//! The component builder collaborator.
//!
//! A service knows nothing about how its component is made. It hands the
//! configured resources to a [`ComponentBuilder`] and publishes whatever comes
//! back. Any closure with the right shape is a builder:
//!
//! ```
//! use std::sync::Arc;
//! use reloadable::builder::ComponentBuilder;
//! use reloadable::resource::{ConfigResource, StaticResource};
//!
//! let builder = |resources: &[Arc<dyn ConfigResource>]| -> anyhow::Result<usize> {
//!     Ok(resources.len())
//! };
//!
//! let resources: Vec<Arc<dyn ConfigResource>> = vec![Arc::new(StaticResource::new("a", ""))];
//! assert_eq!(builder.build(&resources).unwrap(), 1);
//! ```

use std::sync::Arc;

use crate::resource::ConfigResource;

/// Builds one component version from configuration resources.
pub trait ComponentBuilder<T>: Send + Sync {
    /// Construct a fresh component from the current state of `resources`.
    ///
    /// # Errors
    ///
    /// Any error rejects this build; the service keeps its current version.
    fn build(&self, resources: &[Arc<dyn ConfigResource>]) -> anyhow::Result<T>;
}

impl<T, F> ComponentBuilder<T> for F
where
    F: Fn(&[Arc<dyn ConfigResource>]) -> anyhow::Result<T> + Send + Sync,
{
    fn build(&self, resources: &[Arc<dyn ConfigResource>]) -> anyhow::Result<T> {
        self(resources)
    }
}
