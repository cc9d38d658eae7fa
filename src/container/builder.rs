//! Builds container-backed components.

use std::fmt;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use super::{Container, ContainerComponent};
use crate::builder::ComponentBuilder;
use crate::resource::ConfigResource;
use crate::strategy::ServiceStrategy;

/// Populates a fresh container from configuration resources.
pub trait ContainerLoader: Send + Sync {
    /// Register beans read from `resources` into `container`.
    ///
    /// # Errors
    ///
    /// Any error rejects the build.
    fn load(&self, container: &mut Container, resources: &[Arc<dyn ConfigResource>]) -> anyhow::Result<()>;
}

impl<F> ContainerLoader for F
where
    F: Fn(&mut Container, &[Arc<dyn ConfigResource>]) -> anyhow::Result<()> + Send + Sync,
{
    fn load(&self, container: &mut Container, resources: &[Arc<dyn ConfigResource>]) -> anyhow::Result<()> {
        self(container, resources)
    }
}

/// Hook applied to every freshly loaded container before the service is
/// extracted.
pub trait PostProcessor: Send + Sync {
    /// Adjust the loaded container.
    ///
    /// # Errors
    ///
    /// Any error rejects the build.
    fn post_process(&self, container: &mut Container) -> anyhow::Result<()>;
}

impl<F> PostProcessor for F
where
    F: Fn(&mut Container) -> anyhow::Result<()> + Send + Sync,
{
    fn post_process(&self, container: &mut Container) -> anyhow::Result<()> {
        self(container)
    }
}

/// [`ComponentBuilder`] that loads a container and extracts one service.
///
/// Every build starts from an empty container with the configured profiles
/// active, runs the loader, then each post-processor in registration order,
/// then the strategy.
pub struct ContainerBuilder<T> {
    loader: Box<dyn ContainerLoader>,
    strategy: Box<dyn ServiceStrategy<T>>,
    profiles: Vec<String>,
    post_processors: Vec<Box<dyn PostProcessor>>,
}

impl<T> ContainerBuilder<T> {
    /// Create a builder from a loader and an extraction strategy.
    pub fn new(loader: impl ContainerLoader + 'static, strategy: impl ServiceStrategy<T> + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            strategy: Box::new(strategy),
            profiles: Vec::new(),
            post_processors: Vec::new(),
        }
    }

    /// Activate bean profiles for every build.
    #[must_use]
    pub fn with_profiles<I, S>(mut self, profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.profiles.extend(profiles.into_iter().map(Into::into));
        self
    }

    /// Append a post-processor.
    #[must_use]
    pub fn with_post_processor(mut self, post_processor: impl PostProcessor + 'static) -> Self {
        self.post_processors.push(Box::new(post_processor));
        self
    }
}

impl<T: Send + Sync> ComponentBuilder<ContainerComponent<T>> for ContainerBuilder<T> {
    fn build(&self, resources: &[Arc<dyn ConfigResource>]) -> anyhow::Result<ContainerComponent<T>> {
        let mut container = Container::with_profiles(self.profiles.iter().cloned());

        self.loader
            .load(&mut container, resources)
            .context("Failed to load container")?;

        for (index, post_processor) in self.post_processors.iter().enumerate() {
            post_processor
                .post_process(&mut container)
                .with_context(|| format!("Post-processor #{index} failed"))?;
        }

        let service = self
            .strategy
            .extract(&container)
            .context("Failed to extract service from container")?;

        debug!(
            beans = container.len(),
            service = std::any::type_name::<T>(),
            "Container built"
        );

        Ok(ContainerComponent::new(container, service))
    }
}

impl<T> fmt::Debug for ContainerBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerBuilder")
            .field("service", &std::any::type_name::<T>())
            .field("profiles", &self.profiles)
            .field("post_processors", &self.post_processors.len())
            .finish()
    }
}
