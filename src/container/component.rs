//! The component version published by container-backed services.

use std::fmt;
use std::sync::Arc;

use super::{Bean, Container};

/// Name-based bean lookup, used by the reloadable scope.
pub trait BeanLookup: Send + Sync {
    /// Find a bean by name.
    fn lookup(&self, name: &str) -> Option<Bean>;
}

impl BeanLookup for Container {
    fn lookup(&self, name: &str) -> Option<Bean> {
        self.get_any(name)
    }
}

/// A built container together with the service extracted from it.
///
/// Dropping the component closes the container.
pub struct ContainerComponent<T> {
    service: Arc<T>,
    container: Container,
}

impl<T> ContainerComponent<T> {
    pub(super) fn new(container: Container, service: Arc<T>) -> Self {
        Self { service, container }
    }

    /// The extracted service.
    pub fn service(&self) -> &T {
        &self.service
    }

    /// The container the service was extracted from.
    pub fn container(&self) -> &Container {
        &self.container
    }
}

impl<T: Send + Sync> BeanLookup for ContainerComponent<T> {
    fn lookup(&self, name: &str) -> Option<Bean> {
        self.container.get_any(name)
    }
}

impl<T> fmt::Debug for ContainerComponent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerComponent")
            .field("service", &std::any::type_name::<T>())
            .field("container", &self.container)
            .finish()
    }
}
