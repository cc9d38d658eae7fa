//! Per-lookup access to the beans of a reloadable service.

use std::any::Any;
use std::sync::Arc;

use tracing::trace;

use crate::container::{Bean, BeanLookup};
use crate::error::{Error, Result};
use crate::service::ReloadableService;

/// Resolves beans from whichever version of a service is current.
///
/// Every [`resolve`](Self::resolve) pins the published version for the
/// duration of that one lookup only. Nothing is cached between calls, so
/// consecutive lookups may be served by different versions.
#[derive(Debug)]
pub struct ReloadableScope<T> {
    service: Arc<ReloadableService<T>>,
}

impl<T: BeanLookup + 'static> ReloadableScope<T> {
    pub fn new(service: Arc<ReloadableService<T>>) -> Self {
        Self { service }
    }

    /// Look up a bean in the current version.
    ///
    /// # Errors
    ///
    /// [`Error::NoComponent`] when nothing is published,
    /// [`Error::BeanNotFound`] when the current version has no such bean.
    pub fn resolve(&self, name: &str) -> Result<Bean> {
        let pinned = self.service.pin()?;
        let bean = pinned.lookup(name);
        let generation = pinned.generation();
        pinned.unpin();

        trace!(service = %self.service.id(), bean = name, generation, "Resolved scoped bean");
        bean.ok_or_else(|| Error::bean_not_found(name))
    }

    /// Look up a bean and downcast it.
    ///
    /// # Errors
    ///
    /// As [`resolve`](Self::resolve), plus [`Error::BeanTypeMismatch`].
    pub fn resolve_as<V: Any + Send + Sync>(&self, name: &str) -> Result<Arc<V>> {
        self.resolve(name)?
            .downcast::<V>()
            .map_err(|_| Error::bean_type_mismatch::<V>(name))
    }

    /// Always fails: beans belong to the version that built them.
    pub fn remove(&self, _name: &str) -> Result<Bean> {
        Err(Error::Unsupported("remove"))
    }

    /// Always fails: destruction follows the version, not the scope.
    pub fn register_destruction_callback<F>(&self, _name: &str, _callback: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        Err(Error::Unsupported("register_destruction_callback"))
    }

    /// Identifier of the backing service.
    pub fn conversation_id(&self) -> &str {
        self.service.id()
    }

    pub fn service(&self) -> &Arc<ReloadableService<T>> {
        &self.service
    }
}
