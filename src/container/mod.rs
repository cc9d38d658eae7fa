//! A minimal named-bean container.
//!
//! Each build of a container-backed service produces a fresh, isolated
//! [`Container`]: the loader registers beans from the configuration
//! resources, post-processors adjust them, and a
//! [`ServiceStrategy`](crate::strategy::ServiceStrategy) extracts the one
//! service the rest of the process consumes. The container lives exactly as
//! long as the component version it backs; dropping it runs the registered
//! close callbacks.
//!
//! # Example
//!
//! ```
//! use reloadable::container::Container;
//!
//! let mut container = Container::with_profiles(["prod"]);
//! container.insert("port", 8080u16);
//! container.insert_for_profiles("debug_port", &["dev"], 9090u16);
//!
//! assert_eq!(*container.get::<u16>("port").unwrap(), 8080);
//! assert!(!container.contains("debug_port"));
//! ```

mod builder;
mod component;


use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Error, Result};

pub use builder::{ContainerBuilder, ContainerLoader, PostProcessor};
pub use component::{BeanLookup, ContainerComponent};

/// A type-erased bean.
pub type Bean = Arc<dyn Any + Send + Sync>;

type CloseCallback = Box<dyn FnOnce() + Send + Sync>;

/// Named registry of beans built from one configuration snapshot.
#[derive(Default)]
pub struct Container {
    profiles: BTreeSet<String>,
    beans: BTreeMap<String, Bean>,
    close_callbacks: Vec<(String, CloseCallback)>,
}

impl Container {
    /// Create an empty container with no active profiles.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty container with the given active profiles.
    pub fn with_profiles<I, S>(profiles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            profiles: profiles.into_iter().map(Into::into).collect(),
            beans: BTreeMap::new(),
            close_callbacks: Vec::new(),
        }
    }

    /// Register a bean, replacing any bean of the same name.
    ///
    /// Returns the replaced bean, if any.
    pub fn insert<V>(&mut self, name: impl Into<String>, value: V) -> Option<Bean>
    where
        V: Any + Send + Sync,
    {
        self.insert_bean(name.into(), Arc::new(value))
    }

    /// Register an already shared bean.
    pub fn insert_bean(&mut self, name: String, bean: Bean) -> Option<Bean> {
        let previous = self.beans.insert(name.clone(), bean);
        if previous.is_some() {
            debug!(bean = %name, "Overriding bean definition");
        } else {
            trace!(bean = %name, "Registered bean");
        }
        previous
    }

    /// Register a bean only if one of `profiles` is active.
    ///
    /// An empty profile list always registers. Returns whether the bean was
    /// registered.
    pub fn insert_for_profiles<V>(&mut self, name: impl Into<String>, profiles: &[&str], value: V) -> bool
    where
        V: Any + Send + Sync,
    {
        let name = name.into();
        if !profiles.is_empty() && !profiles.iter().any(|p| self.is_profile_active(p)) {
            trace!(bean = %name, ?profiles, "Skipping bean for inactive profiles");
            return false;
        }
        self.insert(name, value);
        true
    }

    /// Remove a bean by name.
    pub fn remove(&mut self, name: &str) -> Option<Bean> {
        self.beans.remove(name)
    }

    /// Look up a bean by name and type.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BeanNotFound`] or [`Error::BeanTypeMismatch`].
    pub fn get<V>(&self, name: &str) -> Result<Arc<V>>
    where
        V: Any + Send + Sync,
    {
        let bean = self.get_any(name).ok_or_else(|| Error::bean_not_found(name))?;
        bean.downcast::<V>()
            .map_err(|_| Error::bean_type_mismatch::<V>(name))
    }

    /// Look up a bean by name without checking its type.
    pub fn get_any(&self, name: &str) -> Option<Bean> {
        self.beans.get(name).cloned()
    }

    /// All beans of type `V`, ordered by name.
    pub fn beans_of_type<V>(&self) -> Vec<(&str, Arc<V>)>
    where
        V: Any + Send + Sync,
    {
        self.beans
            .iter()
            .filter_map(|(name, bean)| {
                Arc::clone(bean)
                    .downcast::<V>()
                    .ok()
                    .map(|bean| (name.as_str(), bean))
            })
            .collect()
    }

    /// Whether a bean with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.beans.contains_key(name)
    }

    /// Bean names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.beans.keys().map(String::as_str)
    }

    /// Number of beans.
    pub fn len(&self) -> usize {
        self.beans.len()
    }

    /// Whether the container holds no beans.
    pub fn is_empty(&self) -> bool {
        self.beans.is_empty()
    }

    /// Whether `profile` is active.
    pub fn is_profile_active(&self, profile: &str) -> bool {
        self.profiles.contains(profile)
    }

    /// Active profiles, sorted.
    pub fn profiles(&self) -> impl Iterator<Item = &str> {
        self.profiles.iter().map(String::as_str)
    }

    /// Run `callback` when the container is closed.
    ///
    /// Callbacks run in reverse registration order.
    pub fn on_close<F>(&mut self, label: impl Into<String>, callback: F)
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        self.close_callbacks.push((label.into(), Box::new(callback)));
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        while let Some((label, callback)) = self.close_callbacks.pop() {
            trace!(callback = %label, "Running close callback");
            callback();
        }
        debug!(beans = self.beans.len(), "Container closed");
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("profiles", &self.profiles)
            .field("beans", &self.beans.keys().collect::<Vec<_>>())
            .field("close_callbacks", &self.close_callbacks.len())
            .finish()
    }
}
