//! Service extraction strategies.
//!
//! A strategy picks the single service of interest out of a freshly loaded
//! [`Container`]. It never guesses: zero or several candidates fail the build.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use crate::container::Container;
use crate::error::{Error, Result};

/// Extracts the service from a built container.
pub trait ServiceStrategy<T>: Send + Sync {
    /// Locate the service.
    ///
    /// # Errors
    ///
    /// Fails when the container does not hold exactly one matching candidate.
    fn extract(&self, container: &Container) -> Result<Arc<T>>;
}

impl<T, F> ServiceStrategy<T> for F
where
    F: Fn(&Container) -> Result<Arc<T>> + Send + Sync,
{
    fn extract(&self, container: &Container) -> Result<Arc<T>> {
        self(container)
    }
}

/// Selects the only bean of type `T`.
pub struct ClassBasedServiceStrategy<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> ClassBasedServiceStrategy<T> {
    /// Create the strategy.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for ClassBasedServiceStrategy<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ClassBasedServiceStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassBasedServiceStrategy")
            .field(&std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Any + Send + Sync> ServiceStrategy<T> for ClassBasedServiceStrategy<T> {
    fn extract(&self, container: &Container) -> Result<Arc<T>> {
        let mut candidates = container.beans_of_type::<T>();
        if candidates.len() != 1 {
            let names: Vec<&str> = candidates.iter().map(|(name, _)| *name).collect();
            debug!(
                service = std::any::type_name::<T>(),
                ?names,
                "Service extraction found the wrong number of candidates"
            );
            return Err(Error::ambiguous::<T>(candidates.len()));
        }

        let (name, service) = candidates.remove(0);
        debug!(bean = name, service = std::any::type_name::<T>(), "Extracted service");
        Ok(service)
    }
}

/// Selects the bean registered under a fixed name.
pub struct NamedServiceStrategy<T> {
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> NamedServiceStrategy<T> {
    /// Create a strategy for the bean called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for NamedServiceStrategy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedServiceStrategy")
            .field("name", &self.name)
            .field("service", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Any + Send + Sync> ServiceStrategy<T> for NamedServiceStrategy<T> {
    fn extract(&self, container: &Container) -> Result<Arc<T>> {
        container.get::<T>(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Resolver(&'static str);

    #[test]
    fn test_class_based_single_candidate() {
        let mut container = Container::new();
        container.insert("resolver", Resolver("ldap"));
        container.insert("port", 8080u16);

        let service = ClassBasedServiceStrategy::<Resolver>::new()
            .extract(&container)
            .unwrap();
        assert_eq!(*service, Resolver("ldap"));
    }

    #[test]
    fn test_class_based_no_candidate() {
        let mut container = Container::new();
        container.insert("port", 8080u16);

        let err = ClassBasedServiceStrategy::<Resolver>::new()
            .extract(&container)
            .unwrap_err();
        assert!(matches!(err, Error::StrategyAmbiguity { found: 0, .. }));
    }

    #[test]
    fn test_class_based_multiple_candidates_never_picks_one() {
        let mut container = Container::new();
        container.insert("primary", Resolver("ldap"));
        container.insert("secondary", Resolver("sql"));

        let err = ClassBasedServiceStrategy::<Resolver>::default()
            .extract(&container)
            .unwrap_err();
        match err {
            Error::StrategyAmbiguity { type_name, found } => {
                assert_eq!(found, 2);
                assert!(type_name.ends_with("Resolver"));
            },
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_named_strategy() {
        let mut container = Container::new();
        container.insert("primary", Resolver("ldap"));
        container.insert("secondary", Resolver("sql"));

        let service = NamedServiceStrategy::<Resolver>::new("secondary")
            .extract(&container)
            .unwrap();
        assert_eq!(*service, Resolver("sql"));

        let missing = NamedServiceStrategy::<Resolver>::new("tertiary").extract(&container);
        assert!(matches!(missing, Err(Error::BeanNotFound { .. })));

        container.insert("port", 8080u16);
        let mismatch = NamedServiceStrategy::<Resolver>::new("port").extract(&container);
        assert!(matches!(mismatch, Err(Error::BeanTypeMismatch { .. })));
    }

    #[test]
    fn test_closure_strategy() {
        let mut container = Container::new();
        container.insert("port", 8080u16);

        let strategy = |c: &Container| c.get::<u16>("port");
        assert_eq!(*strategy.extract(&container).unwrap(), 8080);
    }
}
