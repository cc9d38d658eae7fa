//! Error types for typed error handling.
//!
//! Builders are free to fail with any [`anyhow::Error`]; the service wraps
//! those failures in [`Error::Build`] so callers can tell a rejected
//! configuration apart from a lifecycle bug such as
//! [`Error::PinAfterDestroy`].

/// Result type for reloadable operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors with structured context.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Configuration failed to produce a component.
    #[error("service '{service}' failed to build its component: {source:#}")]
    Build {
        service: String,
        #[source]
        source: anyhow::Error,
    },

    /// A destroyed component version was pinned.
    #[error("component generation {generation} has been destroyed and cannot be pinned")]
    PinAfterDestroy { generation: u64 },

    /// A service strategy found zero or several candidates.
    #[error("expected exactly one component of type {type_name}, found {found}")]
    StrategyAmbiguity {
        type_name: &'static str,
        found: usize,
    },

    /// `start()` was called on a service that already left the unstarted state.
    #[error("service '{0}' has already been started")]
    AlreadyStarted(String),

    /// The operation requires a running service.
    #[error("service '{0}' is not running")]
    NotRunning(String),

    /// No component version has been published yet.
    #[error("service '{0}' has no component available")]
    NoComponent(String),

    /// Bean lookup by name failed.
    #[error("no bean named '{name}'")]
    BeanNotFound { name: String },

    /// Bean exists under the name but has another type.
    #[error("bean '{name}' is not of type {expected}")]
    BeanTypeMismatch {
        name: String,
        expected: &'static str,
    },

    /// Operation the reloadable scope refuses to perform.
    #[error("operation not supported by reloadable scope: {0}")]
    Unsupported(&'static str),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error with context.
    #[error("IO error in {context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Create a build error for the named service.
    pub fn build(service: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Build {
            service: service.into(),
            source,
        }
    }

    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a strategy ambiguity error for type `T`.
    pub fn ambiguous<T: ?Sized>(found: usize) -> Self {
        Self::StrategyAmbiguity {
            type_name: std::any::type_name::<T>(),
            found,
        }
    }

    /// Create a bean not found error.
    pub fn bean_not_found(name: impl Into<String>) -> Self {
        Self::BeanNotFound { name: name.into() }
    }

    /// Create a bean type mismatch error for type `T`.
    pub fn bean_type_mismatch<T: ?Sized>(name: impl Into<String>) -> Self {
        Self::BeanTypeMismatch {
            name: name.into(),
            expected: std::any::type_name::<T>(),
        }
    }

    /// Returns true if this error reports a failed build.
    pub fn is_build(&self) -> bool {
        matches!(self, Self::Build { .. })
    }

    /// Walk the source chain of a build failure looking for a crate error.
    ///
    /// Builders return [`anyhow::Error`], so a strategy failure surfaces
    /// wrapped inside [`Error::Build`]. This digs it back out.
    pub fn build_cause(&self) -> Option<&Error> {
        match self {
            Self::Build { source, .. } => source.chain().find_map(|e| e.downcast_ref::<Error>()),
            _ => None,
        }
    }
}
