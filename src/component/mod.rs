//! Serviceable components: reference-counted component versions.
//!
//! A [`ServiceableComponent`] wraps one immutable value built from
//! configuration. Readers pin it to use the value; the owning service marks
//! it superseded when a newer version is published, and the value is
//! destroyed once the last pin is released.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use reloadable::component::ServiceableComponent;
//!
//! let component = Arc::new(ServiceableComponent::new(String::from("One"), 1));
//!
//! let pinned = component.pin().unwrap();
//! component.mark_superseded_and_maybe_destroy();
//! assert_eq!(pinned.as_str(), "One"); // still usable while pinned
//! assert!(!component.is_destroyed());
//!
//! drop(pinned);
//! assert!(component.is_destroyed());
//! assert!(component.pin().is_err());
//! ```

mod pinned;
mod serviceable;

#[cfg(all(test, loom))]
mod loom_tests;

pub use pinned::PinnedComponent;
pub use serviceable::ServiceableComponent;
