//! Scoped pin guard.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use super::serviceable::ServiceableComponent;

/// A pinned component version.
///
/// Dereferences to the component. The pin is released when the guard is
/// dropped, including during unwinding, so a reader can never forget to
/// unpin.
#[must_use = "dropping the guard unpins the component immediately"]
pub struct PinnedComponent<T> {
    owner: Arc<ServiceableComponent<T>>,
    /// Only `None` while dropping.
    value: Option<Arc<T>>,
}

impl<T> PinnedComponent<T> {
    pub(super) fn new(owner: Arc<ServiceableComponent<T>>, value: Arc<T>) -> Self {
        Self {
            owner,
            value: Some(value),
        }
    }

    /// Release the pin explicitly.
    pub fn unpin(self) {
        drop(self);
    }

    /// Generation of the pinned version.
    pub fn generation(&self) -> u64 {
        self.owner.generation()
    }

    /// The version this guard pins.
    pub fn component(&self) -> &Arc<ServiceableComponent<T>> {
        &self.owner
    }
}

impl<T> Deref for PinnedComponent<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value
            .as_deref()
            .expect("pinned value is present until the guard drops")
    }
}

impl<T> Drop for PinnedComponent<T> {
    fn drop(&mut self) {
        // Release our reference first so the unpin that drains the version
        // holds the last one.
        self.value = None;
        self.owner.unpin();
    }
}

impl<T: fmt::Debug> fmt::Debug for PinnedComponent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PinnedComponent")
            .field("generation", &self.owner.generation())
            .field("value", &**self)
            .finish()
    }
}
