//! Reference-counted wrapper around one component version.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::pinned::PinnedComponent;
use crate::error::{Error, Result};

/// One published version of a component.
///
/// The wrapper owns the built value and hands out pins to readers. Once the
/// owning service supersedes it, the value is dropped as soon as the last pin
/// is released, and never before.
///
/// # Thread Safety
///
/// Pin, unpin and supersede are serialised by a single mutex whose critical
/// section is a counter update. The value itself is dropped outside the lock,
/// on the thread that released the last pin (or marked the version
/// superseded while unpinned).
pub struct ServiceableComponent<T> {
    generation: u64,
    created_at: DateTime<Utc>,
    state: Mutex<PinState<T>>,
}

struct PinState<T> {
    /// `None` once destroyed.
    value: Option<Arc<T>>,
    pins: usize,
    pending_destroy: bool,
}

impl<T> ServiceableComponent<T> {
    /// Wrap a freshly built value.
    pub fn new(value: T, generation: u64) -> Self {
        Self {
            generation,
            created_at: Utc::now(),
            state: Mutex::new(PinState {
                value: Some(Arc::new(value)),
                pins: 0,
                pending_destroy: false,
            }),
        }
    }

    /// Pin this version and borrow its value.
    ///
    /// Superseded versions can still be pinned while other readers keep them
    /// alive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PinAfterDestroy`] if the value has already been
    /// destroyed.
    pub fn pin(self: &Arc<Self>) -> Result<PinnedComponent<T>> {
        let value = {
            let mut state = self.state.lock();
            let Some(value) = state.value.as_ref().map(Arc::clone) else {
                return Err(Error::PinAfterDestroy {
                    generation: self.generation,
                });
            };
            state.pins += 1;
            value
        };

        Ok(PinnedComponent::new(Arc::clone(self), value))
    }

    /// Release one pin. Called from [`PinnedComponent`]'s drop.
    pub(super) fn unpin(&self) {
        let destroyed = {
            let mut state = self.state.lock();
            if state.pins == 0 {
                warn!(
                    generation = self.generation,
                    "Unbalanced unpin on serviceable component"
                );
                return;
            }
            state.pins -= 1;
            if state.pins == 0 && state.pending_destroy {
                state.value.take()
            } else {
                None
            }
        };

        if let Some(value) = destroyed {
            self.destroy(value);
        }
    }

    /// Flag this version as superseded, destroying it now if nobody holds a pin.
    ///
    /// Calling this more than once has no further effect.
    pub fn mark_superseded_and_maybe_destroy(&self) {
        let destroyed = {
            let mut state = self.state.lock();
            state.pending_destroy = true;
            if state.pins == 0 {
                state.value.take()
            } else {
                debug!(
                    generation = self.generation,
                    pins = state.pins,
                    "Component superseded, waiting for pins to drain"
                );
                None
            }
        };

        if let Some(value) = destroyed {
            self.destroy(value);
        }
    }

    fn destroy(&self, value: Arc<T>) {
        // Guards release their reference before unpinning, so once the pin
        // count is zero the wrapper holds the only one.
        match Arc::try_unwrap(value) {
            Ok(value) => drop(value),
            Err(shared) => {
                warn!(
                    generation = self.generation,
                    references = Arc::strong_count(&shared),
                    "Component still referenced at destruction"
                );
                drop(shared);
            },
        }
        debug!(generation = self.generation, "Component destroyed");
    }

    /// Version number assigned by the owning service.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When this version was built.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of outstanding pins.
    pub fn pin_count(&self) -> usize {
        self.state.lock().pins
    }

    /// Whether the owning service has replaced this version.
    pub fn is_superseded(&self) -> bool {
        self.state.lock().pending_destroy
    }

    /// Whether the value has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().value.is_none()
    }
}

impl<T> fmt::Debug for ServiceableComponent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ServiceableComponent")
            .field("generation", &self.generation)
            .field("created_at", &self.created_at)
            .field("pins", &state.pins)
            .field("pending_destroy", &state.pending_destroy)
            .field("destroyed", &state.value.is_none())
            .finish()
    }
}
