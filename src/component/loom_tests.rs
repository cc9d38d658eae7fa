//! Loom models of the pin/unpin/supersede protocol.
//!
//! Loom explores every interleaving of the threads in each model, so the
//! protocol is rebuilt here on loom primitives with the same critical
//! sections as [`ServiceableComponent`](super::ServiceableComponent).
//!
//! # Running Tests
//!
//! ```bash
//! RUSTFLAGS="--cfg loom" cargo test --release loom_tests
//! ```

use loom::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use loom::sync::{Arc, Mutex};
use loom::thread;

/// The built value. `alive` is cleared when it is destroyed.
struct Value {
    alive: AtomicBool,
    destroyed: Arc<AtomicUsize>,
}

impl Value {
    fn destroy(&self) {
        self.alive.store(false, Ordering::SeqCst);
        self.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

struct State {
    value: Option<std::sync::Arc<Value>>,
    pins: usize,
    pending_destroy: bool,
}

struct Component {
    state: Mutex<State>,
}

impl Component {
    fn new(destroyed: Arc<AtomicUsize>) -> Self {
        Self {
            state: Mutex::new(State {
                value: Some(std::sync::Arc::new(Value {
                    alive: AtomicBool::new(true),
                    destroyed,
                })),
                pins: 0,
                pending_destroy: false,
            }),
        }
    }

    fn pin(&self) -> Option<std::sync::Arc<Value>> {
        let mut state = self.state.lock().unwrap();
        let value = state.value.clone()?;
        state.pins += 1;
        Some(value)
    }

    fn unpin(&self) {
        let destroyed = {
            let mut state = self.state.lock().unwrap();
            state.pins -= 1;
            if state.pins == 0 && state.pending_destroy {
                state.value.take()
            } else {
                None
            }
        };
        if let Some(value) = destroyed {
            value.destroy();
        }
    }

    fn mark_superseded(&self) {
        let destroyed = {
            let mut state = self.state.lock().unwrap();
            state.pending_destroy = true;
            if state.pins == 0 { state.value.take() } else { None }
        };
        if let Some(value) = destroyed {
            value.destroy();
        }
    }
}

fn use_pinned(component: &Component) {
    if let Some(value) = component.pin() {
        assert!(value.alive.load(Ordering::SeqCst), "pinned value was destroyed");
        drop(value);
        component.unpin();
    }
}

#[test]
fn supersede_races_single_reader() {
    loom::model(|| {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let component = Arc::new(Component::new(destroyed.clone()));

        let reader = {
            let component = component.clone();
            thread::spawn(move || use_pinned(&component))
        };
        component.mark_superseded();
        reader.join().unwrap();

        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn supersede_races_two_readers() {
    loom::model(|| {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let component = Arc::new(Component::new(destroyed.clone()));

        let readers: Vec<_> = (0..2)
            .map(|_| {
                let component = component.clone();
                thread::spawn(move || use_pinned(&component))
            })
            .collect();
        component.mark_superseded();
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    });
}

#[test]
fn swap_then_supersede_never_exposes_destroyed_value() {
    loom::model(|| {
        let destroyed = Arc::new(AtomicUsize::new(0));
        let current = Arc::new(Mutex::new(Arc::new(Component::new(destroyed.clone()))));

        let reader = {
            let current = current.clone();
            thread::spawn(move || {
                // Load, then pin; retry once if the loaded version died in between.
                for _ in 0..2 {
                    let component = current.lock().unwrap().clone();
                    if let Some(value) = component.pin() {
                        assert!(value.alive.load(Ordering::SeqCst));
                        drop(value);
                        component.unpin();
                        return true;
                    }
                }
                false
            })
        };

        let next = Arc::new(Component::new(destroyed.clone()));
        let previous = std::mem::replace(&mut *current.lock().unwrap(), next);
        previous.mark_superseded();

        assert!(reader.join().unwrap());
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    });
}
