//! Native callback table
//!
//! Handles are slab keys. Dispatch clones the callback list out of the lock,
//! so a callback may register or unregister without deadlocking.

use std::sync::atomic::{AtomicBool, Ordering};

use contracts::{CallbackHandle, NativeCallback};
use parking_lot::Mutex;
use slab::Slab;
use tracing::{debug, trace};

use crate::error::{Result, SimError};

pub(crate) struct CallbackRegistry<E> {
    name: &'static str,
    callbacks: Mutex<Slab<NativeCallback<E>>>,
    fail_register: AtomicBool,
    fail_unregister: AtomicBool,
}

impl<E: Clone> CallbackRegistry<E> {
    pub(crate) fn new(name: &'static str) -> Self {
        Self {
            name,
            callbacks: Mutex::new(Slab::new()),
            fail_register: AtomicBool::new(false),
            fail_unregister: AtomicBool::new(false),
        }
    }

    pub(crate) fn register(&self, callback: NativeCallback<E>) -> Result<CallbackHandle> {
        if self.fail_register.swap(false, Ordering::SeqCst) {
            return Err(SimError::Injected {
                operation: "register_native",
            });
        }

        let key = self.callbacks.lock().insert(callback);
        debug!(source = self.name, handle = key, "native callback registered");
        Ok(CallbackHandle(key as u64))
    }

    pub(crate) fn unregister(&self, handle: CallbackHandle) -> Result<()> {
        if self.fail_unregister.swap(false, Ordering::SeqCst) {
            return Err(SimError::Injected {
                operation: "unregister_native",
            });
        }

        let mut callbacks = self.callbacks.lock();
        let key = handle.0 as usize;
        if !callbacks.contains(key) {
            return Err(SimError::UnknownCallback {
                source_name: self.name,
                handle: handle.0,
            });
        }
        callbacks.remove(key);
        debug!(source = self.name, handle = handle.0, "native callback unregistered");
        Ok(())
    }

    /// Invoke every registered callback with a copy of each event
    pub(crate) fn dispatch(&self, events: &[E]) {
        if events.is_empty() {
            return;
        }

        let callbacks: Vec<NativeCallback<E>> =
            self.callbacks.lock().iter().map(|(_, cb)| cb.clone()).collect();
        if callbacks.is_empty() {
            return;
        }

        trace!(
            source = self.name,
            events = events.len(),
            callbacks = callbacks.len(),
            "dispatching native events"
        );
        for event in events {
            for callback in &callbacks {
                callback(event.clone());
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    pub(crate) fn fail_next_register(&self) {
        self.fail_register.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_next_unregister(&self) {
        self.fail_unregister.store(true, Ordering::SeqCst);
    }
}
