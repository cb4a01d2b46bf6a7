//! EventHub - lazy native registration with listener fan-out
//!
//! A hub owns at most one native registration. The registration is made on
//! the 0 -> 1 subscriber transition and released on the 1 -> 0 transition;
//! `Registration` keeps an explicit subscriber count next to the token so the
//! pairing can be checked at every transition.
//!
//! Dispatch snapshots the listener list (an `Arc<Vec<_>>`, cloned on write)
//! and calls listeners without holding any lock, so listeners may subscribe
//! or unsubscribe re-entrantly.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use contracts::{CallbackHandle, ContractError, NativeCallback, NativeEventSource};
use metrics::counter;
use parking_lot::Mutex;
use tracing::{debug, error, trace, warn};

use crate::error::{HubError, ListenerError, Result};

/// Listener callback type
pub type Listener<E> = Arc<dyn Fn(&E) -> std::result::Result<(), ListenerError> + Send + Sync>;

/// Subscription token returned by `subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Outcome of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Listeners that returned `Ok`
    pub delivered: usize,
    /// Listeners that returned an error or panicked
    pub failed: usize,
}

/// Lifetime counters of a hub
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    pub events_dispatched: u64,
    pub listener_failures: u64,
    pub registrations: u64,
    pub deregistrations: u64,
}

struct Registration {
    subscribers: usize,
    token: Option<CallbackHandle>,
}

type Subscribers<E> = Arc<Vec<(SubscriptionId, Listener<E>)>>;

struct HubInner<E> {
    name: String,
    source: Arc<dyn NativeEventSource<E>>,
    /// Lock order: `registration` before `listeners`
    registration: Mutex<Registration>,
    listeners: Mutex<Subscribers<E>>,
    next_id: AtomicU64,
    events_dispatched: AtomicU64,
    listener_failures: AtomicU64,
    registrations: AtomicU64,
    deregistrations: AtomicU64,
}

impl<E> HubInner<E> {
    fn dispatch(&self, event: &E) -> DispatchReport {
        let snapshot = Arc::clone(&*self.listeners.lock());
        let mut report = DispatchReport::default();

        for (id, listener) in snapshot.iter() {
            match panic::catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    report.failed += 1;
                    warn!(hub = %self.name, subscription = id.0, error = %e, "listener failed");
                }
                Err(payload) => {
                    report.failed += 1;
                    error!(
                        hub = %self.name,
                        subscription = id.0,
                        panic = panic_message(payload.as_ref()),
                        "listener panicked"
                    );
                }
            }
        }

        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
        counter!("handtrail_hub_events_total", "hub" => self.name.clone()).increment(1);
        if report.failed > 0 {
            self.listener_failures
                .fetch_add(report.failed as u64, Ordering::Relaxed);
            counter!("handtrail_hub_listener_failures_total", "hub" => self.name.clone())
                .increment(report.failed as u64);
        }

        trace!(
            hub = %self.name,
            delivered = report.delivered,
            failed = report.failed,
            "event dispatched"
        );
        report
    }

    /// Release the native registration, keeping the token on failure
    fn release(&self, registration: &mut Registration) -> std::result::Result<(), ContractError> {
        if let Some(token) = registration.token {
            self.source.unregister_native(token)?;
            registration.token = None;
            self.deregistrations.fetch_add(1, Ordering::Relaxed);
            debug!(hub = %self.name, handle = token.0, "native source unregistered");
        }
        Ok(())
    }
}

/// Fan-out hub for one native event kind
pub struct EventHub<E: 'static> {
    inner: Arc<HubInner<E>>,
}

impl<E: 'static> fmt::Debug for EventHub<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registration = self.inner.registration.lock();
        f.debug_struct("EventHub")
            .field("name", &self.inner.name)
            .field("subscribers", &registration.subscribers)
            .field("registered", &registration.token.is_some())
            .finish()
    }
}

impl<E: 'static> EventHub<E> {
    /// Create a hub over a native source; nothing is registered yet
    pub fn new(name: impl Into<String>, source: Arc<dyn NativeEventSource<E>>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                name: name.into(),
                source,
                registration: Mutex::new(Registration {
                    subscribers: 0,
                    token: None,
                }),
                listeners: Mutex::new(Arc::new(Vec::new())),
                next_id: AtomicU64::new(1),
                events_dispatched: AtomicU64::new(0),
                listener_failures: AtomicU64::new(0),
                registrations: AtomicU64::new(0),
                deregistrations: AtomicU64::new(0),
            }),
        }
    }

    /// Add a listener
    ///
    /// The first subscriber triggers native registration. If it fails, the
    /// error is returned and the listener is not added.
    pub fn subscribe<F>(&self, listener: F) -> Result<SubscriptionId>
    where
        F: Fn(&E) -> std::result::Result<(), ListenerError> + Send + Sync + 'static,
    {
        let mut registration = self.inner.registration.lock();

        if registration.subscribers == 0 {
            debug_assert!(registration.token.is_none());
            let token = self
                .inner
                .source
                .register_native(self.trampoline())
                .map_err(|source| HubError::Registration {
                    hub: self.inner.name.clone(),
                    source,
                })?;
            registration.token = Some(token);
            self.inner.registrations.fetch_add(1, Ordering::Relaxed);
            debug!(hub = %self.inner.name, handle = token.0, "native source registered");
        }

        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Listener<E> = Arc::new(listener);
        Arc::make_mut(&mut *self.inner.listeners.lock()).push((id, listener));
        registration.subscribers += 1;

        trace!(
            hub = %self.inner.name,
            subscription = id.0,
            subscribers = registration.subscribers,
            "listener subscribed"
        );
        Ok(id)
    }

    /// Remove a listener
    ///
    /// Returns `Ok(false)` if `id` is not subscribed. The last unsubscribe
    /// triggers native deregistration; if that fails the listener stays
    /// subscribed at its previous position and the error is returned.
    pub fn unsubscribe(&self, id: SubscriptionId) -> Result<bool> {
        let mut registration = self.inner.registration.lock();

        let (position, entry) = {
            let mut listeners = self.inner.listeners.lock();
            let Some(position) = listeners.iter().position(|(sid, _)| *sid == id) else {
                return Ok(false);
            };
            (position, Arc::make_mut(&mut *listeners).remove(position))
        };
        registration.subscribers -= 1;

        if registration.subscribers == 0 {
            if let Err(source) = self.inner.release(&mut registration) {
                Arc::make_mut(&mut *self.inner.listeners.lock()).insert(position, entry);
                registration.subscribers += 1;
                return Err(HubError::Deregistration {
                    hub: self.inner.name.clone(),
                    source,
                });
            }
        }

        trace!(
            hub = %self.inner.name,
            subscription = id.0,
            subscribers = registration.subscribers,
            "listener unsubscribed"
        );
        Ok(true)
    }

    /// Remove every listener and release the native registration
    ///
    /// On deregistration failure nothing is removed.
    pub fn clear(&self) -> Result<()> {
        let mut registration = self.inner.registration.lock();
        if registration.subscribers == 0 {
            return Ok(());
        }

        let previous = std::mem::take(&mut *self.inner.listeners.lock());
        let count = registration.subscribers;
        registration.subscribers = 0;

        if let Err(source) = self.inner.release(&mut registration) {
            *self.inner.listeners.lock() = previous;
            registration.subscribers = count;
            return Err(HubError::Deregistration {
                hub: self.inner.name.clone(),
                source,
            });
        }

        debug!(hub = %self.inner.name, removed = count, "hub cleared");
        Ok(())
    }

    /// Deliver an event to all current listeners, in subscription order
    #[inline]
    pub fn dispatch(&self, event: &E) -> DispatchReport {
        self.inner.dispatch(event)
    }

    /// Hub name (used in logs and metric labels)
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.inner.registration.lock().subscribers
    }

    /// Check if the native source is currently registered
    pub fn is_registered(&self) -> bool {
        self.inner.registration.lock().token.is_some()
    }

    /// Lifetime counters
    pub fn stats(&self) -> HubStats {
        HubStats {
            events_dispatched: self.inner.events_dispatched.load(Ordering::Relaxed),
            listener_failures: self.inner.listener_failures.load(Ordering::Relaxed),
            registrations: self.inner.registrations.load(Ordering::Relaxed),
            deregistrations: self.inner.deregistrations.load(Ordering::Relaxed),
        }
    }

    /// Native trampoline; events arriving after the hub is dropped are ignored
    fn trampoline(&self) -> NativeCallback<E> {
        let weak: Weak<HubInner<E>> = Arc::downgrade(&self.inner);
        Arc::new(move |event: E| match weak.upgrade() {
            Some(inner) => {
                inner.dispatch(&event);
            }
            None => trace!("native event for dropped hub ignored"),
        })
    }
}

impl<E: 'static> Drop for EventHub<E> {
    fn drop(&mut self) {
        let mut registration = self.inner.registration.lock();
        if let Err(e) = self.inner.release(&mut registration) {
            warn!(hub = %self.inner.name, error = %e, "native deregistration failed on drop");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    /// Native source that counts (de)registrations and can be told to fail
    #[derive(Default)]
    struct CountingSource {
        registers: AtomicUsize,
        unregisters: AtomicUsize,
        fail_register: AtomicBool,
        fail_unregister: AtomicBool,
        callback: Mutex<Option<NativeCallback<u32>>>,
    }

    impl CountingSource {
        fn counts(&self) -> (usize, usize) {
            (
                self.registers.load(Ordering::SeqCst),
                self.unregisters.load(Ordering::SeqCst),
            )
        }

        fn fire(&self, event: u32) {
            let callback = self.callback.lock().clone();
            if let Some(callback) = callback {
                callback(event);
            }
        }
    }

    impl NativeEventSource<u32> for CountingSource {
        fn register_native(
            &self,
            callback: NativeCallback<u32>,
        ) -> std::result::Result<CallbackHandle, ContractError> {
            if self.fail_register.load(Ordering::SeqCst) {
                return Err(ContractError::native("register", 1, "injected"));
            }
            let n = self.registers.fetch_add(1, Ordering::SeqCst);
            *self.callback.lock() = Some(callback);
            Ok(CallbackHandle(n as u64 + 100))
        }

        fn unregister_native(
            &self,
            _handle: CallbackHandle,
        ) -> std::result::Result<(), ContractError> {
            if self.fail_unregister.load(Ordering::SeqCst) {
                return Err(ContractError::native("unregister", 2, "injected"));
            }
            self.unregisters.fetch_add(1, Ordering::SeqCst);
            *self.callback.lock() = None;
            Ok(())
        }
    }

    fn new_hub() -> (Arc<CountingSource>, EventHub<u32>) {
        let source = Arc::new(CountingSource::default());
        let hub = EventHub::new("test", source.clone() as Arc<dyn NativeEventSource<u32>>);
        (source, hub)
    }

    fn noop(_: &u32) -> std::result::Result<(), ListenerError> {
        Ok(())
    }

    #[test]
    fn test_two_listener_registration_scenario() {
        let (source, hub) = new_hub();

        let l1 = hub.subscribe(noop).unwrap();
        assert_eq!(source.counts(), (1, 0));

        let l2 = hub.subscribe(noop).unwrap();
        assert_eq!(source.counts(), (1, 0));

        assert!(hub.unsubscribe(l1).unwrap());
        assert_eq!(source.counts(), (1, 0));
        assert!(hub.is_registered());

        assert!(hub.unsubscribe(l2).unwrap());
        assert_eq!(source.counts(), (1, 1));
        assert!(!hub.is_registered());
    }

    #[test]
    fn test_registration_once_per_non_empty_interval() {
        let (source, hub) = new_hub();

        for round in 1..=3 {
            let ids: Vec<_> = (0..round).map(|_| hub.subscribe(noop).unwrap()).collect();
            assert_eq!(source.counts(), (round, round - 1));
            for id in ids {
                hub.unsubscribe(id).unwrap();
            }
            assert_eq!(source.counts(), (round, round));
        }

        let stats = hub.stats();
        assert_eq!(stats.registrations, 3);
        assert_eq!(stats.deregistrations, 3);
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let (source, hub) = new_hub();
        let id = hub.subscribe(noop).unwrap();
        hub.unsubscribe(id).unwrap();

        assert!(!hub.unsubscribe(id).unwrap());
        assert_eq!(source.counts(), (1, 1));
    }

    #[test]
    fn test_dispatch_order_survives_failures() {
        let (_source, hub) = new_hub();
        let calls = Arc::new(Mutex::new(Vec::new()));

        let c = calls.clone();
        hub.subscribe(move |e: &u32| {
            c.lock().push(("first", *e));
            Ok(())
        })
        .unwrap();

        let c = calls.clone();
        hub.subscribe(move |e: &u32| {
            c.lock().push(("failing", *e));
            Err("listener error".into())
        })
        .unwrap();

        let c = calls.clone();
        hub.subscribe(move |e: &u32| {
            c.lock().push(("panicking", *e));
            if *e > 0 {
                panic!("listener panic");
            }
            Ok(())
        })
        .unwrap();

        let c = calls.clone();
        hub.subscribe(move |e: &u32| {
            c.lock().push(("last", *e));
            Ok(())
        })
        .unwrap();

        let report = hub.dispatch(&7);
        assert_eq!(report, DispatchReport { delivered: 2, failed: 2 });
        assert_eq!(
            *calls.lock(),
            vec![("first", 7), ("failing", 7), ("panicking", 7), ("last", 7)]
        );
        assert!(hub.is_registered());
        assert_eq!(hub.stats().listener_failures, 2);
    }

    #[test]
    fn test_registration_failure_leaves_no_state() {
        let (source, hub) = new_hub();
        source.fail_register.store(true, Ordering::SeqCst);

        let err = hub.subscribe(noop).unwrap_err();
        assert!(matches!(err, HubError::Registration { .. }));
        assert_eq!(err.native().status(), Some(1));
        assert_eq!(hub.subscriber_count(), 0);
        assert!(!hub.is_registered());
        assert_eq!(hub.dispatch(&1), DispatchReport::default());

        source.fail_register.store(false, Ordering::SeqCst);
        hub.subscribe(noop).unwrap();
        assert_eq!(source.counts(), (1, 0));
    }

    #[test]
    fn test_deregistration_failure_keeps_listener() {
        let (source, hub) = new_hub();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = hub
            .subscribe(move |_: &u32| {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .unwrap();

        source.fail_unregister.store(true, Ordering::SeqCst);
        let err = hub.unsubscribe(id).unwrap_err();
        assert!(matches!(err, HubError::Deregistration { .. }));
        assert_eq!(hub.subscriber_count(), 1);
        assert!(hub.is_registered());

        hub.dispatch(&1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        source.fail_unregister.store(false, Ordering::SeqCst);
        assert!(hub.unsubscribe(id).unwrap());
        assert_eq!(source.counts(), (1, 1));
    }

    #[test]
    fn test_native_trampoline_reaches_listeners() {
        let (source, hub) = new_hub();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        hub.subscribe(move |e: &u32| {
            s.lock().push(*e);
            Ok(())
        })
        .unwrap();

        source.fire(1);
        source.fire(2);
        assert_eq!(*seen.lock(), vec![1, 2]);
        assert_eq!(hub.stats().events_dispatched, 2);
    }

    #[test]
    fn test_listener_may_unsubscribe_during_dispatch() {
        let source = Arc::new(CountingSource::default());
        let hub = Arc::new(EventHub::new(
            "reentrant",
            source.clone() as Arc<dyn NativeEventSource<u32>>,
        ));
        let own_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));
        let later_hits = Arc::new(AtomicUsize::new(0));

        let weak_hub = Arc::downgrade(&hub);
        let cell = own_id.clone();
        let id = hub
            .subscribe(move |_: &u32| {
                let id = *cell.lock();
                if let (Some(hub), Some(id)) = (weak_hub.upgrade(), id) {
                    hub.unsubscribe(id)?;
                }
                Ok(())
            })
            .unwrap();
        *own_id.lock() = Some(id);

        let h = later_hits.clone();
        hub.subscribe(move |_: &u32| {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        // The snapshot still includes both listeners for this event
        assert_eq!(hub.dispatch(&1).delivered, 2);
        assert_eq!(hub.subscriber_count(), 1);

        hub.dispatch(&2);
        assert_eq!(later_hits.load(Ordering::SeqCst), 2);
        assert_eq!(source.counts(), (1, 0));
    }

    #[test]
    fn test_clear_and_drop_release_registration() {
        let (source, hub) = new_hub();
        hub.subscribe(noop).unwrap();
        hub.subscribe(noop).unwrap();

        hub.clear().unwrap();
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(source.counts(), (1, 1));

        hub.subscribe(noop).unwrap();
        drop(hub);
        assert_eq!(source.counts(), (2, 2));
    }

    #[test]
    fn test_events_after_drop_are_ignored() {
        let source = Arc::new(CountingSource::default());
        let hub = EventHub::new("dropped", source.clone() as Arc<dyn NativeEventSource<u32>>);
        hub.subscribe(noop).unwrap();

        let callback = source.callback.lock().clone().unwrap();
        drop(hub);

        // Stale trampoline must not panic
        callback(5);
    }

    #[test]
    fn test_concurrent_subscribers_pair_registrations() {
        let (source, hub) = new_hub();

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    for _ in 0..200 {
                        let id = hub.subscribe(noop).unwrap();
                        assert!(hub.is_registered());
                        source.fire(1);
                        assert!(hub.unsubscribe(id).unwrap());
                    }
                });
            }
        });

        let (registers, unregisters) = source.counts();
        assert!(registers >= 1);
        assert_eq!(registers, unregisters);

        let stats = hub.stats();
        assert_eq!(stats.registrations, registers as u64);
        assert_eq!(stats.registrations, stats.deregistrations);
        assert_eq!(hub.subscriber_count(), 0);
        assert!(!hub.is_registered());
        assert!(source.callback.lock().is_none());
    }
}
