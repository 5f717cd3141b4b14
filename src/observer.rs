//! Instantiation observers.
//!
//! Observers are told about every freshly constructed instance once it is
//! fully wired, and about every cycle-breaking stand-in the injector hands
//! out. They run inside the injector's resolve critical section.

use std::sync::Arc;

use crate::descriptors::AnyArc;
use crate::key::Key;

/// Observer trait for instantiation events.
///
/// `instantiated` is called exactly once per freshly constructed instance,
/// after field injection, stand-in binding and the initialize hook. Cached
/// singletons handed out again do not trigger it.
///
/// # Re-entrancy
///
/// Observer calls are made synchronously while the injector is resolving.
/// Resolving from the same injector inside an observer fails with
/// [`DiError::ReentrantResolution`](crate::DiError::ReentrantResolution).
///
/// # Examples
///
/// ```
/// use graft_di::{AnyArc, Binding, Injectable, Injector, InstantiationObserver, Key, Resolver};
/// use std::sync::{Arc, Mutex};
///
/// #[derive(Default)]
/// struct Recorder {
///     seen: Mutex<Vec<&'static str>>,
/// }
///
/// impl InstantiationObserver for Recorder {
///     fn instantiated(&self, key: &Key, _instance: &AnyArc) {
///         self.seen.lock().unwrap().push(key.short_name());
///     }
/// }
///
/// struct Clock;
/// impl Injectable for Clock {
///     type Deps = ();
///     fn construct(_: ()) -> Self { Clock }
/// }
///
/// let recorder = Arc::new(Recorder::default());
/// let injector = Injector::builder()
///     .register_binding(Binding::bind::<Clock>().to_self().singleton())
///     .unwrap()
///     .add_observer(recorder.clone())
///     .build()
///     .unwrap();
///
/// injector.get_required::<Clock>();
/// injector.get_required::<Clock>();
/// assert_eq!(*recorder.seen.lock().unwrap(), vec!["Clock"]);
/// ```
pub trait InstantiationObserver: Send + Sync {
    /// Called once per freshly constructed and wired instance.
    fn instantiated(&self, key: &Key, instance: &AnyArc);

    /// Called when a stand-in is issued to break a cycle through `key`.
    fn stand_in_issued(&self, _key: &Key) {}
}

/// Container for registered observers.
///
/// Designed to have minimal overhead when no observers are registered.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn InstantiationObserver>>,
}

impl Observers {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add(&mut self, observer: Arc<dyn InstantiationObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn instantiated(&self, key: &Key, instance: &AnyArc) {
        for observer in &self.observers {
            observer.instantiated(key, instance);
        }
    }

    #[inline]
    pub(crate) fn stand_in_issued(&self, key: &Key) {
        for observer in &self.observers {
            observer.stand_in_issued(key);
        }
    }
}

/// Built-in observer that reports events through `tracing`.
///
/// Events are emitted at `INFO` under the `graft_di::observer` target, so
/// they show up with any subscriber once that target is enabled.
///
/// ```
/// use graft_di::{Injector, LoggingObserver};
/// use std::sync::Arc;
///
/// let injector = Injector::builder()
///     .add_observer(Arc::new(LoggingObserver::with_label("bootstrap")))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct LoggingObserver {
    label: &'static str,
}

impl LoggingObserver {
    /// Creates a logging observer with the default label.
    pub fn new() -> Self {
        Self { label: "graft-di" }
    }

    /// Creates a logging observer whose events carry `label`.
    pub fn with_label(label: &'static str) -> Self {
        Self { label }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl InstantiationObserver for LoggingObserver {
    fn instantiated(&self, key: &Key, _instance: &AnyArc) {
        tracing::info!(
            target: "graft_di::observer",
            label = self.label,
            requested = key.display_name(),
            "instantiated"
        );
    }

    fn stand_in_issued(&self, key: &Key) {
        tracing::info!(
            target: "graft_di::observer",
            label = self.label,
            requested = key.display_name(),
            "stand-in issued"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Tally {
        instantiated: Mutex<Vec<Key>>,
        stand_ins: Mutex<Vec<Key>>,
    }

    impl InstantiationObserver for Tally {
        fn instantiated(&self, key: &Key, _instance: &AnyArc) {
            self.instantiated.lock().push(*key);
        }

        fn stand_in_issued(&self, key: &Key) {
            self.stand_ins.lock().push(*key);
        }
    }

    #[test]
    fn every_observer_is_notified_in_order() {
        let first = Arc::new(Tally::default());
        let second = Arc::new(Tally::default());
        let mut observers = Observers::new();
        assert!(!observers.has_observers());
        observers.add(first.clone());
        observers.add(second.clone());
        observers.add(Arc::new(LoggingObserver::new()));

        let instance: AnyArc = Arc::new(Arc::new(5u8));
        observers.instantiated(&Key::of::<u8>(), &instance);
        observers.stand_in_issued(&Key::of::<u16>());

        for tally in [&first, &second] {
            assert_eq!(*tally.instantiated.lock(), vec![Key::of::<u8>()]);
            assert_eq!(*tally.stand_ins.lock(), vec![Key::of::<u16>()]);
        }
    }
}
