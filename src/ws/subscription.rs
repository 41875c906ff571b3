//! Observer registry and per-frame fan-out.
//!
//! Observers are kept in registration order, keyed by a monotonically
//! increasing [`SubscriptionId`] so they can be released individually.
//! Dispatch isolates every call: a panicking observer is logged and the
//! remaining observers still receive the frame.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Shared callback invoked with every decoded message.
pub type Observer<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Handle returned by `on_message`, used to release the subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Ordered collection of observers for one client.
///
/// Duplicate registrations are allowed and each receives its own call.
pub struct ObserverRegistry<T> {
    next_id: u64,
    observers: BTreeMap<SubscriptionId, Observer<T>>,
}

impl<T> ObserverRegistry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: 0,
            observers: BTreeMap::new(),
        }
    }

    /// Appends an observer and returns its handle.
    pub fn insert(&mut self, observer: Observer<T>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.insert(id, observer);
        id
    }

    /// Removes an observer. Returns `false` if the handle was unknown or
    /// already released.
    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        self.observers.remove(&id).is_some()
    }

    /// Returns the number of registered observers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    /// Returns `true` if no observer is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Clones the current observers in registration order.
    ///
    /// Dispatch runs on the snapshot so observers may register or release
    /// subscriptions from inside a callback.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(SubscriptionId, Observer<T>)> {
        self.observers
            .iter()
            .map(|(id, obs)| (*id, Arc::clone(obs)))
            .collect()
    }
}

impl<T> Default for ObserverRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ObserverRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("next_id", &self.next_id)
            .field("observers", &self.observers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Outcome of delivering one message to a snapshot of observers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Observers that returned normally.
    pub delivered: usize,
    /// Observers that panicked.
    pub failed: usize,
}

/// Invokes every observer with `message`, in order, isolating panics.
pub fn dispatch<T>(observers: &[(SubscriptionId, Observer<T>)], message: &T) -> DispatchReport {
    let mut report = DispatchReport::default();
    for (id, observer) in observers {
        match catch_unwind(AssertUnwindSafe(|| observer(message))) {
            Ok(()) => report.delivered += 1,
            Err(payload) => {
                report.failed += 1;
                tracing::error!(
                    subscription = %id,
                    reason = panic_message(payload.as_ref()),
                    "observer panicked; continuing dispatch"
                );
            }
        }
    }
    report
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
#[allow(clippy::panic)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    fn recorder(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Observer<i32> {
        let log = Arc::clone(log);
        Arc::new(move |v: &i32| {
            if let Ok(mut log) = log.lock() {
                log.push(format!("{name}:{v}"));
            }
        })
    }

    fn entries(log: &Arc<Mutex<Vec<String>>>) -> Vec<String> {
        log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    #[test]
    fn dispatch_follows_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        registry.insert(recorder(&log, "a"));
        registry.insert(recorder(&log, "b"));
        registry.insert(recorder(&log, "c"));

        let report = dispatch(&registry.snapshot(), &7);
        assert_eq!(report, DispatchReport { delivered: 3, failed: 0 });
        assert_eq!(entries(&log), vec!["a:7", "b:7", "c:7"]);
    }

    #[test]
    fn duplicate_registration_gets_duplicate_calls() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let observer = recorder(&log, "dup");
        let mut registry = ObserverRegistry::new();
        let first = registry.insert(Arc::clone(&observer));
        let second = registry.insert(observer);
        assert_ne!(first, second);

        dispatch(&registry.snapshot(), &1);
        assert_eq!(entries(&log), vec!["dup:1", "dup:1"]);
    }

    #[test]
    fn removed_observer_is_skipped() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        let a = registry.insert(recorder(&log, "a"));
        registry.insert(recorder(&log, "b"));

        assert!(registry.remove(a));
        assert!(!registry.remove(a));
        assert_eq!(registry.len(), 1);

        dispatch(&registry.snapshot(), &2);
        assert_eq!(entries(&log), vec!["b:2"]);
    }

    #[test]
    fn ids_are_never_reused() {
        let mut registry: ObserverRegistry<i32> = ObserverRegistry::new();
        let a = registry.insert(Arc::new(|_: &i32| {}));
        registry.remove(a);
        let b = registry.insert(Arc::new(|_: &i32| {}));
        assert!(b > a);
        assert_eq!(b.to_string(), "sub-1");
    }

    #[test]
    fn panicking_observer_does_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ObserverRegistry::new();
        registry.insert(recorder(&log, "before"));
        registry.insert(Arc::new(|_: &i32| panic!("observer exploded")));
        registry.insert(recorder(&log, "after"));

        let report = dispatch(&registry.snapshot(), &3);
        assert_eq!(report, DispatchReport { delivered: 2, failed: 1 });
        assert_eq!(entries(&log), vec!["before:3", "after:3"]);
    }

    #[test]
    fn empty_registry_dispatches_nothing() {
        let registry: ObserverRegistry<i32> = ObserverRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(dispatch(&registry.snapshot(), &0), DispatchReport::default());
    }

    #[test]
    fn panic_message_extracts_strings() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
