//! Notifier: synchronous publish/subscribe primitive
//!
//! Records and aggregates own a `Notifier` by composition and use it to
//! announce field-level changes (`update_<field>` events) to interested
//! listeners. Delivery is synchronous and in subscription order.
//!
//! Subscriber callbacks control their own lifetime: returning `Ok(false)`
//! removes the subscription, returning `Ok(true)` keeps it. A callback that
//! returns `Err` is logged and retained; the error never propagates to the
//! notifying caller, so one broken listener cannot starve the others.
//!
//! # Examples
//!
//! ```
//! use dayside_common::events::Notifier;
//!
//! let notifier: Notifier<String> = Notifier::new();
//! notifier.subscribe("update_title", |event, payload: &String| {
//!     println!("{event}: {payload}");
//!     Ok(true)
//! });
//! notifier.notify("update_title", &"Morning Rundown".to_string());
//! ```

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use crate::{Error, Result};

/// Handle identifying a single subscription.
///
/// Callbacks have no identity in Rust, so duplicate-subscription detection
/// from callback-based observer designs is replaced by explicit ids: every
/// `subscribe` returns a fresh id and `unsubscribe` removes exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Which events a subscription receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventFilter {
    /// Receive every event.
    Any,
    /// Receive only the named events.
    Events(BTreeSet<String>),
}

impl EventFilter {
    /// Whether `event` passes this filter.
    pub fn matches(&self, event: &str) -> bool {
        match self {
            EventFilter::Any => true,
            EventFilter::Events(names) => names.contains(event),
        }
    }
}

impl From<&str> for EventFilter {
    fn from(event: &str) -> Self {
        if event == "any" {
            EventFilter::Any
        } else {
            EventFilter::Events(BTreeSet::from([event.to_string()]))
        }
    }
}

impl From<String> for EventFilter {
    fn from(event: String) -> Self {
        EventFilter::from(event.as_str())
    }
}

impl From<&[&str]> for EventFilter {
    fn from(events: &[&str]) -> Self {
        if events.iter().any(|e| *e == "any") {
            EventFilter::Any
        } else {
            EventFilter::Events(events.iter().map(|e| e.to_string()).collect())
        }
    }
}

impl<const N: usize> From<[&str; N]> for EventFilter {
    fn from(events: [&str; N]) -> Self {
        EventFilter::from(&events[..])
    }
}

type Callback<T> = Box<dyn FnMut(&str, &T) -> Result<bool> + Send>;

struct Subscriber<T> {
    id: SubscriptionId,
    filter: EventFilter,
    callback: Callback<T>,
}

/// Synchronous in-process event dispatcher.
///
/// The subscriber list is guarded by a mutex so a `Notifier` can live inside
/// `Send` types, but delivery is expected to run on a single logical task;
/// there is no cross-task ordering guarantee.
pub struct Notifier<T> {
    subscribers: Mutex<Vec<Subscriber<T>>>,
    /// Ids unsubscribed while their entry was out for delivery.
    doomed: Mutex<Vec<SubscriptionId>>,
    /// Depth of in-progress `notify` calls.
    delivering: AtomicU64,
    next_id: AtomicU64,
}

impl<T> Notifier<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            doomed: Mutex::new(Vec::new()),
            delivering: AtomicU64::new(0),
            next_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Subscriber<T>>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn doomed_lock(&self) -> MutexGuard<'_, Vec<SubscriptionId>> {
        self.doomed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register `callback` for the events selected by `events`.
    ///
    /// `events` accepts the wildcard `"any"`, a single event name, or a list
    /// of names. The callback stays registered until it returns `Ok(false)`
    /// or `unsubscribe` is called with the returned id.
    pub fn subscribe<F>(&self, events: impl Into<EventFilter>, callback: F) -> SubscriptionId
    where
        F: FnMut(&str, &T) -> Result<bool> + Send + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push(Subscriber {
            id,
            filter: events.into(),
            callback: Box::new(callback),
        });
        id
    }

    /// Remove the subscription with `id`. Returns whether it was present.
    ///
    /// Callable from inside a callback during `notify`: the subscriber list
    /// is out for delivery at that point, so the removal is queued and the
    /// target never fires again, not even later in the current round. An id
    /// unknown to the notifier is reported as present in that window, since
    /// the list cannot be checked until delivery finishes.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.lock();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        if subs.len() != before {
            return true;
        }
        drop(subs);
        if self.delivering.load(Ordering::SeqCst) > 0 {
            self.doomed_lock().push(id);
            return true;
        }
        false
    }

    /// Synchronously deliver `payload` under `event` to every matching
    /// subscriber. Returns whether any subscribers remain afterwards.
    ///
    /// The subscriber list is taken out for the duration of delivery:
    /// subscriptions added by a callback first fire on the next event, and
    /// a subscription removed by a callback stops firing immediately, even
    /// if its turn in the current round had not come yet.
    pub fn notify(&self, event: &str, payload: &T) -> bool {
        let current = std::mem::take(&mut *self.lock());
        self.delivering.fetch_add(1, Ordering::SeqCst);
        let mut kept = Vec::with_capacity(current.len());

        for mut sub in current {
            if self.doomed_lock().contains(&sub.id) {
                tracing::trace!(event, id = sub.id.0, "subscriber unsubscribed mid-delivery");
                continue;
            }
            if !sub.filter.matches(event) {
                kept.push(sub);
                continue;
            }
            match (sub.callback)(event, payload) {
                Ok(true) => kept.push(sub),
                Ok(false) => {
                    tracing::trace!(event, id = sub.id.0, "subscriber self-unsubscribed");
                }
                Err(err) => {
                    tracing::warn!(event, id = sub.id.0, error = %err, "subscriber callback failed");
                    kept.push(sub);
                }
            }
        }

        self.delivering.fetch_sub(1, Ordering::SeqCst);
        let mut subs = self.lock();
        // Subscriptions added during delivery land after the survivors;
        // explicit unsubscriptions issued during delivery are applied here.
        let added = std::mem::take(&mut *subs);
        kept.extend(added);
        let mut doomed = self.doomed_lock();
        if !doomed.is_empty() {
            kept.retain(|s| !doomed.contains(&s.id));
            if self.delivering.load(Ordering::SeqCst) == 0 {
                doomed.clear();
            }
        }
        *subs = kept;
        !subs.is_empty()
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }
}

impl<T: Clone + Send + 'static> Notifier<T> {
    /// Single-shot await: resolves with the payload of the first event
    /// matching `events`, then unsubscribes itself.
    ///
    /// Errors only if the notifier is dropped before a matching event fires.
    pub fn wait_for(
        &self,
        events: impl Into<EventFilter>,
    ) -> impl std::future::Future<Output = Result<T>> {
        let (tx, rx) = oneshot::channel();
        let mut tx = Some(tx);
        self.subscribe(events, move |_event, payload: &T| {
            if let Some(tx) = tx.take() {
                // Receiver may have been dropped; nothing to deliver to.
                let _ = tx.send(payload.clone());
            }
            Ok(false)
        });
        async move {
            rx.await
                .map_err(|_| Error::Internal("notifier dropped before event fired".to_string()))
        }
    }
}

impl<T> Default for Notifier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_from_wildcard() {
        assert_eq!(EventFilter::from("any"), EventFilter::Any);
        assert!(EventFilter::from("any").matches("update_title"));
    }

    #[test]
    fn filter_from_list() {
        let filter = EventFilter::from(["update_title", "update_topic"]);
        assert!(filter.matches("update_topic"));
        assert!(!filter.matches("update_id"));
    }

    #[test]
    fn list_containing_wildcard_is_any() {
        assert_eq!(EventFilter::from(["update_title", "any"]), EventFilter::Any);
    }
}
