//! One-shot notification bus keyed by name.
//!
//! Used as a keyed future: "tell me once when model X is built". Each name
//! resolves at most once in practice. The bus remembers resolved names, so a
//! subscriber that arrives after the announcement is invoked immediately
//! with the stored payload instead of waiting forever.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Callback run when a name is announced.
pub type Callback<T> = Box<dyn FnOnce(&T) + Send>;

/// Outcome of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// The name is not resolved yet; the callback is queued under this id.
    Queued(u64),
    /// The name was already resolved; the callback ran before returning.
    Immediate,
}

/// A subscription still waiting for its announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubscription {
    /// Subscription id.
    pub id: u64,
    /// Name being waited on.
    pub topic: String,
    /// Caller-supplied label.
    pub label: String,
}

struct Subscriber<T> {
    id: u64,
    label: String,
    callback: Callback<T>,
}

struct Topic<T> {
    subscribers: Vec<Subscriber<T>>,
    resolved: Option<T>,
}

impl<T> Default for Topic<T> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
            resolved: None,
        }
    }
}

/// Named one-shot publish/subscribe.
///
/// Callbacks always run outside the internal lock, so they may subscribe
/// or announce re-entrantly.
pub struct NotificationBus<T> {
    topics: Mutex<HashMap<String, Topic<T>>>,
    next_id: AtomicU64,
}

impl<T: Clone + Send> NotificationBus<T> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Run `callback` once when `name` is announced.
    ///
    /// If `name` was already announced, the callback runs immediately with
    /// the stored payload.
    pub fn subscribe_once(
        &self,
        name: &str,
        label: impl Into<String>,
        callback: impl FnOnce(&T) + Send + 'static,
    ) -> Delivery {
        let label = label.into();
        let resolved = {
            let mut topics = self.topics.lock();
            let topic = topics.entry(name.to_string()).or_default();
            match &topic.resolved {
                Some(payload) => Some(payload.clone()),
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                    topic.subscribers.push(Subscriber {
                        id,
                        label: label.clone(),
                        callback: Box::new(callback),
                    });
                    tracing::debug!(topic = name, %label, id, "subscription queued");
                    return Delivery::Queued(id);
                }
            }
        };

        if let Some(payload) = resolved {
            tracing::debug!(topic = name, %label, "topic already resolved, delivering now");
            callback(&payload);
        }
        Delivery::Immediate
    }

    /// Resolve `name` and run every queued subscriber in subscription order.
    ///
    /// Returns the number of subscribers invoked.
    pub fn announce(&self, name: &str, payload: &T) -> usize {
        let subscribers = {
            let mut topics = self.topics.lock();
            let topic = topics.entry(name.to_string()).or_default();
            topic.resolved = Some(payload.clone());
            std::mem::take(&mut topic.subscribers)
        };

        let count = subscribers.len();
        tracing::debug!(topic = name, subscribers = count, "announce");

        for subscriber in subscribers {
            tracing::trace!(topic = name, label = %subscriber.label, id = subscriber.id, "deliver");
            (subscriber.callback)(payload);
        }
        count
    }

    /// Check whether `name` has been announced.
    pub fn is_resolved(&self, name: &str) -> bool {
        self.topics
            .lock()
            .get(name)
            .is_some_and(|t| t.resolved.is_some())
    }

    /// Number of subscribers waiting on `name`.
    pub fn waiting_on(&self, name: &str) -> usize {
        self.topics
            .lock()
            .get(name)
            .map_or(0, |t| t.subscribers.len())
    }

    /// All subscriptions still waiting, ordered by subscription id.
    pub fn pending(&self) -> Vec<PendingSubscription> {
        let topics = self.topics.lock();
        let mut pending: Vec<PendingSubscription> = topics
            .iter()
            .flat_map(|(topic, entry)| {
                entry.subscribers.iter().map(move |s| PendingSubscription {
                    id: s.id,
                    topic: topic.clone(),
                    label: s.label.clone(),
                })
            })
            .collect();
        pending.sort_by_key(|p| p.id);
        pending
    }
}

impl<T: Clone + Send> Default for NotificationBus<T> {
    fn default() -> Self {
        Self::new()
    }
}
