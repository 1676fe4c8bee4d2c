//! Change notifications.
//!
//! The [`ChangeBus`] carries three ordered channels. Subscribers are called
//! synchronously, in subscription order, on the thread that emits. Nothing is
//! buffered: a subscriber added after an emission never sees it.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::column::ColumnDefinition;
use crate::filter::Operator;
use crate::host::GridHost;
use crate::metadata::InputEvent;
use crate::store::{ColumnFilters, CurrentFilter};

/// Handle returned by [`Channel::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// One ordered event channel.
pub struct Channel<T> {
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriptionId, Subscriber<T>)>>,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(0),
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<T> Channel<T> {
    /// Adds a subscriber.
    pub fn subscribe(&self, subscriber: impl Fn(&T) + Send + Sync + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, Arc::new(subscriber)));
        id
    }

    /// Removes a subscriber. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        subscribers.len() != before
    }

    /// Removes every subscriber.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    /// Delivers an event to every current subscriber.
    ///
    /// The subscriber list is copied first, so subscribers may subscribe or
    /// unsubscribe while being notified.
    pub fn emit(&self, event: &T) {
        let subscribers: Vec<Subscriber<T>> =
            self.lock().iter().map(|(_, s)| Arc::clone(s)).collect();
        for subscriber in subscribers {
            subscriber(event);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, Subscriber<T>)>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Which side produced a filter-changed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emitter {
    /// Filters evaluated locally; payload comes from the column filter store.
    Local,
    /// Filters delegated to a remote service; payload comes from the service.
    Remote,
}

impl fmt::Display for Emitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Emitter::Local => f.write_str("local"),
            Emitter::Remote => f.write_str("remote"),
        }
    }
}

/// Payload of a search-change event.
#[derive(Clone, Default)]
pub struct FilterChangedArgs {
    /// Column whose input changed. `None` for bulk changes.
    pub column_id: Option<String>,
    /// Definition of that column.
    pub column: Option<ColumnDefinition>,
    /// Operator of the input.
    pub operator: Option<Operator>,
    /// Search terms of the input.
    pub search_terms: Vec<Value>,
    /// Whether a remote query should run for this change.
    pub should_trigger_query: bool,
    /// Whether the input was an explicit clear.
    pub clear_filter_triggered: bool,
    /// Filters after the change.
    pub column_filters: ColumnFilters,
    /// UI event that triggered the change.
    pub event: Option<InputEvent>,
    /// Grid the change happened in.
    pub grid: Option<Arc<dyn GridHost>>,
}

impl FilterChangedArgs {
    /// Creates args for a change of one column's input.
    pub fn for_column(
        column: &ColumnDefinition,
        operator: Option<Operator>,
        search_terms: Vec<Value>,
    ) -> Self {
        Self {
            column_id: Some(column.id.clone()),
            column: Some(column.clone()),
            operator,
            search_terms,
            should_trigger_query: true,
            ..Self::default()
        }
    }

    /// Attaches the triggering UI event.
    pub fn with_event(mut self, event: InputEvent) -> Self {
        self.event = Some(event);
        self
    }
}

impl fmt::Debug for FilterChangedArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChangedArgs")
            .field("column_id", &self.column_id)
            .field("operator", &self.operator)
            .field("search_terms", &self.search_terms)
            .field("should_trigger_query", &self.should_trigger_query)
            .field("clear_filter_triggered", &self.clear_filter_triggered)
            .field("column_filters", &self.column_filters.column_ids())
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}

/// The three notification channels of a filter coordinator.
#[derive(Debug, Default)]
pub struct ChangeBus {
    /// Current filters after a change was applied.
    pub filter_changed: Channel<Vec<CurrentFilter>>,
    /// A column's filter input changed.
    pub search_changed: Channel<FilterChangedArgs>,
    /// All filters were cleared (`true`).
    pub filter_cleared: Channel<bool>,
}

impl ChangeBus {
    /// Creates a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detaches every subscriber of every channel.
    pub fn unsubscribe_all(&self) {
        self.filter_changed.clear();
        self.search_changed.clear();
        self.filter_cleared.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_subscribers_called_in_order() {
        let channel: Channel<u32> = Channel::default();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            channel.subscribe(move |value| seen.lock().unwrap().push(format!("{tag}{value}")));
        }
        channel.emit(&1);
        channel.emit(&2);

        assert_eq!(*seen.lock().unwrap(), vec!["a1", "b1", "a2", "b2"]);
    }

    #[test]
    fn test_late_subscriber_misses_earlier_events() {
        let channel: Channel<bool> = Channel::default();
        channel.emit(&true);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        channel.subscribe(move |v| sink.lock().unwrap().push(*v));

        assert!(seen.lock().unwrap().is_empty());
        channel.emit(&false);
        assert_eq!(*seen.lock().unwrap(), vec![false]);
    }

    #[test]
    fn test_unsubscribe() {
        let channel: Channel<()> = Channel::default();
        let id = channel.subscribe(|_| {});
        channel.subscribe(|_| {});

        assert!(channel.unsubscribe(id));
        assert!(!channel.unsubscribe(id));
        assert_eq!(channel.subscriber_count(), 1);
    }

    #[test]
    fn test_subscriber_may_subscribe_while_notified() {
        let channel: Arc<Channel<()>> = Arc::new(Channel::default());
        let inner = Arc::clone(&channel);
        channel.subscribe(move |_| {
            inner.subscribe(|_| {});
        });

        channel.emit(&());
        assert_eq!(channel.subscriber_count(), 2);
    }

    #[test]
    fn test_unsubscribe_all() {
        let bus = ChangeBus::new();
        bus.filter_changed.subscribe(|_| {});
        bus.search_changed.subscribe(|_| {});
        bus.filter_cleared.subscribe(|_| {});

        bus.unsubscribe_all();

        assert_eq!(bus.filter_changed.subscriber_count(), 0);
        assert_eq!(bus.search_changed.subscriber_count(), 0);
        assert_eq!(bus.filter_cleared.subscriber_count(), 0);
    }

    #[test]
    fn test_emitter_display() {
        assert_eq!(Emitter::Local.to_string(), "local");
        assert_eq!(Emitter::Remote.to_string(), "remote");
    }
}
