//! Append-only event store
//!
//! This module provides the EventStore which keeps every recorded audit and
//! error event in append order. Events leave the store only through the
//! time-based retention sweep in [`EventStore::cleanup`].

use crate::clock::Clock;
use crate::events::{
    Category, Event, EventDraft, EventId, EventKind, Resolution, Severity, Timestamp,
};
use chrono::Duration;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

/// Filter predicates for querying the store
///
/// Every `Some` field must match exactly; `start` and `end` bound the
/// timestamp inclusively. Pagination applies after the newest-first sort.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EventFilter {
    pub kind: Option<EventKind>,
    pub actor: Option<String>,
    pub action: Option<String>,
    pub resource: Option<String>,
    pub severity: Option<Severity>,
    pub category: Option<Category>,
    pub resolved: Option<bool>,
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl EventFilter {
    /// Filter that matches every event
    pub fn all() -> Self {
        Self::default()
    }

    pub fn of_kind(kind: EventKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Whether an event passes every predicate (pagination aside)
    pub fn matches(&self, event: &Event) -> bool {
        fn eq<T: PartialEq>(expected: &Option<T>, actual: &T) -> bool {
            expected.as_ref().map_or(true, |value| value == actual)
        }

        eq(&self.kind, &event.kind)
            && self
                .actor
                .as_ref()
                .map_or(true, |actor| event.actor.as_ref() == Some(actor))
            && eq(&self.action, &event.action)
            && eq(&self.resource, &event.resource)
            && eq(&self.severity, &event.severity)
            && eq(&self.category, &event.category)
            && eq(&self.resolved, &event.resolved)
            && self.start.map_or(true, |start| event.timestamp >= start)
            && self.end.map_or(true, |end| event.timestamp <= end)
    }
}

/// Outcome of an attempt to resolve an error event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The event was unresolved and is now resolved
    Resolved,
    /// The event was resolved earlier; the first resolution is kept
    AlreadyResolved,
    /// No error event with that id exists
    NotFound,
}

/// Process-wide ordered sequence of recorded events
#[derive(Debug)]
pub struct EventStore {
    /// Events in append order
    events: VecDeque<Event>,
    /// Disabled stores ignore appends
    enabled: bool,
    /// Source of append timestamps
    clock: Arc<dyn Clock>,
    /// Timestamp of the most recent append
    last_timestamp: Option<Timestamp>,
}

impl EventStore {
    /// Create an empty, enabled store
    ///
    /// # Examples
    ///
    /// ```
    /// use ledgerwatch::clock::SystemClock;
    /// use ledgerwatch::store::EventStore;
    /// use std::sync::Arc;
    ///
    /// let store = EventStore::new(Arc::new(SystemClock));
    /// assert!(store.is_empty());
    /// ```
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            events: VecDeque::new(),
            enabled: true,
            clock,
            last_timestamp: None,
        }
    }

    /// Append an event, assigning a fresh id and the current time
    ///
    /// Returns `None` without recording anything while the store is
    /// disabled. Timestamps never go backwards: if the clock steps back the
    /// event is stamped with the previous append time.
    pub fn append(&mut self, draft: EventDraft) -> Option<EventId> {
        if !self.enabled {
            debug!("Store disabled, dropping '{}' event", draft.action);
            return None;
        }

        let now = self.clock.now();
        let timestamp = match self.last_timestamp {
            Some(last) if now < last => last,
            _ => now,
        };
        self.last_timestamp = Some(timestamp);

        let id = Uuid::new_v4();
        self.events.push_back(draft.into_event(id, timestamp));
        Some(id)
    }

    /// Look up an event by id
    pub fn get(&self, id: &EventId) -> Option<&Event> {
        // recent events are looked up most often
        self.events.iter().rev().find(|event| &event.id == id)
    }

    /// Query events matching `filter`, newest first
    ///
    /// Events sharing a timestamp are returned in reverse append order.
    pub fn query(&self, filter: &EventFilter) -> Vec<Event> {
        let mut matching: Vec<&Event> = self
            .events
            .iter()
            .rev()
            .filter(|event| filter.matches(event))
            .collect();

        // stable sort keeps reverse append order for equal timestamps
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        matching
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// Events with the given action and resource inside `[start, end]`
    pub fn window_events(
        &self,
        action: &str,
        resource: &str,
        start: Timestamp,
        end: Timestamp,
    ) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|event| {
                event.action == action
                    && event.resource == resource
                    && event.timestamp >= start
                    && event.timestamp <= end
            })
            .collect()
    }

    /// Remove every event older than `now - max_age`
    ///
    /// Returns the number of events removed. Running it again without new
    /// appends removes nothing. An age reaching past the earliest
    /// representable time removes nothing.
    pub fn cleanup(&mut self, max_age: Duration) -> usize {
        let Some(cutoff) = self.clock.now().checked_sub_signed(max_age) else {
            debug!("Retention of {} reaches past the earliest timestamp", max_age);
            return 0;
        };
        let before = self.events.len();

        // timestamps are non-decreasing, so expired events sit at the front
        while let Some(event) = self.events.front() {
            if event.timestamp < cutoff {
                self.events.pop_front();
            } else {
                break;
            }
        }

        let removed = before - self.events.len();
        if removed > 0 {
            debug!("Retention sweep removed {} events", removed);
        }
        removed
    }

    /// Mark an error event resolved
    ///
    /// Only the resolution fields change. Audit events and unknown ids
    /// report [`ResolveOutcome::NotFound`].
    pub fn resolve(&mut self, id: &EventId, resolution: Resolution) -> ResolveOutcome {
        let Some(event) = self
            .events
            .iter_mut()
            .rev()
            .find(|event| &event.id == id && event.kind == EventKind::Error)
        else {
            return ResolveOutcome::NotFound;
        };

        if event.resolved {
            return ResolveOutcome::AlreadyResolved;
        }

        event.resolved = true;
        event.resolution = Some(resolution);
        ResolveOutcome::Resolved
    }

    /// Iterate over events in append order
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current time according to the store's clock
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Utc;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    /// Clock steps (in seconds) applied between appends; may be negative
    #[derive(Debug, Clone)]
    struct ClockSteps(Vec<i64>);

    impl Arbitrary for ClockSteps {
        fn arbitrary(g: &mut Gen) -> Self {
            let size = usize::arbitrary(g) % 40 + 1;
            let steps = (0..size)
                .map(|_| (i16::arbitrary(g) % 600) as i64)
                .collect();
            ClockSteps(steps)
        }
    }

    fn draft(index: usize) -> EventDraft {
        EventDraft::new(
            EventKind::Audit,
            format!("action_{}", index % 3),
            "restaurant",
            Severity::Low,
            Category::System,
        )
    }

    // Every appended event is queryable and append order never goes back in time
    #[quickcheck]
    fn prop_appended_events_are_queryable_in_order(steps: ClockSteps) -> bool {
        let clock = ManualClock::new(Utc::now());
        let mut store = EventStore::new(Arc::new(clock.clone()));

        let mut ids = Vec::new();
        for (index, step) in steps.0.iter().enumerate() {
            clock.advance(Duration::seconds(*step));
            ids.push(store.append(draft(index)).unwrap());
        }

        let results = store.query(&EventFilter::all());
        let all_present = ids
            .iter()
            .all(|id| results.iter().any(|event| &event.id == id));

        let appended: Vec<Timestamp> = store.iter().map(|e| e.timestamp).collect();
        let non_decreasing = appended.windows(2).all(|pair| pair[0] <= pair[1]);

        all_present && non_decreasing && results.len() == ids.len()
    }

    // A second cleanup without intervening appends changes nothing
    #[quickcheck]
    fn prop_cleanup_is_idempotent(steps: ClockSteps, max_age_seconds: u16) -> bool {
        let clock = ManualClock::new(Utc::now());
        let mut store = EventStore::new(Arc::new(clock.clone()));

        for (index, step) in steps.0.iter().enumerate() {
            clock.advance(Duration::seconds(step.abs()));
            store.append(draft(index));
        }

        let max_age = Duration::seconds(max_age_seconds as i64);
        store.cleanup(max_age);
        let after_first: Vec<Event> = store.iter().cloned().collect();

        let removed = store.cleanup(max_age);
        let after_second: Vec<Event> = store.iter().cloned().collect();

        removed == 0 && after_first == after_second
    }
}
