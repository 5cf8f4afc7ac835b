//! Report snapshots built from a filtered slice of the store

use crate::events::{Event, Timestamp};
use crate::store::{EventFilter, EventStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Key used in `events_by_user` for events without an actor
pub const ANONYMOUS_ACTOR: &str = "anonymous";

/// Count breakdowns of a report's events
///
/// Maps are ordered so the same events always produce the same summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportSummary {
    pub total_events: usize,
    pub events_by_category: BTreeMap<String, usize>,
    pub events_by_severity: BTreeMap<String, usize>,
    pub events_by_user: BTreeMap<String, usize>,
    pub events_by_action: BTreeMap<String, usize>,
}

impl ReportSummary {
    /// Compute every breakdown in a single pass
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        let mut summary = Self::default();

        for event in events {
            summary.total_events += 1;
            *summary
                .events_by_category
                .entry(event.category.to_string())
                .or_insert(0) += 1;
            *summary
                .events_by_severity
                .entry(event.severity.to_string())
                .or_insert(0) += 1;
            *summary
                .events_by_user
                .entry(
                    event
                        .actor
                        .clone()
                        .unwrap_or_else(|| ANONYMOUS_ACTOR.to_string()),
                )
                .or_insert(0) += 1;
            *summary
                .events_by_action
                .entry(event.action.clone())
                .or_insert(0) += 1;
        }

        summary
    }
}

/// Immutable snapshot of a query and its summary
///
/// Reports are never written back to the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub title: String,
    pub description: String,
    pub query: EventFilter,
    pub events: Vec<Event>,
    pub summary: ReportSummary,
    pub generated_at: Timestamp,
    pub generated_by: String,
}

impl Report {
    /// Run `query` against the store and summarize the result
    pub fn generate(
        store: &EventStore,
        title: impl Into<String>,
        description: impl Into<String>,
        query: EventFilter,
        generated_by: impl Into<String>,
    ) -> Self {
        let events = store.query(&query);
        let summary = ReportSummary::from_events(&events);

        Self {
            title: title.into(),
            description: description.into(),
            query,
            events,
            summary,
            generated_at: store.now(),
            generated_by: generated_by.into(),
        }
    }

    /// Plain-text rendering for terminal output
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        // writing into a String cannot fail
        let _ = writeln!(out, "{}", self.title);
        let _ = writeln!(out, "{}", "=".repeat(self.title.chars().count()));
        if !self.description.is_empty() {
            let _ = writeln!(out, "{}", self.description);
        }
        let _ = writeln!(
            out,
            "Generated {} by {}",
            self.generated_at.to_rfc3339(),
            self.generated_by
        );
        let _ = writeln!(out);
        let _ = writeln!(out, "Total events: {}", self.summary.total_events);

        let sections = [
            ("By category", &self.summary.events_by_category),
            ("By severity", &self.summary.events_by_severity),
            ("By user", &self.summary.events_by_user),
            ("By action", &self.summary.events_by_action),
        ];
        for (heading, counts) in sections {
            if counts.is_empty() {
                continue;
            }
            let _ = writeln!(out);
            let _ = writeln!(out, "{}:", heading);
            for (key, count) in counts {
                let _ = writeln!(out, "  {:<24} {}", key, count);
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::events::{Category, EventDraft, EventKind, Severity};
    use chrono::Utc;
    use std::sync::Arc;

    fn store_with_deletes(actors: &[&str]) -> EventStore {
        let mut store = EventStore::new(Arc::new(ManualClock::new(Utc::now())));
        for actor in actors {
            store.append(
                EventDraft::new(
                    EventKind::Audit,
                    "delete",
                    "restaurant",
                    Severity::Critical,
                    Category::DataModification,
                )
                .with_actor(Some(actor.to_string())),
            );
        }
        store
    }

    #[test]
    fn test_summary_counts_distinct_actors() {
        let store = store_with_deletes(&["u1", "u2", "u3", "u4", "u5"]);

        let report = Report::generate(&store, "Deletes", "", EventFilter::all(), "admin");

        assert_eq!(report.summary.total_events, 5);
        assert_eq!(report.summary.events_by_action["delete"], 5);
        assert_eq!(report.summary.events_by_user.len(), 5);
        assert!(report.summary.events_by_user.values().all(|&count| count == 1));
        assert_eq!(report.summary.events_by_severity["critical"], 5);
        assert_eq!(report.summary.events_by_category["data_modification"], 5);
    }

    #[test]
    fn test_missing_actor_counts_as_anonymous() {
        let mut store = store_with_deletes(&["alice"]);
        store.append(EventDraft::new(
            EventKind::Audit,
            "cleanup",
            "system",
            Severity::Low,
            Category::System,
        ));

        let report = Report::generate(&store, "All", "", EventFilter::all(), "system");
        assert_eq!(report.summary.events_by_user[ANONYMOUS_ACTOR], 1);
        assert_eq!(report.summary.events_by_user["alice"], 1);
    }

    #[test]
    fn test_report_is_deterministic() {
        let store = store_with_deletes(&["carol", "alice", "bob"]);

        let first = Report::generate(&store, "Deletes", "d", EventFilter::all(), "admin");
        let second = Report::generate(&store, "Deletes", "d", EventFilter::all(), "admin");
        assert_eq!(first, second);
        assert_eq!(first.render_text(), second.render_text());
    }

    #[test]
    fn test_report_respects_query() {
        let store = store_with_deletes(&["alice", "bob"]);
        let query = EventFilter {
            actor: Some("bob".to_string()),
            ..EventFilter::default()
        };

        let report = Report::generate(&store, "Bob", "", query.clone(), "admin");
        assert_eq!(report.summary.total_events, 1);
        assert_eq!(report.query, query);
    }

    #[test]
    fn test_render_text_lists_breakdowns() {
        let store = store_with_deletes(&["alice"]);
        let report = Report::generate(&store, "Weekly audit", "All activity", EventFilter::all(), "admin");

        let text = report.render_text();
        assert!(text.starts_with("Weekly audit\n============"));
        assert!(text.contains("Total events: 1"));
        assert!(text.contains("By action:"));
        assert!(text.contains("delete"));
    }
}
