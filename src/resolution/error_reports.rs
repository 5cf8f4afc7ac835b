//! Aggregate reports of captured errors, keyed by message
//!
//! Every captured error folds into the report for its message, so repeated
//! failures show up as one entry with an occurrence count and the set of
//! affected users.

use crate::events::{Event, EventId, Timestamp};
use crate::reports::ANONYMOUS_ACTOR;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Triage state of an aggregate error report
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorReportStatus {
    New,
    Investigating,
    Resolved,
}

/// All occurrences of one error message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorReport {
    pub message: String,
    /// Event that first produced this message
    pub first_event_id: EventId,
    pub occurrences: usize,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
    pub affected_users: BTreeSet<String>,
    pub status: ErrorReportStatus,
}

impl ErrorReport {
    fn new(message: String, event: &Event) -> Self {
        Self {
            message,
            first_event_id: event.id,
            occurrences: 0,
            first_seen: event.timestamp,
            last_seen: event.timestamp,
            affected_users: BTreeSet::new(),
            status: ErrorReportStatus::New,
        }
    }
}

/// Collection of error reports, ordered by message
#[derive(Debug, Default)]
pub struct ErrorReportBook {
    reports: BTreeMap<String, ErrorReport>,
}

impl ErrorReportBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a captured error event into its report
    ///
    /// A resolved report that sees the error again moves back to
    /// `Investigating`.
    pub fn record(&mut self, event: &Event) {
        let message = report_key(event);
        let report = self
            .reports
            .entry(message.clone())
            .or_insert_with(|| ErrorReport::new(message, event));

        report.occurrences += 1;
        report.last_seen = report.last_seen.max(event.timestamp);
        report.affected_users.insert(
            event
                .actor
                .clone()
                .unwrap_or_else(|| ANONYMOUS_ACTOR.to_string()),
        );

        if report.status == ErrorReportStatus::Resolved {
            info!("Resolved error recurred: {}", report.message);
            report.status = ErrorReportStatus::Investigating;
        }
    }

    /// Mark the report for `event`'s message resolved
    ///
    /// Returns whether a report existed.
    pub fn mark_resolved(&mut self, event: &Event) -> bool {
        self.set_status(&report_key(event), ErrorReportStatus::Resolved)
    }

    /// Flag a report as under investigation; returns whether it existed
    pub fn mark_investigating(&mut self, message: &str) -> bool {
        self.set_status(message, ErrorReportStatus::Investigating)
    }

    /// Drop reports not seen since `cutoff`; returns how many were dropped
    pub fn prune_before(&mut self, cutoff: Timestamp) -> usize {
        let before = self.reports.len();
        self.reports.retain(|_, report| report.last_seen >= cutoff);
        before - self.reports.len()
    }

    pub fn get(&self, message: &str) -> Option<&ErrorReport> {
        self.reports.get(message)
    }

    /// Reports in message order
    pub fn iter(&self) -> impl Iterator<Item = &ErrorReport> {
        self.reports.values()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    fn set_status(&mut self, message: &str, status: ErrorReportStatus) -> bool {
        match self.reports.get_mut(message) {
            Some(report) => {
                report.status = status;
                true
            }
            None => false,
        }
    }
}

/// Message an error event is grouped under; falls back to the error class
fn report_key(event: &Event) -> String {
    event.message().unwrap_or(&event.action).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Category, Details, EventDraft, EventKind, Severity};
    use chrono::{Duration, Utc};
    use serde_json::json;
    use uuid::Uuid;

    fn error_event(message: &str, actor: Option<&str>, at: Timestamp) -> Event {
        let mut details = Details::new();
        details.insert("message".to_string(), json!(message));
        EventDraft::new(
            EventKind::Error,
            "TypeError",
            "/orders",
            Severity::High,
            Category::Runtime,
        )
        .with_actor(actor.map(str::to_string))
        .with_details(details)
        .into_event(Uuid::new_v4(), at)
    }

    #[test]
    fn test_occurrences_fold_by_message() {
        let mut book = ErrorReportBook::new();
        let start = Utc::now();

        let first = error_event("x is undefined", Some("alice"), start);
        book.record(&first);
        book.record(&error_event("x is undefined", Some("bob"), start + Duration::minutes(3)));
        book.record(&error_event("x is undefined", Some("alice"), start + Duration::minutes(5)));
        book.record(&error_event("other failure", None, start));

        assert_eq!(book.len(), 2);
        let report = book.get("x is undefined").unwrap();
        assert_eq!(report.occurrences, 3);
        assert_eq!(report.first_event_id, first.id);
        assert_eq!(report.first_seen, start);
        assert_eq!(report.last_seen, start + Duration::minutes(5));
        assert_eq!(report.affected_users.len(), 2);
        assert_eq!(report.status, ErrorReportStatus::New);

        let anonymous = book.get("other failure").unwrap();
        assert!(anonymous.affected_users.contains(ANONYMOUS_ACTOR));
    }

    #[test]
    fn test_status_transitions() {
        let mut book = ErrorReportBook::new();
        let event = error_event("timeout", Some("alice"), Utc::now());
        book.record(&event);

        assert!(book.mark_investigating("timeout"));
        assert_eq!(book.get("timeout").unwrap().status, ErrorReportStatus::Investigating);

        assert!(book.mark_resolved(&event));
        assert_eq!(book.get("timeout").unwrap().status, ErrorReportStatus::Resolved);

        book.record(&error_event("timeout", Some("bob"), Utc::now()));
        assert_eq!(book.get("timeout").unwrap().status, ErrorReportStatus::Investigating);
    }

    #[test]
    fn test_prune_drops_reports_not_seen_since_cutoff() {
        let mut book = ErrorReportBook::new();
        let start = Utc::now();

        book.record(&error_event("stale", None, start));
        book.record(&error_event("recurring", None, start));
        book.record(&error_event("recurring", None, start + Duration::days(3)));

        assert_eq!(book.prune_before(start + Duration::days(1)), 1);
        assert!(book.get("stale").is_none());
        assert_eq!(book.get("recurring").unwrap().occurrences, 2);
        assert_eq!(book.prune_before(start + Duration::days(1)), 0);
    }

    #[test]
    fn test_unknown_message_is_ignored() {
        let mut book = ErrorReportBook::new();
        assert!(!book.mark_investigating("never seen"));
        assert!(!book.mark_resolved(&error_event("never seen", None, Utc::now())));
        assert!(book.is_empty());
    }
}
