use crate::events::{Event, EventKind, Severity, Timestamp};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Headline numbers for the audit trail
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AuditStats {
    pub total: usize,
    pub last_24h: usize,
    pub critical: usize,
    pub by_category: BTreeMap<String, usize>,
}

impl AuditStats {
    /// Compute statistics over the audit events in `events`
    pub fn compute<'a>(events: impl IntoIterator<Item = &'a Event>, now: Timestamp) -> Self {
        let day_ago = now - Duration::hours(24);
        let mut stats = Self::default();

        for event in events.into_iter().filter(|e| e.kind == EventKind::Audit) {
            stats.total += 1;
            if event.timestamp >= day_ago {
                stats.last_24h += 1;
            }
            if event.severity == Severity::Critical {
                stats.critical += 1;
            }
            *stats
                .by_category
                .entry(event.category.to_string())
                .or_insert(0) += 1;
        }

        stats
    }
}

/// Headline numbers for captured errors
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ErrorStats {
    pub total: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
    pub resolved: usize,
    pub unresolved: usize,
    pub last_24h: usize,
}

impl ErrorStats {
    /// Compute statistics over the error events in `events`
    pub fn compute<'a>(events: impl IntoIterator<Item = &'a Event>, now: Timestamp) -> Self {
        let day_ago = now - Duration::hours(24);
        let mut stats = Self::default();

        for event in events.into_iter().filter(|e| e.kind == EventKind::Error) {
            stats.total += 1;
            if event.resolved {
                stats.resolved += 1;
            } else {
                stats.unresolved += 1;
            }
            if event.timestamp >= day_ago {
                stats.last_24h += 1;
            }
            *stats
                .by_severity
                .entry(event.severity.to_string())
                .or_insert(0) += 1;
            *stats
                .by_category
                .entry(event.category.to_string())
                .or_insert(0) += 1;
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Category, EventDraft};
    use chrono::Utc;
    use uuid::Uuid;

    fn event(kind: EventKind, severity: Severity, category: Category, age: Duration) -> Event {
        EventDraft::new(kind, "action", "resource", severity, category)
            .into_event(Uuid::new_v4(), Utc::now() - age)
    }

    #[test]
    fn test_audit_stats() {
        let events = vec![
            event(EventKind::Audit, Severity::Critical, Category::DataModification, Duration::hours(1)),
            event(EventKind::Audit, Severity::Medium, Category::Authentication, Duration::hours(30)),
            event(EventKind::Error, Severity::Critical, Category::Runtime, Duration::hours(1)),
        ];

        let stats = AuditStats::compute(&events, Utc::now());
        assert_eq!(stats.total, 2);
        assert_eq!(stats.last_24h, 1);
        assert_eq!(stats.critical, 1);
        assert_eq!(stats.by_category["authentication"], 1);
        assert!(!stats.by_category.contains_key("runtime"));
    }

    #[test]
    fn test_error_stats() {
        let mut resolved = event(EventKind::Error, Severity::High, Category::Runtime, Duration::hours(2));
        resolved.resolved = true;
        let events = vec![
            resolved,
            event(EventKind::Error, Severity::High, Category::Network, Duration::hours(48)),
            event(EventKind::Error, Severity::Low, Category::Validation, Duration::minutes(5)),
            event(EventKind::Audit, Severity::Low, Category::System, Duration::minutes(5)),
        ];

        let stats = ErrorStats::compute(&events, Utc::now());
        assert_eq!(stats.total, 3);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.unresolved, 2);
        assert_eq!(stats.last_24h, 2);
        assert_eq!(stats.by_severity["high"], 2);
        assert_eq!(stats.by_category["validation"], 1);
    }
}
