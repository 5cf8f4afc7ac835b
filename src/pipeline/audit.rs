use super::Pipeline;
use crate::classifier::classify_audit;
use crate::events::{Details, Event, EventDraft, EventId, EventKind, Severity};
use crate::reports::AuditStats;
use crate::store::EventFilter;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An audit record as supplied by the caller
///
/// Severity and category come from the classifier unless `severity` is set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuditEntry {
    #[serde(default)]
    pub actor: Option<String>,
    pub action: String,
    pub resource: String,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub details: Details,
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl AuditEntry {
    pub fn new(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            actor: None,
            action: action.into(),
            resource: resource.into(),
            resource_id: None,
            details: Details::new(),
            severity: None,
            session_id: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }

    fn into_draft(self) -> EventDraft {
        let classification = classify_audit(&self.action, &self.resource);
        let mut details = self.details;
        if let Some(resource_id) = self.resource_id {
            details.insert("resource_id".to_string(), Value::String(resource_id));
        }

        let mut draft = EventDraft::new(
            EventKind::Audit,
            self.action,
            self.resource,
            self.severity.unwrap_or(classification.severity),
            classification.category,
        )
        .with_actor(self.actor)
        .with_details(details);
        draft.session_id = self.session_id;
        draft.ip_address = self.ip_address;
        draft.user_agent = self.user_agent;
        draft
    }
}

impl Pipeline {
    /// Record an audit event
    ///
    /// Returns `None` when recording is disabled.
    pub fn log_event(&mut self, entry: AuditEntry) -> Option<EventId> {
        self.record(entry.into_draft())
    }

    pub fn log_login(&mut self, actor: &str) -> Option<EventId> {
        self.log_event(AuditEntry::new("login", "auth").with_actor(actor))
    }

    pub fn log_logout(&mut self, actor: &str) -> Option<EventId> {
        self.log_event(AuditEntry::new("logout", "auth").with_actor(actor))
    }

    /// Record a failed login; nobody is authenticated, so there is no actor
    pub fn log_failed_login(&mut self, attempted_identity: &str, reason: &str) -> Option<EventId> {
        self.log_event(
            AuditEntry::new("failed_login", "auth")
                .with_detail("attempted_identity", attempted_identity)
                .with_detail("reason", reason),
        )
    }

    pub fn log_data_access(
        &mut self,
        actor: &str,
        resource: &str,
        resource_id: &str,
    ) -> Option<EventId> {
        self.log_event(
            AuditEntry::new("view", resource)
                .with_actor(actor)
                .with_resource_id(resource_id),
        )
    }

    /// Record a change to a resource with its before and after values
    pub fn log_data_modification(
        &mut self,
        actor: &str,
        action: &str,
        resource: &str,
        resource_id: &str,
        old_value: Option<Value>,
        new_value: Option<Value>,
    ) -> Option<EventId> {
        let mut entry = AuditEntry::new(action, resource)
            .with_actor(actor)
            .with_resource_id(resource_id);
        if let Some(old_value) = old_value {
            entry = entry.with_detail("old_value", old_value);
        }
        if let Some(new_value) = new_value {
            entry = entry.with_detail("new_value", new_value);
        }
        self.log_event(entry)
    }

    /// Record a security event; these always rank critical
    pub fn log_security_event(
        &mut self,
        actor: Option<&str>,
        description: &str,
        details: Details,
    ) -> Option<EventId> {
        let mut entry = AuditEntry::new("security_event", "security")
            .with_detail("description", description);
        entry.actor = actor.map(str::to_string);
        entry.details.extend(details);
        self.log_event(entry)
    }

    /// Audit events matching `filter`, newest first
    pub fn audit_events(&self, filter: &EventFilter) -> Vec<Event> {
        let filter = EventFilter {
            kind: Some(EventKind::Audit),
            ..filter.clone()
        };
        self.store.query(&filter)
    }

    pub fn audit_stats(&self) -> AuditStats {
        AuditStats::compute(self.store.iter(), self.clock.now())
    }
}
