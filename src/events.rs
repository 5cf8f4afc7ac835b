//! Core event types for the audit and error pipeline
//!
//! Audit events and captured errors share one record shape so the store, the
//! rule engine and the report aggregator can treat them uniformly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Identifier assigned to every event at append time
pub type EventId = Uuid;

/// Open key/value payload attached to an event
pub type Details = serde_json::Map<String, serde_json::Value>;

/// Which half of the pipeline produced an event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// User or system activity recorded for the audit trail
    Audit,
    /// Captured application error
    Error,
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audit" => Ok(EventKind::Audit),
            "error" => Ok(EventKind::Error),
            other => Err(format!("unknown event kind '{}'", other)),
        }
    }
}

/// Severity rank of an event
///
/// The derived ordering is the rank order: `Low < Medium < High < Critical`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities in rank order
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Whether this severity ranks at or above `threshold`
    pub fn at_least(&self, threshold: Severity) -> bool {
        *self >= threshold
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Severity::ALL
            .into_iter()
            .find(|severity| severity.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown severity '{}'", s))
    }
}

/// Subject area an event is classified into
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Authentication,
    Authorization,
    DataAccess,
    DataModification,
    System,
    Security,
    Network,
    Validation,
    Database,
    Runtime,
    Unknown,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Authentication => "authentication",
            Category::Authorization => "authorization",
            Category::DataAccess => "data_access",
            Category::DataModification => "data_modification",
            Category::System => "system",
            Category::Security => "security",
            Category::Network => "network",
            Category::Validation => "validation",
            Category::Database => "database",
            Category::Runtime => "runtime",
            Category::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution metadata attached to an error event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resolution {
    /// Free-text description of the fix
    pub note: String,
    /// Who resolved the error
    pub assigned_to: String,
    /// When the resolution was recorded
    pub resolved_at: Timestamp,
}

/// A recorded audit or error event
///
/// Everything except `resolved` and `resolution` is fixed once the store has
/// appended the event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    pub kind: EventKind,
    /// Originating user or session, absent for system events
    pub actor: Option<String>,
    pub action: String,
    pub resource: String,
    pub category: Category,
    pub severity: Severity,
    #[serde(default)]
    pub details: Details,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub resolved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl Event {
    /// Error message carried in the details payload, if any
    pub fn message(&self) -> Option<&str> {
        self.details.get("message").and_then(|value| value.as_str())
    }

    pub fn is_error(&self) -> bool {
        self.kind == EventKind::Error
    }
}

/// Caller-supplied part of an event; the store fills in id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    pub kind: EventKind,
    pub actor: Option<String>,
    pub action: String,
    pub resource: String,
    pub category: Category,
    pub severity: Severity,
    pub details: Details,
    pub session_id: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl EventDraft {
    pub fn new(
        kind: EventKind,
        action: impl Into<String>,
        resource: impl Into<String>,
        severity: Severity,
        category: Category,
    ) -> Self {
        Self {
            kind,
            actor: None,
            action: action.into(),
            resource: resource.into(),
            category,
            severity,
            details: Details::new(),
            session_id: None,
            ip_address: None,
            user_agent: None,
        }
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }

    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    /// Turn the draft into a stored event
    pub(crate) fn into_event(self, id: EventId, timestamp: Timestamp) -> Event {
        Event {
            id,
            timestamp,
            kind: self.kind,
            actor: self.actor,
            action: self.action,
            resource: self.resource,
            category: self.category,
            severity: self.severity,
            details: self.details,
            session_id: self.session_id,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
            resolved: false,
            resolution: None,
        }
    }
}
