//! Alert rule definitions
//!
//! A rule names the events it watches, how many of them inside a sliding
//! window make it fire, and what to do when it does.

use crate::error::RuleError;
use crate::events::{Event, Severity};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier assigned to a rule when it is registered
pub type RuleId = Uuid;

/// Equality predicates and window parameters of a rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuleConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Number of matching events inside the window that fires the rule
    pub threshold: usize,
    /// Length of the sliding window in minutes
    pub window_minutes: u32,
}

impl RuleConditions {
    /// Whether the event satisfies every configured predicate
    pub fn matches(&self, event: &Event) -> bool {
        self.action.as_ref().map_or(true, |a| a == &event.action)
            && self.resource.as_ref().map_or(true, |r| r == &event.resource)
            && self.severity.map_or(true, |s| s == event.severity)
    }

    pub fn window(&self) -> Duration {
        Duration::minutes(self.window_minutes as i64)
    }
}

/// Side effect executed when a rule fires
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertAction {
    /// POST the alert to an HTTP endpoint
    Webhook { url: String },
    /// Raise a user-visible notification
    Notify,
    /// Write the alert to the application log
    Log,
}

/// A rule as supplied by configuration or an API caller, before it has an id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAlertRule {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub conditions: RuleConditions,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub actions: Vec<AlertAction>,
}

fn default_enabled() -> bool {
    true
}

impl NewAlertRule {
    /// Check thresholds, window and webhook URLs
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.conditions.threshold == 0 {
            return Err(RuleError::InvalidThreshold(self.name.clone()));
        }
        if self.conditions.window_minutes == 0 {
            return Err(RuleError::InvalidWindow(self.name.clone()));
        }

        for action in &self.actions {
            if let AlertAction::Webhook { url } = action {
                let valid = reqwest::Url::parse(url)
                    .map(|parsed| matches!(parsed.scheme(), "http" | "https"))
                    .unwrap_or(false);
                if !valid {
                    return Err(RuleError::InvalidWebhookUrl {
                        rule: self.name.clone(),
                        url: url.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// A registered alert rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRule {
    pub id: RuleId,
    pub name: String,
    pub description: String,
    pub conditions: RuleConditions,
    pub enabled: bool,
    /// Distinct actions, in the order they were declared
    pub actions: Vec<AlertAction>,
}

impl AlertRule {
    pub(crate) fn from_new(id: RuleId, rule: NewAlertRule) -> Self {
        let mut actions: Vec<AlertAction> = Vec::with_capacity(rule.actions.len());
        for action in rule.actions {
            if !actions.contains(&action) {
                actions.push(action);
            }
        }

        Self {
            id,
            name: rule.name,
            description: rule.description,
            conditions: rule.conditions,
            enabled: rule.enabled,
            actions,
        }
    }
}
