use crate::error::RuleError;
use crate::events::{Event, Timestamp};
use crate::rules::{AlertAction, AlertRule, NewAlertRule, RuleId};
use crate::store::EventStore;
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Engine that decides which alert rules a new event fires
///
/// Rules carry no counters between evaluations; every evaluation recounts
/// the window from the store.
#[derive(Debug, Default)]
pub struct RuleEngine {
    rules: Vec<AlertRule>,
}

/// A rule that fired, with the events that made it fire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertFiring {
    pub rule_id: RuleId,
    pub rule_name: String,
    pub description: String,
    pub actions: Vec<AlertAction>,
    /// Number of matching events inside the window
    pub count: usize,
    /// Start of the evaluated window
    pub window_start: Timestamp,
    /// The event whose append triggered the evaluation
    pub triggered_by: Event,
    /// Matching events inside the window, oldest first
    pub window_events: Vec<Event>,
}

impl RuleEngine {
    /// Create a new rule engine with no rules
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Register a rule and return its id
    pub fn add_rule(&mut self, rule: NewAlertRule) -> Result<RuleId, RuleError> {
        rule.validate()?;
        let id = Uuid::new_v4();
        debug!("Registered alert rule '{}' ({})", rule.name, id);
        self.rules.push(AlertRule::from_new(id, rule));
        Ok(id)
    }

    /// Replace a rule's definition, keeping its id
    ///
    /// Returns `Ok(false)` when no rule has that id.
    pub fn update_rule(&mut self, id: &RuleId, rule: NewAlertRule) -> Result<bool, RuleError> {
        rule.validate()?;
        match self.rules.iter_mut().find(|existing| &existing.id == id) {
            Some(existing) => {
                *existing = AlertRule::from_new(*id, rule);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Remove a rule; returns whether it existed
    pub fn remove_rule(&mut self, id: &RuleId) -> bool {
        let before = self.rules.len();
        self.rules.retain(|rule| &rule.id != id);
        before != self.rules.len()
    }

    /// Enable or disable a rule; returns whether it existed
    pub fn set_rule_enabled(&mut self, id: &RuleId, enabled: bool) -> bool {
        match self.rules.iter_mut().find(|rule| &rule.id == id) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn rule(&self, id: &RuleId) -> Option<&AlertRule> {
        self.rules.iter().find(|rule| &rule.id == id)
    }

    pub fn rules(&self) -> &[AlertRule] {
        &self.rules
    }

    /// Get the number of configured rules
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Evaluate every enabled rule against a freshly appended event
    ///
    /// The window is `[event.timestamp - window, event.timestamp]` and counts
    /// stored events sharing the new event's action and resource, the new
    /// event included.
    pub fn evaluate(&self, event: &Event, store: &EventStore) -> Vec<AlertFiring> {
        let mut firings = Vec::new();

        for rule in self.rules.iter().filter(|rule| rule.enabled) {
            if !rule.conditions.matches(event) {
                continue;
            }

            let window_start = event.timestamp - rule.conditions.window();
            let window_events = store.window_events(
                &event.action,
                &event.resource,
                window_start,
                event.timestamp,
            );
            let count = window_events.len();

            if count >= rule.conditions.threshold {
                debug!(
                    "Rule '{}' fired: {} '{}' events on '{}' within {} minutes",
                    rule.name, count, event.action, event.resource, rule.conditions.window_minutes
                );
                firings.push(AlertFiring {
                    rule_id: rule.id,
                    rule_name: rule.name.clone(),
                    description: rule.description.clone(),
                    actions: rule.actions.clone(),
                    count,
                    window_start,
                    triggered_by: event.clone(),
                    window_events: window_events.into_iter().cloned().collect(),
                });
            }
        }

        firings
    }
}
