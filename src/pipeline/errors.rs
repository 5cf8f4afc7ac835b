use super::Pipeline;
use crate::alerts::Notification;
use crate::classifier::{classify, CapturedError, ErrorContext};
use crate::events::{Details, Event, EventDraft, EventId, EventKind, Resolution, Severity};
use crate::reports::ErrorStats;
use crate::resolution::ErrorReportBook;
use crate::store::{EventFilter, ResolveOutcome};
use log::{debug, error, info, warn};
use serde_json::Value;

/// Resource recorded for errors that did not happen on a known page
const DEFAULT_ERROR_RESOURCE: &str = "application";

impl Pipeline {
    /// Classify and record a captured error
    ///
    /// High and critical errors also raise a notification. Returns `None`
    /// when recording is disabled.
    pub fn capture_error(&mut self, captured: CapturedError, context: ErrorContext) -> Option<EventId> {
        let classification = classify(&captured, &context);

        let mut details = Details::new();
        details.insert("message".to_string(), Value::String(captured.message.clone()));
        if let Some(stack) = &captured.stack {
            details.insert("stack".to_string(), Value::String(stack.clone()));
        }
        if let Some(status) = context.status {
            details.insert("status".to_string(), Value::from(status));
        }
        if let Some(component_stack) = &context.component_stack {
            details.insert(
                "component_stack".to_string(),
                Value::String(component_stack.clone()),
            );
        }
        for (key, value) in context.extra {
            details.entry(key).or_insert(value);
        }

        let draft = EventDraft::new(
            EventKind::Error,
            captured.name.clone(),
            context
                .url
                .unwrap_or_else(|| DEFAULT_ERROR_RESOURCE.to_string()),
            classification.severity,
            classification.category,
        )
        .with_actor(context.actor)
        .with_details(details);

        let id = self.record(draft)?;
        if let Some(event) = self.store.get(&id) {
            self.error_reports.record(event);
        }

        let title = match classification.severity {
            Severity::Critical => Some("Critical error"),
            Severity::High => Some("Error"),
            _ => None,
        };
        if let Some(title) = title {
            let notification = Notification {
                severity: classification.severity,
                title: format!("{}: {}", title, captured.name),
                body: captured.message,
                created_at: self.clock.now(),
            };
            if let Err(e) = self.notifications.submit(notification) {
                error!("Failed to notify about captured error {}: {}", id, e);
            }
        }

        Some(id)
    }

    /// Record a failed HTTP call
    pub fn capture_network_error(
        &mut self,
        url: &str,
        status: u16,
        status_text: &str,
        actor: Option<&str>,
    ) -> Option<EventId> {
        let captured = CapturedError::new(
            "NetworkError",
            format!("HTTP {} {} for {}", status, status_text, url),
        );
        let context = ErrorContext::network(status)
            .with_url(url)
            .with_actor(actor.map(str::to_string));
        self.capture_error(captured, context)
    }

    /// Record a rejected form field
    pub fn capture_validation_error(
        &mut self,
        field: &str,
        message: &str,
        actor: Option<&str>,
    ) -> Option<EventId> {
        let captured = CapturedError::new("ValidationError", format!("{}: {}", field, message));
        let mut context = ErrorContext::validation().with_actor(actor.map(str::to_string));
        context
            .extra
            .insert("field".to_string(), Value::String(field.to_string()));
        self.capture_error(captured, context)
    }

    /// Mark a captured error resolved
    ///
    /// Unknown ids and audit events are ignored. The first resolution wins:
    /// resolving again keeps the original text and resolver.
    pub fn resolve_error(&mut self, id: &EventId, resolution: &str, resolved_by: &str) -> ResolveOutcome {
        let outcome = self.store.resolve(
            id,
            Resolution {
                note: resolution.to_string(),
                assigned_to: resolved_by.to_string(),
                resolved_at: self.clock.now(),
            },
        );

        match outcome {
            ResolveOutcome::Resolved => {
                if let Some(event) = self.store.get(id) {
                    self.error_reports.mark_resolved(event);
                }
                info!("Error {} resolved by {}", id, resolved_by);
            }
            ResolveOutcome::AlreadyResolved => debug!("Error {} was already resolved", id),
            ResolveOutcome::NotFound => warn!("No captured error with id {}", id),
        }
        outcome
    }

    /// Error events matching `filter`, newest first
    pub fn get_errors(&self, filter: &EventFilter) -> Vec<Event> {
        let filter = EventFilter {
            kind: Some(EventKind::Error),
            ..filter.clone()
        };
        self.store.query(&filter)
    }

    pub fn error_reports(&self) -> &ErrorReportBook {
        &self.error_reports
    }

    pub fn error_stats(&self) -> ErrorStats {
        ErrorStats::compute(self.store.iter(), self.clock.now())
    }
}
