//! The pipeline context
//!
//! A [`Pipeline`] owns every piece of the audit and error pipeline: the
//! event store, the alert rules, the aggregate error reports, the
//! notification center and the delivery dispatcher. Hosts build one at
//! start-up from [`Config`] and pass it to whatever records events.
//!
//! Recording is synchronous. Outbound HTTP deliveries are spawned onto the
//! tokio runtime and never awaited by the recording call; hosts call
//! [`Pipeline::flush_deliveries`] before shutting down.

mod audit;
mod errors;

pub use audit::AuditEntry;

use crate::alerts::{LogNotifier, Notification, NotificationCenter, Notifier};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::delivery::{
    audit_sink_request, webhook_request, Dispatcher, HttpTransport, ReqwestTransport,
};
use crate::error::{ConfigError, ExportError, RuleError};
use crate::events::{Event, EventDraft, EventId, EventKind, Severity};
use crate::reports::{export_events, ExportFormat, Report};
use crate::resolution::ErrorReportBook;
use crate::rules::{AlertAction, AlertFiring, AlertRule, NewAlertRule, RuleEngine, RuleId};
use crate::store::{EventFilter, EventStore};
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Where critical audit events are forwarded
#[derive(Debug, Clone)]
struct AuditSink {
    endpoint: String,
    token: Option<String>,
}

/// Builder for [`Pipeline`]
///
/// Defaults to the system clock, a `reqwest` transport configured from the
/// delivery section and the [`LogNotifier`].
pub struct PipelineBuilder {
    config: Config,
    clock: Arc<dyn Clock>,
    transport: Option<Arc<dyn HttpTransport>>,
    notifier: Arc<dyn Notifier>,
}

impl PipelineBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            transport: None,
            notifier: Arc::new(LogNotifier),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Validate the configuration and assemble the pipeline
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration or one of its rules is
    /// invalid, or if the HTTP client cannot be created.
    pub fn build(self) -> Result<Pipeline, ConfigError> {
        let config = self.config;
        config.validate()?;

        let transport: Arc<dyn HttpTransport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new(config.delivery.timeout())?),
        };

        let mut store = EventStore::new(Arc::clone(&self.clock));
        store.set_enabled(config.store.enabled);

        let mut rules = RuleEngine::new();
        for rule in config.rules {
            rules.add_rule(rule)?;
        }

        let notifications = NotificationCenter::new(self.notifier, Arc::clone(&self.clock))
            .with_rate_limit(config.notifications.rate_limit_per_minute)
            .with_queue_size(config.notifications.max_queue_size)
            .with_min_severity(config.notifications.min_severity);

        let audit_sink = config.delivery.audit_endpoint.map(|endpoint| AuditSink {
            endpoint,
            token: config.delivery.audit_token,
        });

        info!(
            "Pipeline ready: {} alert rules, audit sink {}",
            rules.rule_count(),
            if audit_sink.is_some() { "configured" } else { "disabled" }
        );

        Ok(Pipeline {
            store,
            rules,
            error_reports: ErrorReportBook::new(),
            notifications,
            dispatcher: Dispatcher::new(transport, config.delivery.retry),
            audit_sink,
            retention: config.store.retention(),
            clock: self.clock,
        })
    }
}

/// The audit and error pipeline
#[derive(Debug)]
pub struct Pipeline {
    store: EventStore,
    rules: RuleEngine,
    error_reports: ErrorReportBook,
    notifications: NotificationCenter,
    dispatcher: Dispatcher,
    audit_sink: Option<AuditSink>,
    /// Age used by [`Pipeline::cleanup`]
    retention: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    /// Build a pipeline from configuration with the default collaborators
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        PipelineBuilder::new(config.clone()).build()
    }

    pub fn builder(config: Config) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    /// Append a draft and run everything that follows an append
    ///
    /// Only critical audit events go to the audit endpoint; critical errors
    /// raise a notification from `capture_error` instead. Rule actions and
    /// deliveries never fail the append; their errors are logged.
    fn record(&mut self, draft: EventDraft) -> Option<EventId> {
        let id = self.store.append(draft)?;
        let event = self.store.get(&id)?.clone();
        debug!(
            "Recorded {} event '{}' on '{}' ({})",
            event.severity, event.action, event.resource, event.id
        );

        for firing in self.rules.evaluate(&event, &self.store) {
            self.execute_actions(&firing);
        }

        if event.kind == EventKind::Audit && event.severity == Severity::Critical {
            self.forward_to_audit_sink(&event);
        }

        Some(id)
    }

    /// Run every action of a fired rule, each independently of the others
    fn execute_actions(&mut self, firing: &AlertFiring) {
        for action in &firing.actions {
            match action {
                AlertAction::Webhook { url } => {
                    match webhook_request(firing, url, self.clock.now()) {
                        Ok(request) => {
                            self.dispatcher.dispatch("alert webhook", request);
                        }
                        Err(e) => error!(
                            "Failed to build webhook for alert '{}': {}",
                            firing.rule_name, e
                        ),
                    }
                }
                AlertAction::Notify => {
                    let notification = Notification {
                        severity: firing.triggered_by.severity,
                        title: format!("Alert: {}", firing.rule_name),
                        body: alert_summary(firing),
                        created_at: self.clock.now(),
                    };
                    if let Err(e) = self.notifications.submit(notification) {
                        error!("Failed to notify for alert '{}': {}", firing.rule_name, e);
                    }
                }
                AlertAction::Log => {
                    warn!("Alert '{}' fired: {}", firing.rule_name, alert_summary(firing));
                }
            }
        }
    }

    fn forward_to_audit_sink(&mut self, event: &Event) {
        let Some(sink) = &self.audit_sink else {
            debug!("No audit endpoint configured, skipping event {}", event.id);
            return;
        };

        match audit_sink_request(event, &sink.endpoint, sink.token.as_deref()) {
            Ok(request) => {
                self.dispatcher.dispatch("audit event", request);
            }
            Err(e) => error!("Failed to encode audit event {}: {}", event.id, e),
        }
    }

    /// Events matching `filter`, newest first
    pub fn query(&self, filter: &EventFilter) -> Vec<Event> {
        self.store.query(filter)
    }

    pub fn event(&self, id: &EventId) -> Option<&Event> {
        self.store.get(id)
    }

    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Build a report over the events matching `query`
    pub fn generate_report(
        &self,
        title: &str,
        description: &str,
        query: EventFilter,
        generated_by: &str,
    ) -> Report {
        let report = Report::generate(&self.store, title, description, query, generated_by);
        info!(
            "Generated report '{}' over {} events",
            report.title, report.summary.total_events
        );
        report
    }

    /// Export the events matching `query`
    pub fn export_events(
        &self,
        query: &EventFilter,
        format: ExportFormat,
    ) -> Result<String, ExportError> {
        export_events(&self.store.query(query), format)
    }

    /// Apply the configured retention period
    pub fn cleanup(&mut self) -> usize {
        self.cleanup_older_than(self.retention)
    }

    /// Remove every event older than `max_age`
    ///
    /// Error reports not seen within `max_age` go with them. Returns the
    /// number of events removed.
    pub fn cleanup_older_than(&mut self, max_age: chrono::Duration) -> usize {
        let removed = self.store.cleanup(max_age);
        if removed > 0 {
            info!("Removed {} events past retention", removed);
        }

        if let Some(cutoff) = self.clock.now().checked_sub_signed(max_age) {
            let pruned = self.error_reports.prune_before(cutoff);
            if pruned > 0 {
                info!("Removed {} error reports past retention", pruned);
            }
        }
        removed
    }

    /// Turn recording on or off; disabled pipelines ignore new events
    pub fn set_enabled(&mut self, enabled: bool) {
        info!("Event recording {}", if enabled { "enabled" } else { "disabled" });
        self.store.set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_enabled()
    }

    pub fn add_rule(&mut self, rule: NewAlertRule) -> Result<RuleId, RuleError> {
        self.rules.add_rule(rule)
    }

    pub fn update_rule(&mut self, id: &RuleId, rule: NewAlertRule) -> Result<bool, RuleError> {
        self.rules.update_rule(id, rule)
    }

    pub fn remove_rule(&mut self, id: &RuleId) -> bool {
        self.rules.remove_rule(id)
    }

    pub fn set_rule_enabled(&mut self, id: &RuleId, enabled: bool) -> bool {
        self.rules.set_rule_enabled(id, enabled)
    }

    pub fn rules(&self) -> &[AlertRule] {
        self.rules.rules()
    }

    /// Deliver notifications the rate limit held back
    pub fn tick_notifications(&mut self) -> usize {
        match self.notifications.tick() {
            Ok(delivered) => delivered,
            Err(e) => {
                error!("Failed to deliver queued notifications: {}", e);
                0
            }
        }
    }

    pub fn queued_notifications(&self) -> usize {
        self.notifications.queued_count()
    }

    /// Wait for all outbound deliveries started so far
    pub async fn flush_deliveries(&mut self) -> usize {
        self.dispatcher.flush().await
    }

    pub fn pending_deliveries(&self) -> usize {
        self.dispatcher.pending()
    }
}

fn alert_summary(firing: &AlertFiring) -> String {
    format!(
        "{} '{}' events on '{}' since {}",
        firing.count,
        firing.triggered_by.action,
        firing.triggered_by.resource,
        firing.window_start.to_rfc3339()
    )
}
