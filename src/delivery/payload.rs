//! Request bodies for alert webhooks and the audit sink

use crate::delivery::OutboundRequest;
use crate::error::DeliveryError;
use crate::events::{Event, Timestamp};
use crate::rules::AlertFiring;
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};

/// JSON body POSTed to a rule's webhook when it fires
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WebhookPayload {
    /// Name of the rule that fired
    pub alert: String,
    pub description: String,
    /// Events inside the rule's window, oldest first
    pub events: Vec<Event>,
    /// RFC 3339 time of delivery
    pub timestamp: String,
}

impl WebhookPayload {
    pub fn from_firing(firing: &AlertFiring, now: Timestamp) -> Self {
        Self {
            alert: firing.rule_name.clone(),
            description: firing.description.clone(),
            events: firing.window_events.clone(),
            timestamp: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Build the webhook request for a fired rule
pub fn webhook_request(
    firing: &AlertFiring,
    url: &str,
    now: Timestamp,
) -> Result<OutboundRequest, DeliveryError> {
    let body = serde_json::to_value(WebhookPayload::from_firing(firing, now))?;
    Ok(OutboundRequest {
        url: url.to_string(),
        body,
        bearer_token: None,
    })
}

/// Build the audit sink request carrying the raw event
pub fn audit_sink_request(
    event: &Event,
    endpoint: &str,
    token: Option<&str>,
) -> Result<OutboundRequest, DeliveryError> {
    Ok(OutboundRequest {
        url: endpoint.to_string(),
        body: serde_json::to_value(event)?,
        bearer_token: token.map(str::to_string),
    })
}
