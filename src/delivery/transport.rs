use crate::error::DeliveryError;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A JSON POST waiting to be delivered
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutboundRequest {
    pub url: String,
    pub body: serde_json::Value,
    /// Sent as `Authorization: Bearer <token>` when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bearer_token: Option<String>,
}

/// Trait for HTTP delivery implementations
pub trait HttpTransport: Send + Sync {
    fn post_json<'a>(
        &'a self,
        request: &'a OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>>;
}

/// Transport backed by a shared `reqwest` client
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout`
    ///
    /// # Errors
    ///
    /// Returns `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn post_json<'a>(
        &'a self,
        request: &'a OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>> {
        Box::pin(async move {
            let mut builder = self.client.post(&request.url).json(&request.body);
            if let Some(token) = &request.bearer_token {
                builder = builder.bearer_auth(token);
            }

            let response = builder.send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(DeliveryError::Status {
                    url: request.url.clone(),
                    status: status.as_u16(),
                });
            }

            debug!("Delivered payload to {} ({})", request.url, status);
            Ok(())
        })
    }
}

/// Mock transport for testing
///
/// Records every request and answers with a 503 for the first
/// `failures` calls, then succeeds.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    requests: Arc<Mutex<Vec<OutboundRequest>>>,
    remaining_failures: Arc<Mutex<usize>>,
}

impl MockTransport {
    /// A transport that accepts every request
    pub fn success() -> Self {
        Self::default()
    }

    /// A transport that fails the first `failures` requests
    pub fn failing(failures: usize) -> Self {
        Self {
            requests: Arc::default(),
            remaining_failures: Arc::new(Mutex::new(failures)),
        }
    }

    /// A transport that never succeeds
    pub fn always_failing() -> Self {
        Self::failing(usize::MAX)
    }

    /// Every request seen so far, successful or not
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl HttpTransport for MockTransport {
    fn post_json<'a>(
        &'a self,
        request: &'a OutboundRequest,
    ) -> Pin<Box<dyn Future<Output = Result<(), DeliveryError>> + Send + 'a>> {
        Box::pin(async move {
            self.requests
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(request.clone());

            let mut remaining = self
                .remaining_failures
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DeliveryError::Status {
                    url: request.url.clone(),
                    status: 503,
                });
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> OutboundRequest {
        OutboundRequest {
            url: "https://hooks.example.com/alerts".to_string(),
            body: json!({"alert": "test"}),
            bearer_token: None,
        }
    }

    #[tokio::test]
    async fn test_mock_transport_records_requests() {
        let transport = MockTransport::success();

        transport.post_json(&request()).await.unwrap();
        transport.post_json(&request()).await.unwrap();

        assert_eq!(transport.call_count(), 2);
        assert_eq!(transport.requests()[0], request());
    }

    #[tokio::test]
    async fn test_mock_transport_fails_then_succeeds() {
        let transport = MockTransport::failing(1);

        let first = transport.post_json(&request()).await;
        assert!(matches!(
            first,
            Err(DeliveryError::Status { status: 503, .. })
        ));
        assert!(transport.post_json(&request()).await.is_ok());
    }

    #[tokio::test]
    async fn test_reqwest_transport_reports_connection_errors() {
        let transport = ReqwestTransport::new(Duration::from_millis(500)).unwrap();
        let unreachable = OutboundRequest {
            // port 9 (discard) on localhost is closed in test environments
            url: "http://127.0.0.1:9/alerts".to_string(),
            ..request()
        };

        let result = transport.post_json(&unreachable).await;
        assert!(matches!(result, Err(DeliveryError::Http(_))));
    }

    #[test]
    fn test_outbound_request_serialization_skips_missing_token() {
        let value = serde_json::to_value(request()).unwrap();
        assert!(value.get("bearer_token").is_none());
    }
}
