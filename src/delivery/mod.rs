pub mod dispatcher;
pub mod payload;
pub mod retry;
pub mod transport;

pub use dispatcher::Dispatcher;
pub use payload::{audit_sink_request, webhook_request, WebhookPayload};
pub use retry::{retry, RetryPolicy, Retryable};
pub use transport::{HttpTransport, MockTransport, OutboundRequest, ReqwestTransport};
