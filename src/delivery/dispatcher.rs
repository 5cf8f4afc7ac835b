use crate::delivery::{retry, HttpTransport, OutboundRequest, RetryPolicy};
use log::{debug, error, warn};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Fire-and-forget delivery of outbound requests
///
/// Each request is sent on its own tokio task so recording an event never
/// waits on the network. Failures are logged and never reach the caller.
/// `flush()` waits for everything dispatched so far, which hosts call
/// before exiting.
pub struct Dispatcher {
    transport: Arc<dyn HttpTransport>,
    retry: RetryPolicy,
    pending: Vec<JoinHandle<()>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("retry", &self.retry)
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn HttpTransport>, retry: RetryPolicy) -> Self {
        Self {
            transport,
            retry,
            pending: Vec::new(),
        }
    }

    /// Send `request` in the background
    ///
    /// Returns `false` when no tokio runtime is available, in which case the
    /// request is dropped with a warning.
    pub fn dispatch(&mut self, label: &str, request: OutboundRequest) -> bool {
        let runtime = match Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime available, dropping {} for {}", label, request.url);
                return false;
            }
        };

        // finished tasks need no flushing
        self.pending.retain(|handle| !handle.is_finished());

        let transport = Arc::clone(&self.transport);
        let policy = self.retry.clone();
        let label = label.to_string();

        let handle = runtime.spawn(async move {
            let transport = &*transport;
            let outbound = &request;
            match retry(&policy, move |_| transport.post_json(outbound)).await {
                Ok(()) => debug!("Delivered {} to {}", label, outbound.url),
                Err(e) => error!("Failed to deliver {} to {}: {}", label, outbound.url, e),
            }
        });
        self.pending.push(handle);
        true
    }

    /// Wait for every dispatched request to finish
    ///
    /// Returns the number of deliveries that were awaited.
    pub async fn flush(&mut self) -> usize {
        let handles: Vec<JoinHandle<()>> = self.pending.drain(..).collect();
        let count = handles.len();

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Delivery task failed: {}", e);
            }
        }
        count
    }

    /// Number of deliveries that may still be in flight
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}
