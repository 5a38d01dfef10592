//! Push transport stand-in that records deliveries.

use async_trait::async_trait;
use match_controller::errors::MatchError;
use match_controller::models::OutboundMessage;
use match_controller::transport::PushTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Transport that captures every delivery for assertions, and can inject
/// delivery failures.
#[derive(Debug, Default)]
pub struct CapturingTransport {
    sent: Arc<Mutex<Vec<(String, OutboundMessage)>>>,
    failing: AtomicBool,
}

impl CapturingTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent delivery fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Everything delivered so far, in order, as (recipient, message).
    #[must_use]
    pub fn all_sent(&self) -> Vec<(String, OutboundMessage)> {
        self.sent.lock().unwrap().clone()
    }

    /// Messages delivered to one recipient, in order.
    #[must_use]
    pub fn sent_to(&self, external_id: &str) -> Vec<OutboundMessage> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(recipient, _)| recipient == external_id)
            .map(|(_, message)| message.clone())
            .collect()
    }
}

#[async_trait]
impl PushTransport for CapturingTransport {
    async fn deliver(
        &self,
        external_id: &str,
        message: &OutboundMessage,
    ) -> Result<(), MatchError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MatchError::Transport(
                "injected transport failure".to_string(),
            ));
        }

        self.sent
            .lock()
            .unwrap()
            .push((external_id.to_string(), message.clone()));
        Ok(())
    }
}
