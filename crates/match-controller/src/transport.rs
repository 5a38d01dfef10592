//! Real-time push transport contract.
//!
//! The core never talks to clients directly; everything it pushes (match
//! results, relayed signaling) goes through [`PushTransport`], implemented
//! by the deployment's real-time gateway (WebSocket fan-out, message broker,
//! etc.). The contract is deliberately small: deliver one message to one
//! addressed recipient.

use crate::errors::MatchError;
use crate::models::OutboundMessage;
use async_trait::async_trait;
use tracing::debug;

/// Point-to-point delivery to a connected client.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Deliver `message` to the client addressed by `external_id`.
    ///
    /// # Errors
    ///
    /// Returns `MatchError::Transport` when delivery fails (recipient gone,
    /// gateway unreachable). The relay logs and swallows these.
    async fn deliver(&self, external_id: &str, message: &OutboundMessage)
        -> Result<(), MatchError>;
}

/// Transport that logs deliveries instead of pushing them anywhere.
///
/// Used by the binary when no gateway is wired in, and useful in local
/// development to watch the relay's output.
#[derive(Debug, Default, Clone)]
pub struct TracingPushTransport;

#[async_trait]
impl PushTransport for TracingPushTransport {
    async fn deliver(
        &self,
        external_id: &str,
        message: &OutboundMessage,
    ) -> Result<(), MatchError> {
        debug!(
            target: "mm.transport",
            external_id = %external_id,
            message = ?message,
            "Delivering outbound message"
        );
        Ok(())
    }
}
