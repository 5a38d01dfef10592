//! Signaling Relay: best-effort point-to-point delivery.
//!
//! Wraps the push transport with the two delivery shapes the core needs:
//! match results and WebRTC signaling messages. Delivery never blocks the
//! caller on retries and never retries - a transport failure is logged and
//! swallowed; signaling is lossy-tolerant above this layer.
//!
//! Partner validation happens one level up, in the composed service; this
//! relay only addresses and delivers.

use crate::models::{MatchingResult, OutboundMessage, SignalingMessage};
use crate::transport::PushTransport;
use std::sync::Arc;
use tracing::{debug, warn};

/// Best-effort relay over the push transport.
pub struct SignalingRelay {
    transport: Arc<dyn PushTransport>,
}

impl SignalingRelay {
    #[must_use]
    pub fn new(transport: Arc<dyn PushTransport>) -> Self {
        Self { transport }
    }

    /// Deliver a matching result to exactly one addressed recipient.
    pub async fn send_matching_result(&self, external_id: &str, result: MatchingResult) {
        let status = result.status;
        let message = OutboundMessage::MatchingResult(result);

        match self.transport.deliver(external_id, &message).await {
            Ok(()) => {
                debug!(
                    target: "mm.relay",
                    external_id = %external_id,
                    status = ?status,
                    "Delivered matching result"
                );
            }
            Err(e) => {
                warn!(
                    target: "mm.relay",
                    error = %e,
                    external_id = %external_id,
                    status = ?status,
                    "Failed to deliver matching result"
                );
            }
        }
    }

    /// Stamp the server-verified sender id, then deliver the signaling
    /// message to its receiver.
    pub async fn send_signaling_message(&self, sender_id: &str, mut message: SignalingMessage) {
        message.sender_id = sender_id.to_string();
        let receiver_id = message.receiver_id.clone();
        let signal_type = message.signal_type;
        let envelope = OutboundMessage::Signaling(message);

        match self.transport.deliver(&receiver_id, &envelope).await {
            Ok(()) => {
                debug!(
                    target: "mm.relay",
                    sender_id = %sender_id,
                    receiver_id = %receiver_id,
                    signal_type = ?signal_type,
                    "Relayed signaling message"
                );
            }
            Err(e) => {
                warn!(
                    target: "mm.relay",
                    error = %e,
                    sender_id = %sender_id,
                    receiver_id = %receiver_id,
                    "Failed to relay signaling message"
                );
            }
        }
    }
}
