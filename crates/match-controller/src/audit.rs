//! Durable-audit collaborator contract.
//!
//! Finalized sessions and session-ended events are forwarded to an external
//! audit store for long-term persistence and logging. Forwards are
//! asynchronous and best-effort: a failure is logged and never rolls back
//! the ephemeral write. Retry policy belongs to the sink implementation,
//! not to this core.

use crate::errors::MatchError;
use crate::models::SessionData;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Signal published when a session is torn down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEndedEvent {
    pub session_id: String,
    /// Epoch millis at finalization.
    pub started_at: i64,
    /// Epoch millis at teardown.
    pub ended_at: i64,
}

/// Best-effort sink for session audit data.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Accept a batch of finalized sessions.
    async fn record_sessions(&self, sessions: &[SessionData]) -> Result<(), MatchError>;

    /// Accept a session-ended event.
    async fn record_session_end(&self, event: &SessionEndedEvent) -> Result<(), MatchError>;
}

/// Sink that logs audit data instead of persisting it.
///
/// Used by the binary when no durable store is wired in.
#[derive(Debug, Default, Clone)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record_sessions(&self, sessions: &[SessionData]) -> Result<(), MatchError> {
        info!(
            target: "mm.audit",
            count = sessions.len(),
            "Recorded finalized sessions"
        );
        Ok(())
    }

    async fn record_session_end(&self, event: &SessionEndedEvent) -> Result<(), MatchError> {
        info!(
            target: "mm.audit",
            session_id = %event.session_id,
            duration_ms = event.ended_at.saturating_sub(event.started_at),
            "Session ended"
        );
        Ok(())
    }
}
