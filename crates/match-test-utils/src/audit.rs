//! Audit sink stand-in that records forwarded data.

use async_trait::async_trait;
use match_controller::audit::{AuditSink, SessionEndedEvent};
use match_controller::errors::MatchError;
use match_controller::models::SessionData;
use std::sync::{Arc, Mutex};

/// Audit sink that records everything forwarded to it.
#[derive(Debug, Default)]
pub struct RecordingAuditSink {
    sessions: Arc<Mutex<Vec<SessionData>>>,
    ended: Arc<Mutex<Vec<SessionEndedEvent>>>,
}

impl RecordingAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalized sessions forwarded so far.
    #[must_use]
    pub fn recorded_sessions(&self) -> Vec<SessionData> {
        self.sessions.lock().unwrap().clone()
    }

    /// Session-ended events forwarded so far.
    #[must_use]
    pub fn ended_events(&self) -> Vec<SessionEndedEvent> {
        self.ended.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record_sessions(&self, sessions: &[SessionData]) -> Result<(), MatchError> {
        self.sessions.lock().unwrap().extend_from_slice(sessions);
        Ok(())
    }

    async fn record_session_end(&self, event: &SessionEndedEvent) -> Result<(), MatchError> {
        self.ended.lock().unwrap().push(event.clone());
        Ok(())
    }
}
