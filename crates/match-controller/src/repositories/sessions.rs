//! Session Registry: ephemeral sessionId <-> participants mapping.
//!
//! Sessions live in the shared ephemeral store under a fixed TTL, with one
//! back-reference record per participant so either side can resolve its
//! session by external id. Finalized sessions and teardown events are
//! forwarded asynchronously to the durable audit collaborator; the forward
//! is best-effort and never rolls back the ephemeral write.

use crate::audit::{AuditSink, SessionEndedEvent};
use crate::config::Config;
use crate::keys;
use crate::models::SessionData;
use crate::store::{EphemeralStore, StoreOp};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Session Registry over the shared ephemeral store.
pub struct SessionRepository {
    store: Arc<dyn EphemeralStore>,
    audit: Arc<dyn AuditSink>,
    session_ttl_seconds: u64,
    save_chunk_size: usize,
}

impl SessionRepository {
    #[must_use]
    pub fn new(
        store: Arc<dyn EphemeralStore>,
        audit: Arc<dyn AuditSink>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            audit,
            session_ttl_seconds: config.session_ttl_seconds,
            save_chunk_size: config.session_save_chunk_size,
        }
    }

    /// Persist finalized sessions.
    ///
    /// Input is chunked to a bounded batch size; each chunk writes the
    /// session record plus both participant back-references in one
    /// pipelined batch. The full list is then forwarded asynchronously to
    /// the audit sink. Returns `false` if any chunk's batch fails (chunks
    /// already written stay written).
    #[instrument(skip_all, fields(count = sessions.len()))]
    pub async fn save_sessions(&self, sessions: &[SessionData]) -> bool {
        if sessions.is_empty() {
            return true;
        }

        for chunk in sessions.chunks(self.save_chunk_size) {
            let mut ops = Vec::with_capacity(chunk.len() * 3);
            for session in chunk {
                let json = match serde_json::to_string(session) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(
                            target: "mm.repository.sessions",
                            error = %e,
                            session_id = %session.session_id,
                            "Failed to serialize session"
                        );
                        return false;
                    }
                };

                ops.push(StoreOp::PutWithTtl {
                    key: keys::session(&session.session_id),
                    value: json,
                    ttl_seconds: self.session_ttl_seconds,
                });
                for participant in &session.participants {
                    ops.push(StoreOp::PutWithTtl {
                        key: keys::participant_session(&participant.external_id),
                        value: session.session_id.clone(),
                        ttl_seconds: self.session_ttl_seconds,
                    });
                }
            }

            if let Err(e) = self.store.execute(ops).await {
                warn!(
                    target: "mm.repository.sessions",
                    error = %e,
                    chunk_size = chunk.len(),
                    "Session save batch failed"
                );
                return false;
            }
        }

        // Best-effort async forward to the durable audit collaborator.
        let audit = Arc::clone(&self.audit);
        let forwarded = sessions.to_vec();
        tokio::spawn(async move {
            if let Err(e) = audit.record_sessions(&forwarded).await {
                warn!(
                    target: "mm.repository.sessions",
                    error = %e,
                    count = forwarded.len(),
                    "Audit forward of sessions failed"
                );
            }
        });

        debug!(
            target: "mm.repository.sessions",
            count = sessions.len(),
            "Saved sessions"
        );
        true
    }

    /// Session lookup by id; `None` when missing or unreadable.
    pub async fn get_session(&self, session_id: &str) -> Option<SessionData> {
        let value = match self.store.get(&keys::session(session_id)).await {
            Ok(value) => value?,
            Err(e) => {
                warn!(
                    target: "mm.repository.sessions",
                    error = %e,
                    session_id = %session_id,
                    "Session lookup failed"
                );
                return None;
            }
        };

        match serde_json::from_str(&value) {
            Ok(session) => Some(session),
            Err(e) => {
                warn!(
                    target: "mm.repository.sessions",
                    error = %e,
                    session_id = %session_id,
                    "Failed to deserialize session"
                );
                None
            }
        }
    }

    /// Session lookup through a participant back-reference.
    pub async fn get_session_by_user_id(&self, external_id: &str) -> Option<SessionData> {
        let session_id = match self.store.get(&keys::participant_session(external_id)).await {
            Ok(value) => value?,
            Err(e) => {
                warn!(
                    target: "mm.repository.sessions",
                    error = %e,
                    external_id = %external_id,
                    "Participant back-reference lookup failed"
                );
                return None;
            }
        };

        self.get_session(&session_id).await
    }

    /// The other participant's external id, or `None` when the session is
    /// absent or `external_id` is not one of its participants.
    #[must_use]
    pub fn find_partner_id(session: Option<&SessionData>, external_id: &str) -> Option<String> {
        session?
            .partner_of(external_id)
            .map(|partner| partner.external_id.clone())
    }

    /// Tear down a session: the record and every participant back-reference
    /// go in one batch, then a session-ended event is published
    /// asynchronously to the audit sink. No-op on `None`.
    #[instrument(skip_all)]
    pub async fn close_session(&self, session: Option<&SessionData>) {
        let Some(session) = session else {
            return;
        };

        let mut delete_keys = vec![keys::session(&session.session_id)];
        for participant in &session.participants {
            delete_keys.push(keys::participant_session(&participant.external_id));
        }

        if let Err(e) = self
            .store
            .execute(vec![StoreOp::Delete { keys: delete_keys }])
            .await
        {
            warn!(
                target: "mm.repository.sessions",
                error = %e,
                session_id = %session.session_id,
                "Session teardown batch failed"
            );
            return;
        }

        let event = SessionEndedEvent {
            session_id: session.session_id.clone(),
            started_at: session.started_at,
            ended_at: chrono::Utc::now().timestamp_millis(),
        };
        let audit = Arc::clone(&self.audit);
        tokio::spawn(async move {
            if let Err(e) = audit.record_session_end(&event).await {
                warn!(
                    target: "mm.repository.sessions",
                    error = %e,
                    session_id = %event.session_id,
                    "Audit forward of session end failed"
                );
            }
        });

        debug!(
            target: "mm.repository.sessions",
            session_id = %session.session_id,
            "Closed session"
        );
    }
}
