//! The composed matchmaking core.
//!
//! Wires the Queue Store, Session Registry, and Signaling Relay into the
//! three operations the transport layer consumes (`request_match`,
//! `relay_signal`, `disconnect_user`) plus the matching cycle the scheduler
//! task drives.
//!
//! # Matching cycle
//!
//! 1. Poll every active bucket (with profiles; expired members dropped).
//! 2. Round 1: pair within exact keys in arrival order.
//! 3. Regroup leftover singles (merge if few, else strip the region
//!    segment); Round 2.
//! 4. Regroup again (strip the language segment); Round 3.
//! 5. Finalize all pairs: register sessions, delete consumed profiles,
//!    push complementary offer/answer results.
//! 6. Requeue whatever singles remain, preserving their original wait
//!    score.
//!
//! A cycle error aborts the cycle without touching what already succeeded;
//! the next tick proceeds normally.

use crate::audit::AuditSink;
use crate::config::Config;
use crate::errors::MatchError;
use crate::models::{
    MatchRequest, MatchingProfile, MatchingResult, Region, SessionData, SignalRole,
    SignalingMessage,
};
use crate::observability::metrics;
use crate::repositories::{SessionRepository, WaitingQueueRepository};
use crate::services::pairing;
use crate::services::signaling_relay::SignalingRelay;
use crate::store::EphemeralStore;
use crate::transport::PushTransport;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// The matchmaking core consumed by the (out-of-scope) request layer.
pub struct MatchingService {
    queue: WaitingQueueRepository,
    sessions: SessionRepository,
    relay: SignalingRelay,
    merge_threshold: usize,
}

impl MatchingService {
    #[must_use]
    pub fn new(
        store: Arc<dyn EphemeralStore>,
        transport: Arc<dyn PushTransport>,
        audit: Arc<dyn AuditSink>,
        config: &Config,
    ) -> Self {
        Self {
            queue: WaitingQueueRepository::new(Arc::clone(&store), config),
            sessions: SessionRepository::new(store, audit, config),
            relay: SignalingRelay::new(transport),
            merge_threshold: config.merge_threshold,
        }
    }

    /// The underlying Queue Store.
    #[must_use]
    pub fn queue(&self) -> &WaitingQueueRepository {
        &self.queue
    }

    /// The underlying Session Registry.
    #[must_use]
    pub fn sessions(&self) -> &SessionRepository {
        &self.sessions
    }

    /// Enter the waiting pool.
    ///
    /// An invalid payload yields a Failed result with no queue mutation; a
    /// store failure also yields Failed (the caller may retry). On success
    /// the caller Waits - the match result is always pushed asynchronously
    /// once the scheduler pairs the user.
    #[instrument(skip_all, fields(external_id = %external_id))]
    pub async fn request_match(
        &self,
        external_id: &str,
        detected_region: Region,
        request: &MatchRequest,
    ) -> MatchingResult {
        if external_id.is_empty() || request.user_id <= 0 {
            warn!(
                target: "mm.service.matching",
                external_id = %external_id,
                user_id = request.user_id,
                "Rejected invalid match request"
            );
            return MatchingResult::failed();
        }

        let profile = MatchingProfile::from_request(external_id, detected_region, request);
        if self.queue.enqueue(profile).await {
            MatchingResult::waiting()
        } else {
            MatchingResult::failed()
        }
    }

    /// Relay a WebRTC signaling message to the sender's session partner.
    ///
    /// The message is dropped (logged, never surfaced to the sender) when
    /// the sender has no session, the session has no partner for them, or
    /// `receiver_id` is not exactly that partner - a client cannot address
    /// an arbitrary peer.
    #[instrument(skip_all, fields(external_id = %external_id))]
    pub async fn relay_signal(&self, external_id: &str, message: SignalingMessage) {
        let session = self.sessions.get_session_by_user_id(external_id).await;
        let had_session = session.is_some();

        let Some(partner_id) = SessionRepository::find_partner_id(session.as_ref(), external_id)
        else {
            let reason = if had_session { "no_partner" } else { "no_session" };
            warn!(
                target: "mm.service.matching",
                external_id = %external_id,
                reason = reason,
                "Dropping signaling message: no resolvable partner"
            );
            metrics::increment_relay_rejected(reason);
            return;
        };

        if partner_id != message.receiver_id {
            warn!(
                target: "mm.service.matching",
                external_id = %external_id,
                receiver_id = %message.receiver_id,
                "Dropping signaling message: receiver is not the sender's partner"
            );
            metrics::increment_relay_rejected("receiver_mismatch");
            return;
        }

        self.relay.send_signaling_message(external_id, message).await;
    }

    /// Unconditional, idempotent cleanup for a departing user.
    ///
    /// Removes them from the waiting pool if queued; tears down their
    /// session if matched, pushing a Leave result to the partner.
    #[instrument(skip_all, fields(external_id = %external_id))]
    pub async fn disconnect_user(&self, external_id: &str) {
        let dequeued = self.queue.dequeue(external_id).await;

        if let Some(session) = self.sessions.get_session_by_user_id(external_id).await {
            let partner_id = SessionRepository::find_partner_id(Some(&session), external_id);
            self.sessions.close_session(Some(&session)).await;

            if let Some(partner_id) = partner_id {
                self.relay
                    .send_matching_result(&partner_id, MatchingResult::leave(&session.session_id))
                    .await;
            }
        }

        debug!(
            target: "mm.service.matching",
            external_id = %external_id,
            dequeued = dequeued,
            "Disconnected user"
        );
    }

    /// Run one matching cycle. Never called concurrently with itself; the
    /// scheduler task serializes ticks.
    ///
    /// # Errors
    ///
    /// Returns `MatchError::Store` when finalization cannot register
    /// sessions; the cycle aborts without partial commitment beyond what
    /// already succeeded.
    #[instrument(skip_all)]
    pub async fn run_cycle(&self) -> Result<(), MatchError> {
        let started = Instant::now();

        let groups = self.queue.poll_with_profiles(None).await;
        if groups.is_empty() {
            return Ok(());
        }

        // Round 1: exact keys.
        let round1 = pairing::pair_within_buckets(groups);
        let mut pairs = round1.pairs;

        // Round 2: merged or region-stripped buckets.
        let round2 =
            pairing::pair_within_buckets(pairing::regroup_remaining(round1.remaining, self.merge_threshold));
        pairs.extend(round2.pairs);

        // Round 3: merged or language-stripped buckets.
        let round3 =
            pairing::pair_within_buckets(pairing::regroup_remaining(round2.remaining, self.merge_threshold));
        pairs.extend(round3.pairs);

        let leftovers: Vec<MatchingProfile> = round3.remaining.into_values().flatten().collect();

        self.finalize_matches(&pairs).await?;

        if !leftovers.is_empty() && !self.queue.requeue_all(&leftovers).await {
            warn!(
                target: "mm.service.matching",
                count = leftovers.len(),
                "Requeue of leftover singles failed"
            );
        }

        metrics::record_cycle_duration(started.elapsed());
        debug!(
            target: "mm.service.matching",
            pairs = pairs.len(),
            leftovers = leftovers.len(),
            "Matching cycle complete"
        );
        Ok(())
    }

    /// Convert matched pairs into sessions, delete their consumed profiles,
    /// and push a result to each side with complementary roles (first
    /// participant offers, second answers).
    async fn finalize_matches(
        &self,
        pairs: &[(MatchingProfile, MatchingProfile)],
    ) -> Result<(), MatchError> {
        if pairs.is_empty() {
            return Ok(());
        }

        let sessions: Vec<SessionData> = pairs
            .iter()
            .map(|(first, second)| SessionData::from_pair(first, second))
            .collect();

        if !self.sessions.save_sessions(&sessions).await {
            return Err(MatchError::Store(
                "session registration failed during finalize".to_string(),
            ));
        }

        let consumed: Vec<String> = pairs
            .iter()
            .flat_map(|(first, second)| {
                [first.external_id.clone(), second.external_id.clone()]
            })
            .collect();
        if !self.queue.delete_profiles(&consumed).await {
            // Leftover detail records expire by TTL; pairing already
            // consumed the memberships.
            warn!(
                target: "mm.service.matching",
                count = consumed.len(),
                "Failed to delete consumed profiles"
            );
        }

        for ((first, second), session) in pairs.iter().zip(&sessions) {
            self.relay
                .send_matching_result(
                    &first.external_id,
                    MatchingResult::success(
                        &session.session_id,
                        &second.external_id,
                        SignalRole::Offer,
                    ),
                )
                .await;
            self.relay
                .send_matching_result(
                    &second.external_id,
                    MatchingResult::success(
                        &session.session_id,
                        &first.external_id,
                        SignalRole::Answer,
                    ),
                )
                .await;
        }

        metrics::increment_matches(pairs.len() as u64);
        Ok(())
    }
}
