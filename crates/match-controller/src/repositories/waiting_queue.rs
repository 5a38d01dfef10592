//! Queue Store: waiting profiles partitioned by queue key.
//!
//! Each bucket is a sorted set scored by enqueue time; the profile detail
//! lives beside it as a TTL'd JSON record, and the Active Queue Index
//! tracks which buckets are worth polling so a cycle never scans the whole
//! keyspace.
//!
//! # Consistency
//!
//! Every multi-key write goes out as one pipelined batch, but the store has
//! no cross-key transactions. A crash between membership and detail writes
//! can leave partial state; readers already defend against it (a member
//! with no detail record reads as expired and is dropped at poll time).

use crate::config::Config;
use crate::keys;
use crate::models::MatchingProfile;
use crate::observability::metrics;
use crate::store::{EphemeralStore, ScoredMember, StoreOp};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Queue Store over the shared ephemeral store.
pub struct WaitingQueueRepository {
    store: Arc<dyn EphemeralStore>,
    profile_ttl_seconds: u64,
    active_index_ttl_seconds: u64,
    stale_cutoff_seconds: u64,
    poll_batch_cap: u64,
}

impl WaitingQueueRepository {
    #[must_use]
    pub fn new(store: Arc<dyn EphemeralStore>, config: &Config) -> Self {
        Self {
            store,
            profile_ttl_seconds: config.profile_ttl_seconds,
            active_index_ttl_seconds: config.active_index_ttl_seconds,
            stale_cutoff_seconds: config.stale_cutoff_seconds,
            poll_batch_cap: config.poll_batch_cap,
        }
    }

    /// Enqueue a waiting profile.
    ///
    /// Stamps `queue_entry_time`, then issues membership, detail record, and
    /// Active Queue Index refresh as one pipelined batch. Returns `false`
    /// when the batch fails; nothing is retried here.
    #[instrument(skip_all, fields(external_id = %profile.external_id))]
    pub async fn enqueue(&self, mut profile: MatchingProfile) -> bool {
        let now = chrono::Utc::now().timestamp_millis();
        profile.queue_entry_time = now;

        let queue_key = profile.queue_key();
        let json = match serde_json::to_string(&profile) {
            Ok(json) => json,
            Err(e) => {
                warn!(
                    target: "mm.repository.queue",
                    error = %e,
                    external_id = %profile.external_id,
                    "Failed to serialize profile"
                );
                return false;
            }
        };

        let ops = vec![
            StoreOp::SortedAdd {
                key: keys::waiting_queue(&queue_key),
                member: profile.external_id.clone(),
                score: now as f64,
            },
            StoreOp::PutWithTtl {
                key: keys::profile(&profile.external_id),
                value: json,
                ttl_seconds: self.profile_ttl_seconds,
            },
            StoreOp::SortedAdd {
                key: keys::ACTIVE_QUEUE_INDEX.to_string(),
                member: queue_key.clone(),
                score: now as f64,
            },
        ];

        match self.store.execute(ops).await {
            Ok(()) => {
                metrics::increment_enqueue();
                debug!(
                    target: "mm.repository.queue",
                    external_id = %profile.external_id,
                    queue_key = %queue_key,
                    "Enqueued profile"
                );
                true
            }
            Err(e) => {
                warn!(
                    target: "mm.repository.queue",
                    error = %e,
                    external_id = %profile.external_id,
                    "Enqueue batch failed"
                );
                false
            }
        }
    }

    /// Re-insert leftover members, membership only.
    ///
    /// The detail record already exists and is untouched; each profile's
    /// original `queue_entry_time` is reused as the score so leftovers are
    /// not penalized with a fresh wait timer.
    #[instrument(skip_all, fields(count = profiles.len()))]
    pub async fn requeue_all(&self, profiles: &[MatchingProfile]) -> bool {
        if profiles.is_empty() {
            return true;
        }

        let now = chrono::Utc::now().timestamp_millis();
        let mut ops = Vec::with_capacity(profiles.len() * 2);
        for profile in profiles {
            let queue_key = profile.queue_key();
            ops.push(StoreOp::SortedAdd {
                key: keys::waiting_queue(&queue_key),
                member: profile.external_id.clone(),
                score: profile.queue_entry_time as f64,
            });
            ops.push(StoreOp::SortedAdd {
                key: keys::ACTIVE_QUEUE_INDEX.to_string(),
                member: queue_key,
                score: now as f64,
            });
        }

        match self.store.execute(ops).await {
            Ok(()) => {
                metrics::increment_requeued(profiles.len() as u64);
                true
            }
            Err(e) => {
                warn!(
                    target: "mm.repository.queue",
                    error = %e,
                    count = profiles.len(),
                    "Requeue batch failed"
                );
                false
            }
        }
    }

    /// Remove a waiting user by external id.
    ///
    /// Returns `false` when the profile cannot be resolved (already paired,
    /// already dequeued, or expired) - a second dequeue of the same id is a
    /// `false`, not an error.
    #[instrument(skip_all, fields(external_id = %external_id))]
    pub async fn dequeue(&self, external_id: &str) -> bool {
        match self.get_profile(external_id).await {
            Some(profile) => self.dequeue_profile(&profile).await,
            None => false,
        }
    }

    /// Remove a resolved profile: membership and detail in one batch.
    pub async fn dequeue_profile(&self, profile: &MatchingProfile) -> bool {
        let ops = vec![
            StoreOp::SortedRemove {
                key: keys::waiting_queue(&profile.queue_key()),
                members: vec![profile.external_id.clone()],
            },
            StoreOp::Delete {
                keys: vec![keys::profile(&profile.external_id)],
            },
        ];

        match self.store.execute(ops).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    target: "mm.repository.queue",
                    error = %e,
                    external_id = %profile.external_id,
                    "Dequeue batch failed"
                );
                false
            }
        }
    }

    /// Bulk-delete detail records only (membership already consumed by
    /// poll).
    pub async fn delete_profiles(&self, external_ids: &[String]) -> bool {
        if external_ids.is_empty() {
            return true;
        }

        let ops = vec![StoreOp::Delete {
            keys: external_ids.iter().map(|id| keys::profile(id)).collect(),
        }];

        match self.store.execute(ops).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    target: "mm.repository.queue",
                    error = %e,
                    count = external_ids.len(),
                    "Profile bulk delete failed"
                );
                false
            }
        }
    }

    /// Detail lookup for one waiting user. `None` for missing, expired, or
    /// unreadable records.
    pub async fn get_profile(&self, external_id: &str) -> Option<MatchingProfile> {
        let value = match self.store.get(&keys::profile(external_id)).await {
            Ok(value) => value?,
            Err(e) => {
                warn!(
                    target: "mm.repository.queue",
                    error = %e,
                    external_id = %external_id,
                    "Profile lookup failed"
                );
                return None;
            }
        };

        match serde_json::from_str(&value) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(
                    target: "mm.repository.queue",
                    error = %e,
                    external_id = %external_id,
                    "Failed to deserialize profile"
                );
                None
            }
        }
    }

    /// Bulk detail lookup, preserving input order and silently dropping
    /// members whose record is gone. Empty input yields an empty result.
    pub async fn get_profiles(&self, external_ids: &[String]) -> Vec<MatchingProfile> {
        if external_ids.is_empty() {
            return Vec::new();
        }

        let store_keys: Vec<String> = external_ids.iter().map(|id| keys::profile(id)).collect();
        let values = match self.store.get_many(&store_keys).await {
            Ok(values) => values,
            Err(e) => {
                warn!(
                    target: "mm.repository.queue",
                    error = %e,
                    count = external_ids.len(),
                    "Bulk profile lookup failed"
                );
                return Vec::new();
            }
        };

        values
            .into_iter()
            .flatten()
            .filter_map(|value| match serde_json::from_str(&value) {
                Ok(profile) => Some(profile),
                Err(e) => {
                    warn!(
                        target: "mm.repository.queue",
                        error = %e,
                        "Failed to deserialize profile in bulk lookup"
                    );
                    None
                }
            })
            .collect()
    }

    /// Current member count for every key in the Active Queue Index.
    pub async fn get_active_queue_sizes(&self) -> HashMap<String, u64> {
        let mut sizes = HashMap::new();
        for queue_key in self.active_queue_keys().await {
            match self.store.sorted_count(&keys::waiting_queue(&queue_key)).await {
                Ok(count) => {
                    sizes.insert(queue_key, count);
                }
                Err(e) => {
                    warn!(
                        target: "mm.repository.queue",
                        error = %e,
                        queue_key = %queue_key,
                        "Queue size lookup failed"
                    );
                }
            }
        }
        sizes
    }

    /// Extract waiting members from the targeted buckets (all active
    /// buckets when `queue_keys` is `None`).
    ///
    /// Per bucket: members older than the stale cutoff window are evicted
    /// first (a safety valve, not the fairness mechanism), then up to a
    /// proportional share of the global batch cap is popped in score order.
    /// When the total backlog fits under the cap, every member is taken.
    #[instrument(skip_all)]
    pub async fn poll(&self, queue_keys: Option<&[String]>) -> HashMap<String, Vec<ScoredMember>> {
        let mut targeted = match queue_keys {
            Some(keys) => keys.to_vec(),
            None => self.active_queue_keys().await,
        };
        targeted.sort();
        targeted.dedup();

        let now = chrono::Utc::now().timestamp_millis();
        let cutoff = (now - (self.stale_cutoff_seconds as i64) * 1_000) as f64;

        // Evict stale waiters, then size up each bucket.
        let mut sizes: Vec<(String, u64)> = Vec::with_capacity(targeted.len());
        for queue_key in targeted {
            let queue = keys::waiting_queue(&queue_key);

            match self.store.sorted_remove_below(&queue, cutoff).await {
                Ok(evicted) if evicted > 0 => {
                    debug!(
                        target: "mm.repository.queue",
                        queue_key = %queue_key,
                        evicted = evicted,
                        "Evicted stale queue entries"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        target: "mm.repository.queue",
                        error = %e,
                        queue_key = %queue_key,
                        "Stale eviction failed"
                    );
                    continue;
                }
            }

            match self.store.sorted_count(&queue).await {
                Ok(0) => {}
                Ok(count) => sizes.push((queue_key, count)),
                Err(e) => {
                    warn!(
                        target: "mm.repository.queue",
                        error = %e,
                        queue_key = %queue_key,
                        "Queue size lookup failed"
                    );
                }
            }
        }

        let total_backlog: u64 = sizes.iter().map(|(_, count)| count).sum();
        metrics::set_queue_waiting(total_backlog);
        if total_backlog == 0 {
            return HashMap::new();
        }

        let take_all = total_backlog <= self.poll_batch_cap;
        let mut budget = self.poll_batch_cap;
        let mut extracted = HashMap::new();

        for (queue_key, count) in sizes {
            let quota = if take_all {
                count
            } else {
                proportional_quota(count, total_backlog, self.poll_batch_cap).min(budget)
            };
            if quota == 0 {
                continue;
            }

            match self
                .store
                .sorted_pop_min(&keys::waiting_queue(&queue_key), quota)
                .await
            {
                Ok(members) if !members.is_empty() => {
                    if !take_all {
                        budget = budget.saturating_sub(members.len() as u64);
                    }
                    extracted.insert(queue_key, members);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        target: "mm.repository.queue",
                        error = %e,
                        queue_key = %queue_key,
                        "Queue extraction failed"
                    );
                }
            }
        }

        extracted
    }

    /// [`Self::poll`] composed with the bulk detail lookup; members whose
    /// detail record has expired are treated as abandoned and dropped.
    pub async fn poll_with_profiles(
        &self,
        queue_keys: Option<&[String]>,
    ) -> HashMap<String, Vec<MatchingProfile>> {
        let polled = self.poll(queue_keys).await;

        let mut groups = HashMap::new();
        for (queue_key, members) in polled {
            let ids: Vec<String> = members.into_iter().map(|m| m.member).collect();
            let profiles = self.get_profiles(&ids).await;

            let abandoned = ids.len() - profiles.len();
            if abandoned > 0 {
                debug!(
                    target: "mm.repository.queue",
                    queue_key = %queue_key,
                    abandoned = abandoned,
                    "Dropped members with expired profiles"
                );
            }

            if !profiles.is_empty() {
                groups.insert(queue_key, profiles);
            }
        }
        groups
    }

    /// Keys currently present in the Active Queue Index, pruning entries
    /// whose last refresh is older than the index TTL.
    async fn active_queue_keys(&self) -> Vec<String> {
        let now = chrono::Utc::now().timestamp_millis();
        let min_fresh = (now - (self.active_index_ttl_seconds as i64) * 1_000) as f64;

        if let Err(e) = self
            .store
            .sorted_remove_below(keys::ACTIVE_QUEUE_INDEX, min_fresh)
            .await
        {
            warn!(
                target: "mm.repository.queue",
                error = %e,
                "Active queue index prune failed"
            );
        }

        match self.store.sorted_range_with_scores(keys::ACTIVE_QUEUE_INDEX).await {
            Ok(entries) => entries.into_iter().map(|entry| entry.member).collect(),
            Err(e) => {
                warn!(
                    target: "mm.repository.queue",
                    error = %e,
                    "Active queue index read failed"
                );
                Vec::new()
            }
        }
    }
}

/// Per-bucket extraction quota when the backlog exceeds the global cap:
/// `ceil(bucket_size / total_backlog * cap)`, so larger buckets get
/// proportionally more while small ones still make progress.
fn proportional_quota(bucket_size: u64, total_backlog: u64, cap: u64) -> u64 {
    (bucket_size * cap).div_ceil(total_backlog)
}
