//! Narrow interface over the shared ephemeral store.
//!
//! The matchmaking core uses the store simultaneously as a transient queue
//! (sorted sets scored by time) and an ephemeral cache (values with TTL).
//! This module isolates that usage behind [`EphemeralStore`], which exposes
//! only:
//!
//! - sorted-set add/remove/pop-min/count/remove-below/range
//! - key-value get/mget/put-with-TTL/delete
//! - [`EphemeralStore::execute`]: a group of writes issued as one pipelined
//!   batch
//!
//! The store offers no cross-key transactions; a batch is a throughput
//! optimization, not an atomicity guarantee. Callers await batch completion
//! before relying on the written state elsewhere.

pub mod redis;

use crate::errors::MatchError;
use async_trait::async_trait;

pub use self::redis::RedisStore;

/// One write in a pipelined batch.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    /// Add (or update) a member of a sorted set.
    SortedAdd {
        key: String,
        member: String,
        score: f64,
    },
    /// Remove members from a sorted set.
    SortedRemove { key: String, members: Vec<String> },
    /// Set a value with a TTL in seconds.
    PutWithTtl {
        key: String,
        value: String,
        ttl_seconds: u64,
    },
    /// Delete keys.
    Delete { keys: Vec<String> },
}

/// A sorted-set member together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

/// Narrow ephemeral-store contract (see module docs).
#[async_trait]
pub trait EphemeralStore: Send + Sync {
    /// Issue a group of writes as one pipelined batch. Empty input is a
    /// no-op. The batch either reaches the store or fails as a whole;
    /// individual ops are not transactional across keys.
    async fn execute(&self, ops: Vec<StoreOp>) -> Result<(), MatchError>;

    /// Number of members in a sorted set (0 for a missing key).
    async fn sorted_count(&self, key: &str) -> Result<u64, MatchError>;

    /// Pop up to `count` members with the lowest scores, in score order.
    async fn sorted_pop_min(&self, key: &str, count: u64)
        -> Result<Vec<ScoredMember>, MatchError>;

    /// Remove members with a score strictly below `max_score`; returns the
    /// number removed.
    async fn sorted_remove_below(&self, key: &str, max_score: f64) -> Result<u64, MatchError>;

    /// All members of a sorted set with scores, lowest score first.
    async fn sorted_range_with_scores(&self, key: &str) -> Result<Vec<ScoredMember>, MatchError>;

    /// Value lookup; `None` for missing or expired keys.
    async fn get(&self, key: &str) -> Result<Option<String>, MatchError>;

    /// Bulk value lookup, position-aligned with the input. Empty input
    /// yields an empty result.
    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, MatchError>;
}
