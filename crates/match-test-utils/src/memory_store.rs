//! In-memory implementation of the narrow ephemeral-store interface.
//!
//! Mirrors the store semantics the core relies on: sorted sets ordered by
//! (score, member), values with TTL expiry (checked lazily on read), and
//! batch execution. Includes direct-inspection helpers so tests can verify
//! store state without going through the public lookups.

use async_trait::async_trait;
use match_controller::errors::MatchError;
use match_controller::store::{EphemeralStore, ScoredMember, StoreOp};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
struct ValueEntry {
    value: String,
    expires_at_ms: i64,
}

#[derive(Debug, Default)]
struct Inner {
    values: HashMap<String, ValueEntry>,
    sorted: HashMap<String, Vec<(String, f64)>>,
}

/// In-memory ephemeral store for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn now_ms() -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn apply(inner: &mut Inner, op: StoreOp) {
        match op {
            StoreOp::SortedAdd { key, member, score } => {
                let set = inner.sorted.entry(key).or_default();
                if let Some(existing) = set.iter_mut().find(|(m, _)| *m == member) {
                    existing.1 = score;
                } else {
                    set.push((member, score));
                }
            }
            StoreOp::SortedRemove { key, members } => {
                if let Some(set) = inner.sorted.get_mut(&key) {
                    set.retain(|(m, _)| !members.contains(m));
                }
            }
            StoreOp::PutWithTtl {
                key,
                value,
                ttl_seconds,
            } => {
                inner.values.insert(
                    key,
                    ValueEntry {
                        value,
                        expires_at_ms: Self::now_ms() + (ttl_seconds as i64) * 1_000,
                    },
                );
            }
            StoreOp::Delete { keys } => {
                for key in keys {
                    inner.values.remove(&key);
                    inner.sorted.remove(&key);
                }
            }
        }
    }

    fn get_live(inner: &mut Inner, key: &str) -> Option<String> {
        match inner.values.get(key) {
            Some(entry) if entry.expires_at_ms > Self::now_ms() => Some(entry.value.clone()),
            Some(_) => {
                inner.values.remove(key);
                None
            }
            None => None,
        }
    }

    fn sorted_view(set: &[(String, f64)]) -> Vec<(String, f64)> {
        let mut view = set.to_vec();
        view.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        view
    }

    // ------------------------------------------------------------------
    // Direct-inspection helpers
    // ------------------------------------------------------------------

    /// Whether a value key is present (ignoring TTL).
    #[must_use]
    pub fn contains_value(&self, key: &str) -> bool {
        self.inner.lock().unwrap().values.contains_key(key)
    }

    /// Member count of a sorted set.
    #[must_use]
    pub fn sorted_len(&self, key: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .sorted
            .get(key)
            .map_or(0, Vec::len)
    }

    /// Score of a sorted-set member, if present.
    #[must_use]
    pub fn sorted_score(&self, key: &str, member: &str) -> Option<f64> {
        self.inner
            .lock()
            .unwrap()
            .sorted
            .get(key)
            .and_then(|set| set.iter().find(|(m, _)| m == member).map(|(_, s)| *s))
    }

    /// Drop a value key, simulating TTL expiry.
    pub fn remove_value(&self, key: &str) {
        self.inner.lock().unwrap().values.remove(key);
    }
}

#[async_trait]
impl EphemeralStore for MemoryStore {
    async fn execute(&self, ops: Vec<StoreOp>) -> Result<(), MatchError> {
        let mut inner = self.inner.lock().unwrap();
        for op in ops {
            Self::apply(&mut inner, op);
        }
        Ok(())
    }

    async fn sorted_count(&self, key: &str) -> Result<u64, MatchError> {
        Ok(self.sorted_len(key) as u64)
    }

    async fn sorted_pop_min(
        &self,
        key: &str,
        count: u64,
    ) -> Result<Vec<ScoredMember>, MatchError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(set) = inner.sorted.get_mut(key) else {
            return Ok(Vec::new());
        };

        let view = Self::sorted_view(set);
        let popped: Vec<(String, f64)> = view.into_iter().take(count as usize).collect();
        set.retain(|(m, _)| !popped.iter().any(|(p, _)| p == m));

        Ok(popped
            .into_iter()
            .map(|(member, score)| ScoredMember { member, score })
            .collect())
    }

    async fn sorted_remove_below(&self, key: &str, max_score: f64) -> Result<u64, MatchError> {
        let mut inner = self.inner.lock().unwrap();
        let Some(set) = inner.sorted.get_mut(key) else {
            return Ok(0);
        };

        let before = set.len();
        set.retain(|(_, score)| *score >= max_score);
        Ok((before - set.len()) as u64)
    }

    async fn sorted_range_with_scores(&self, key: &str) -> Result<Vec<ScoredMember>, MatchError> {
        let inner = self.inner.lock().unwrap();
        let Some(set) = inner.sorted.get(key) else {
            return Ok(Vec::new());
        };

        Ok(Self::sorted_view(set)
            .into_iter()
            .map(|(member, score)| ScoredMember { member, score })
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, MatchError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(Self::get_live(&mut inner, key))
    }

    async fn get_many(&self, keys: &[String]) -> Result<Vec<Option<String>>, MatchError> {
        let mut inner = self.inner.lock().unwrap();
        Ok(keys
            .iter()
            .map(|key| Self::get_live(&mut inner, key))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sorted_add_and_pop_min_ordering() {
        let store = MemoryStore::new();
        store
            .execute(vec![
                StoreOp::SortedAdd {
                    key: "q".to_string(),
                    member: "late".to_string(),
                    score: 30.0,
                },
                StoreOp::SortedAdd {
                    key: "q".to_string(),
                    member: "early".to_string(),
                    score: 10.0,
                },
                StoreOp::SortedAdd {
                    key: "q".to_string(),
                    member: "middle".to_string(),
                    score: 20.0,
                },
            ])
            .await
            .unwrap();

        let popped = store.sorted_pop_min("q", 2).await.unwrap();
        let members: Vec<&str> = popped.iter().map(|m| m.member.as_str()).collect();
        assert_eq!(members, vec!["early", "middle"]);
        assert_eq!(store.sorted_len("q"), 1);
    }

    #[tokio::test]
    async fn test_sorted_add_updates_existing_member() {
        let store = MemoryStore::new();
        store
            .execute(vec![StoreOp::SortedAdd {
                key: "q".to_string(),
                member: "a".to_string(),
                score: 10.0,
            }])
            .await
            .unwrap();
        store
            .execute(vec![StoreOp::SortedAdd {
                key: "q".to_string(),
                member: "a".to_string(),
                score: 20.0,
            }])
            .await
            .unwrap();

        assert_eq!(store.sorted_len("q"), 1);
        assert_eq!(store.sorted_score("q", "a"), Some(20.0));
    }

    #[tokio::test]
    async fn test_sorted_remove_below() {
        let store = MemoryStore::new();
        store
            .execute(vec![
                StoreOp::SortedAdd {
                    key: "q".to_string(),
                    member: "old".to_string(),
                    score: 5.0,
                },
                StoreOp::SortedAdd {
                    key: "q".to_string(),
                    member: "new".to_string(),
                    score: 50.0,
                },
            ])
            .await
            .unwrap();

        let removed = store.sorted_remove_below("q", 10.0).await.unwrap();
        assert_eq!(removed, 1);
        assert_eq!(store.sorted_len("q"), 1);
        assert!(store.sorted_score("q", "new").is_some());
    }

    #[tokio::test]
    async fn test_value_ttl_expiry_on_read() {
        let store = MemoryStore::new();
        store
            .execute(vec![StoreOp::PutWithTtl {
                key: "k".to_string(),
                value: "v".to_string(),
                ttl_seconds: 0,
            }])
            .await
            .unwrap();

        // TTL of zero is already expired at read time.
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_many_alignment() {
        let store = MemoryStore::new();
        store
            .execute(vec![StoreOp::PutWithTtl {
                key: "k1".to_string(),
                value: "v1".to_string(),
                ttl_seconds: 60,
            }])
            .await
            .unwrap();

        let values = store
            .get_many(&["k0".to_string(), "k1".to_string()])
            .await
            .unwrap();
        assert_eq!(values, vec![None, Some("v1".to_string())]);
    }
}
