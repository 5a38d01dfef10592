//! Pairing rounds over polled queue buckets.
//!
//! Pure functions: one pairing pass within buckets, and the regrouping step
//! that coarsens leftover singles between rounds. Pairing order within a
//! bucket is strictly the arrival order handed in by the Queue Store; no
//! re-sorting happens here. Buckets are visited in sorted key order so a
//! cycle is deterministic for a given poll result.
//!
//! Regrouping keeps the original coarsening behavior: when few singles
//! remain they all collapse into one merged pool (which may pair across
//! every attribute, gender included - this keeps small leftover pools from
//! starving); otherwise each key loses its rightmost segment and buckets
//! that now share a key are concatenated.

use crate::keys;
use crate::models::MatchingProfile;
use std::collections::HashMap;

/// Result of one pairing pass.
#[derive(Debug, Default)]
pub struct RoundOutcome {
    /// Matched pairs, first member in each pair enqueued no later than the
    /// second.
    pub pairs: Vec<(MatchingProfile, MatchingProfile)>,
    /// Odd trailing members per bucket, still keyed by the bucket they
    /// failed to pair in.
    pub remaining: HashMap<String, Vec<MatchingProfile>>,
}

/// Pair members within each bucket sequentially in arrival order: first
/// with second, third with fourth, and so on. An odd trailing member
/// becomes remaining for that bucket.
#[must_use]
pub fn pair_within_buckets(mut groups: HashMap<String, Vec<MatchingProfile>>) -> RoundOutcome {
    let mut outcome = RoundOutcome::default();

    let mut bucket_keys: Vec<String> = groups.keys().cloned().collect();
    bucket_keys.sort();

    for bucket_key in bucket_keys {
        let Some(members) = groups.remove(&bucket_key) else {
            continue;
        };

        let mut members = members.into_iter();
        while let Some(first) = members.next() {
            match members.next() {
                Some(second) => outcome.pairs.push((first, second)),
                None => {
                    outcome
                        .remaining
                        .entry(bucket_key.clone())
                        .or_default()
                        .push(first);
                }
            }
        }
    }

    outcome
}

/// Coarsen leftover singles for the next round.
///
/// When the total count is at or below `merge_threshold`, every single goes
/// into one merged pool. Otherwise each bucket key is stripped of its
/// rightmost segment and buckets sharing the coarser key are concatenated.
/// Within-bucket order is preserved; buckets merge in sorted key order.
#[must_use]
pub fn regroup_remaining(
    remaining: HashMap<String, Vec<MatchingProfile>>,
    merge_threshold: usize,
) -> HashMap<String, Vec<MatchingProfile>> {
    let total: usize = remaining.values().map(Vec::len).sum();
    if total == 0 {
        return HashMap::new();
    }

    let mut bucket_keys: Vec<String> = remaining.keys().cloned().collect();
    bucket_keys.sort();

    let mut regrouped: HashMap<String, Vec<MatchingProfile>> = HashMap::new();
    let mut remaining = remaining;

    for bucket_key in bucket_keys {
        let Some(members) = remaining.remove(&bucket_key) else {
            continue;
        };

        let coarser_key = if total <= merge_threshold {
            keys::MERGED_BUCKET_KEY.to_string()
        } else {
            keys::strip_last_segment(&bucket_key).to_string()
        };

        regrouped.entry(coarser_key).or_default().extend(members);
    }

    regrouped
}
