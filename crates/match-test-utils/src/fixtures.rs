//! Profile fixtures.

use match_controller::models::{Gender, Language, MatchingProfile, Region};

/// Stable positive user id derived from an external id.
fn user_id_for(external_id: &str) -> i64 {
    let hash = external_id
        .bytes()
        .fold(0i64, |acc, byte| acc.wrapping_mul(31).wrapping_add(i64::from(byte)));
    ((hash.unsigned_abs() % (i64::MAX as u64)) as i64).max(1)
}

/// A waiting profile with `queue_entry_time` unset (0).
#[must_use]
pub fn profile(
    external_id: &str,
    gender: Gender,
    language: Language,
    region: Region,
) -> MatchingProfile {
    profile_at(external_id, gender, language, region, 0)
}

/// A waiting profile with an explicit `queue_entry_time`.
#[must_use]
pub fn profile_at(
    external_id: &str,
    gender: Gender,
    language: Language,
    region: Region,
    queue_entry_time: i64,
) -> MatchingProfile {
    MatchingProfile {
        user_id: user_id_for(external_id),
        external_id: external_id.to_string(),
        region,
        gender,
        language,
        queue_entry_time,
    }
}
