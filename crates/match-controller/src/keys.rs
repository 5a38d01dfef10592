//! Key-naming helper for the shared ephemeral store.
//!
//! # Key Patterns
//!
//! - `mm:queue:{queue_key}` - waiting members per bucket (ZSET, score = entry time millis)
//! - `mm:queue:active` - Active Queue Index (ZSET of queue keys, score = last refresh millis)
//! - `mm:profile:{external_id}` - waiting profile detail (JSON, TTL)
//! - `mm:session:{session_id}` - session record (JSON, TTL)
//! - `mm:session:user:{external_id}` - participant back-reference to session id (TTL)
//!
//! Queue keys are `gender:language:region` composites in lowercase code form,
//! e.g. `male:ko:kr`. Coarser pairing rounds strip segments from the right.

use crate::models::{Gender, Language, QueueAttribute, Region};

/// Separator between queue key segments.
pub const QUEUE_KEY_SEPARATOR: char = ':';

/// Bucket key used when leftover singles are collapsed into one merged pool.
pub const MERGED_BUCKET_KEY: &str = "any";

/// Active Queue Index key.
pub const ACTIVE_QUEUE_INDEX: &str = "mm:queue:active";

/// Composite queue key for a waiting bucket: `gender:language:region`.
#[must_use]
pub fn queue_key(gender: Gender, language: Language, region: Region) -> String {
    format!(
        "{}{sep}{}{sep}{}",
        gender.as_code(),
        language.as_code(),
        region.as_code(),
        sep = QUEUE_KEY_SEPARATOR
    )
}

/// Drop the rightmost segment of a queue key (`male:ko:kr` -> `male:ko`).
///
/// A key with a single segment is returned unchanged.
#[must_use]
pub fn strip_last_segment(key: &str) -> &str {
    key.rsplit_once(QUEUE_KEY_SEPARATOR)
        .map_or(key, |(head, _)| head)
}

/// Store key holding one bucket's waiting members.
#[must_use]
pub fn waiting_queue(queue_key: &str) -> String {
    format!("mm:queue:{queue_key}")
}

/// Store key holding one waiting profile's detail record.
#[must_use]
pub fn profile(external_id: &str) -> String {
    format!("mm:profile:{external_id}")
}

/// Store key holding one session record.
#[must_use]
pub fn session(session_id: &str) -> String {
    format!("mm:session:{session_id}")
}

/// Store key holding a participant's back-reference to their session.
#[must_use]
pub fn participant_session(external_id: &str) -> String {
    format!("mm:session:user:{external_id}")
}
