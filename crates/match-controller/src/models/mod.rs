//! Matchmaking data model.
//!
//! Value types shared by the queue store, scheduler, session registry, and
//! relay:
//!
//! - [`MatchingProfile`] - one waiting user, partitioned by queue attributes
//! - [`SessionData`] / [`ParticipantData`] - a matched pair and its snapshots
//! - [`MatchingResult`] / [`SignalingMessage`] - payloads pushed to clients
//! - [`Gender`] / [`Language`] / [`Region`] - queue attributes with
//!   unknown-fallback parsing
//!
//! Attribute parsing never fails: unrecognized input coerces to the
//! `Unknown` sentinel, and [`resolve_preference`] guarantees `Unknown` is
//! never stored as a final value (user-selected wins over auto-detected,
//! which wins over the hard default).

use serde::{Deserialize, Serialize};

/// A queue attribute: parseable from client input with an `Unknown`
/// sentinel, and renderable as the lowercase code used in queue keys.
pub trait QueueAttribute: Copy + Eq {
    /// Sentinel for unrecognized/absent input. Never stored as final.
    const UNKNOWN: Self;
    /// Hard default used when neither selected nor detected values resolve.
    const DEFAULT: Self;

    /// Parse client input, coercing unrecognized values to `UNKNOWN`.
    fn parse(input: &str) -> Self;

    /// Lowercase code used in queue keys.
    fn as_code(&self) -> &'static str;
}

/// Resolve the effective value of a queue attribute.
///
/// A non-unknown user-selected value wins over a non-unknown auto-detected
/// value, which wins over the hard default.
#[must_use]
pub fn resolve_preference<T: QueueAttribute>(selected: T, detected: T) -> T {
    if selected != T::UNKNOWN {
        selected
    } else if detected != T::UNKNOWN {
        detected
    } else {
        T::DEFAULT
    }
}

/// Parse an optional client-supplied attribute string.
///
/// Absent input coerces to `UNKNOWN`, like unrecognized input.
#[must_use]
pub fn parse_optional<T: QueueAttribute>(input: Option<&str>) -> T {
    input.map_or(T::UNKNOWN, T::parse)
}

/// Gender queue attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl QueueAttribute for Gender {
    const UNKNOWN: Self = Gender::Unknown;
    const DEFAULT: Self = Gender::Male;

    fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Gender::Male,
            "female" | "f" => Gender::Female,
            _ => Gender::Unknown,
        }
    }

    fn as_code(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
    }
}

/// Language queue attribute (ISO 639-1 codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Ko,
    En,
    Ja,
    Zh,
    Vi,
    Th,
    Es,
    Unknown,
}

impl QueueAttribute for Language {
    const UNKNOWN: Self = Language::Unknown;
    const DEFAULT: Self = Language::Ko;

    fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "ko" => Language::Ko,
            "en" => Language::En,
            "ja" => Language::Ja,
            "zh" => Language::Zh,
            "vi" => Language::Vi,
            "th" => Language::Th,
            "es" => Language::Es,
            _ => Language::Unknown,
        }
    }

    fn as_code(&self) -> &'static str {
        match self {
            Language::Ko => "ko",
            Language::En => "en",
            Language::Ja => "ja",
            Language::Zh => "zh",
            Language::Vi => "vi",
            Language::Th => "th",
            Language::Es => "es",
            Language::Unknown => "unknown",
        }
    }
}

/// Region queue attribute (country/area codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Kr,
    Us,
    Jp,
    Cn,
    Vn,
    Th,
    Eu,
    Etc,
    Unknown,
}

impl QueueAttribute for Region {
    const UNKNOWN: Self = Region::Unknown;
    const DEFAULT: Self = Region::Kr;

    fn parse(input: &str) -> Self {
        match input.trim().to_ascii_lowercase().as_str() {
            "kr" => Region::Kr,
            "us" => Region::Us,
            "jp" => Region::Jp,
            "cn" => Region::Cn,
            "vn" => Region::Vn,
            "th" => Region::Th,
            "eu" => Region::Eu,
            "etc" => Region::Etc,
            _ => Region::Unknown,
        }
    }

    fn as_code(&self) -> &'static str {
        match self {
            Region::Kr => "kr",
            Region::Us => "us",
            Region::Jp => "jp",
            Region::Cn => "cn",
            Region::Vn => "vn",
            Region::Th => "th",
            Region::Eu => "eu",
            Region::Etc => "etc",
            Region::Unknown => "unknown",
        }
    }
}

/// Match request payload as received from the transport layer.
///
/// Attribute fields carry the user's raw selections; absent or unrecognized
/// values fall through the preference resolution in
/// [`MatchingProfile::from_request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
    /// Internal numeric user id supplied by the identity collaborator.
    pub user_id: i64,
    /// User-selected region, if any.
    pub region: Option<String>,
    /// User-selected gender, if any.
    pub gender: Option<String>,
    /// User-selected language, if any.
    pub language: Option<String>,
}

/// One waiting user in the matchmaking pool.
///
/// At most one live profile exists per `external_id`. The profile is created
/// on match request, deleted on pairing, on disconnect/cancel, or by store
/// TTL if abandoned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingProfile {
    /// Internal numeric user id.
    pub user_id: i64,
    /// Stable opaque addressing key (queue and session addressing).
    pub external_id: String,
    pub region: Region,
    pub gender: Gender,
    pub language: Language,
    /// Epoch millis, stamped at enqueue time. Zero until enqueued.
    pub queue_entry_time: i64,
}

impl MatchingProfile {
    /// Build a profile from a match request, resolving effective attributes.
    ///
    /// `detected_region` comes from the geolocation collaborator; the
    /// request's raw selections win over it, and hard defaults back both.
    #[must_use]
    pub fn from_request(
        external_id: &str,
        detected_region: Region,
        request: &MatchRequest,
    ) -> Self {
        let region = resolve_preference(
            parse_optional::<Region>(request.region.as_deref()),
            detected_region,
        );
        let gender = resolve_preference(
            parse_optional::<Gender>(request.gender.as_deref()),
            Gender::Unknown,
        );
        let language = resolve_preference(
            parse_optional::<Language>(request.language.as_deref()),
            Language::Unknown,
        );

        Self {
            user_id: request.user_id,
            external_id: external_id.to_string(),
            region,
            gender,
            language,
            queue_entry_time: 0,
        }
    }

    /// Composite queue key this profile waits under.
    #[must_use]
    pub fn queue_key(&self) -> String {
        crate::keys::queue_key(self.gender, self.language, self.region)
    }

    /// Participant snapshot copied into a session at finalization.
    #[must_use]
    pub fn snapshot(&self) -> ParticipantData {
        ParticipantData {
            user_id: self.user_id,
            external_id: self.external_id.clone(),
            region: self.region,
            gender: self.gender,
            language: self.language,
        }
    }
}

/// Snapshot of a matched participant, copied from the profile at
/// finalization (not a live reference).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantData {
    pub user_id: i64,
    pub external_id: String,
    pub region: Region,
    pub gender: Gender,
    pub language: Language,
}

/// A matched session between exactly two participants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    /// Opaque unique session id.
    pub session_id: String,
    /// Epoch millis at finalization.
    pub started_at: i64,
    /// Exactly two participant snapshots, offer side first.
    pub participants: [ParticipantData; 2],
}

impl SessionData {
    /// Build a session from a matched pair. The first profile takes the
    /// offer role.
    #[must_use]
    pub fn from_pair(first: &MatchingProfile, second: &MatchingProfile) -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            started_at: chrono::Utc::now().timestamp_millis(),
            participants: [first.snapshot(), second.snapshot()],
        }
    }

    /// The other participant's external id, if `external_id` is a
    /// participant of this session.
    #[must_use]
    pub fn partner_of(&self, external_id: &str) -> Option<&ParticipantData> {
        let [first, second] = &self.participants;
        if first.external_id == external_id {
            Some(second)
        } else if second.external_id == external_id {
            Some(first)
        } else {
            None
        }
    }
}

/// Status of a pushed matching result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchStatus {
    Success,
    Waiting,
    Failed,
    Leave,
}

/// WebRTC role assigned to a matched side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalRole {
    Offer,
    Answer,
}

/// Body of a successful or leave result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchBody {
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<SignalRole>,
}

/// Result payload delivered to one addressed recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingResult {
    pub status: MatchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<MatchBody>,
}

impl MatchingResult {
    /// Enqueued; a result will be pushed once the scheduler pairs the user.
    #[must_use]
    pub fn waiting() -> Self {
        Self {
            status: MatchStatus::Waiting,
            body: None,
        }
    }

    /// Request rejected or store write failed; nothing was enqueued.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            status: MatchStatus::Failed,
            body: None,
        }
    }

    /// Matched into `session_id` against `partner_id` with `role`.
    #[must_use]
    pub fn success(session_id: &str, partner_id: &str, role: SignalRole) -> Self {
        Self {
            status: MatchStatus::Success,
            body: Some(MatchBody {
                session_id: session_id.to_string(),
                partner_id: Some(partner_id.to_string()),
                role: Some(role),
            }),
        }
    }

    /// The partner left `session_id`; the session is gone.
    #[must_use]
    pub fn leave(session_id: &str) -> Self {
        Self {
            status: MatchStatus::Leave,
            body: Some(MatchBody {
                session_id: session_id.to_string(),
                partner_id: None,
                role: None,
            }),
        }
    }
}

/// WebRTC signaling message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SignalType {
    Offer,
    Answer,
    Candidate,
}

/// Point-to-point WebRTC signaling message.
///
/// `sender_id` is stamped server-side by the relay; the client-supplied
/// value is never trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalingMessage {
    pub sender_id: String,
    pub receiver_id: String,
    pub signal_type: SignalType,
    pub data: serde_json::Value,
}

/// Envelope for everything the core pushes through the real-time transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum OutboundMessage {
    MatchingResult(MatchingResult),
    Signaling(SignalingMessage),
}
