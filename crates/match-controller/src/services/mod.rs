//! Matchmaking services.
//!
//! - [`pairing`] - pure pairing/regrouping round functions
//! - [`signaling_relay`] - best-effort point-to-point delivery
//! - [`matching_service`] - the composed core consumed by the transport
//!   layer

pub mod matching_service;
pub mod pairing;
pub mod signaling_relay;

pub use matching_service::MatchingService;
pub use signaling_relay::SignalingRelay;
