//! Matchmaking core error types.
//!
//! Store, serialization, and transport failures are logged server-side with
//! full detail; callers of the composed service surface only coarse
//! success/failure results to clients.

use thiserror::Error;

/// Matchmaking core error type.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Shared ephemeral store operation failed.
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/deserialization of a stored record failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Push transport delivery failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or incomplete match request payload.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using `MatchError`.
pub type Result<T> = std::result::Result<T, MatchError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_formatting() {
        assert_eq!(
            format!("{}", MatchError::Store("timeout".to_string())),
            "Store error: timeout"
        );
        assert_eq!(
            format!("{}", MatchError::InvalidRequest("missing user id".to_string())),
            "Invalid request: missing user id"
        );
        assert_eq!(
            format!("{}", MatchError::Transport("peer gone".to_string())),
            "Transport error: peer gone"
        );
    }
}
