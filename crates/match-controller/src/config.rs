//! Matchmaking core configuration.
//!
//! Configuration is loaded from environment variables. The store connection
//! URL is redacted in Debug output.

use secrecy::SecretString;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default scheduler tick interval in milliseconds.
pub const DEFAULT_SCHEDULER_INTERVAL_MS: u64 = 2_000;

/// Default waiting-profile TTL in seconds.
pub const DEFAULT_PROFILE_TTL_SECONDS: u64 = 600;

/// Default session record TTL in seconds.
pub const DEFAULT_SESSION_TTL_SECONDS: u64 = 7_200;

/// Default Active Queue Index entry TTL in seconds.
pub const DEFAULT_ACTIVE_INDEX_TTL_SECONDS: u64 = 600;

/// Default stale-wait cutoff window in seconds. Entries older than this are
/// evicted at poll time.
pub const DEFAULT_STALE_CUTOFF_SECONDS: u64 = 300;

/// Default global per-cycle extraction cap across all buckets.
pub const DEFAULT_POLL_BATCH_CAP: u64 = 500;

/// Default merge threshold: leftover-singles count at or below which all
/// buckets collapse into one merged pool before the next pairing round.
pub const DEFAULT_MERGE_THRESHOLD: usize = 6;

/// Default chunk size for bulk session writes.
pub const DEFAULT_SESSION_SAVE_CHUNK_SIZE: usize = 100;

/// Default health endpoint bind address.
pub const DEFAULT_HEALTH_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default instance ID prefix.
pub const DEFAULT_INSTANCE_ID_PREFIX: &str = "mm";

/// Matchmaking core configuration.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Clone)]
pub struct Config {
    /// Store connection URL (ephemeral queue/session state).
    /// Protected by `SecretString` to prevent accidental logging.
    pub redis_url: SecretString,

    /// Scheduler tick interval in milliseconds (default: 2000).
    pub scheduler_interval_ms: u64,

    /// Waiting-profile TTL in seconds (default: 600).
    pub profile_ttl_seconds: u64,

    /// Session record TTL in seconds (default: 7200).
    pub session_ttl_seconds: u64,

    /// Active Queue Index entry TTL in seconds (default: 600).
    pub active_index_ttl_seconds: u64,

    /// Stale-wait cutoff window in seconds (default: 300).
    pub stale_cutoff_seconds: u64,

    /// Global per-cycle extraction cap (default: 500).
    pub poll_batch_cap: u64,

    /// Merge threshold for regrouping leftover singles (default: 6).
    pub merge_threshold: usize,

    /// Chunk size for bulk session writes (default: 100).
    pub session_save_chunk_size: usize,

    /// Health endpoint bind address (default: "0.0.0.0:8080").
    pub health_bind_address: String,

    /// Unique identifier for this instance.
    pub instance_id: String,
}

/// Custom Debug implementation that redacts the store URL.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("redis_url", &"[REDACTED]")
            .field("scheduler_interval_ms", &self.scheduler_interval_ms)
            .field("profile_ttl_seconds", &self.profile_ttl_seconds)
            .field("session_ttl_seconds", &self.session_ttl_seconds)
            .field("active_index_ttl_seconds", &self.active_index_ttl_seconds)
            .field("stale_cutoff_seconds", &self.stale_cutoff_seconds)
            .field("poll_batch_cap", &self.poll_batch_cap)
            .field("merge_threshold", &self.merge_threshold)
            .field("session_save_chunk_size", &self.session_save_chunk_size)
            .field("health_bind_address", &self.health_bind_address)
            .field("instance_id", &self.instance_id)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let redis_url = SecretString::from(
            vars.get("REDIS_URL")
                .ok_or_else(|| ConfigError::MissingEnvVar("REDIS_URL".to_string()))?
                .clone(),
        );

        let scheduler_interval_ms = vars
            .get("MM_SCHEDULER_INTERVAL_MS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SCHEDULER_INTERVAL_MS);

        if scheduler_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "MM_SCHEDULER_INTERVAL_MS must be positive".to_string(),
            ));
        }

        let profile_ttl_seconds = vars
            .get("MM_PROFILE_TTL_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_PROFILE_TTL_SECONDS);

        let session_ttl_seconds = vars
            .get("MM_SESSION_TTL_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_SESSION_TTL_SECONDS);

        let active_index_ttl_seconds = vars
            .get("MM_ACTIVE_INDEX_TTL_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_ACTIVE_INDEX_TTL_SECONDS);

        let stale_cutoff_seconds = vars
            .get("MM_STALE_CUTOFF_SECONDS")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_STALE_CUTOFF_SECONDS);

        let poll_batch_cap = vars
            .get("MM_POLL_BATCH_CAP")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POLL_BATCH_CAP);

        if poll_batch_cap == 0 {
            return Err(ConfigError::InvalidValue(
                "MM_POLL_BATCH_CAP must be positive".to_string(),
            ));
        }

        let merge_threshold = vars
            .get("MM_MERGE_THRESHOLD")
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_MERGE_THRESHOLD);

        let session_save_chunk_size = vars
            .get("MM_SESSION_SAVE_CHUNK_SIZE")
            .and_then(|s| s.parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_SESSION_SAVE_CHUNK_SIZE);

        let health_bind_address = vars
            .get("MM_HEALTH_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HEALTH_BIND_ADDRESS.to_string());

        let instance_id = vars.get("MM_ID").cloned().unwrap_or_else(|| {
            let hostname = std::env::var("HOSTNAME").unwrap_or_else(|_| "unknown".to_string());
            let uuid_suffix = uuid::Uuid::new_v4().to_string();
            let short_suffix = uuid_suffix.get(..8).unwrap_or("00000000");
            format!("{DEFAULT_INSTANCE_ID_PREFIX}-{hostname}-{short_suffix}")
        });

        Ok(Config {
            redis_url,
            scheduler_interval_ms,
            profile_ttl_seconds,
            session_ttl_seconds,
            active_index_ttl_seconds,
            stale_cutoff_seconds,
            poll_batch_cap,
            merge_threshold,
            session_save_chunk_size,
            health_bind_address,
            instance_id,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([(
            "REDIS_URL".to_string(),
            "redis://localhost:6379".to_string(),
        )])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load");

        assert_eq!(config.redis_url.expose_secret(), "redis://localhost:6379");
        assert_eq!(config.scheduler_interval_ms, DEFAULT_SCHEDULER_INTERVAL_MS);
        assert_eq!(config.profile_ttl_seconds, DEFAULT_PROFILE_TTL_SECONDS);
        assert_eq!(config.session_ttl_seconds, DEFAULT_SESSION_TTL_SECONDS);
        assert_eq!(
            config.active_index_ttl_seconds,
            DEFAULT_ACTIVE_INDEX_TTL_SECONDS
        );
        assert_eq!(config.stale_cutoff_seconds, DEFAULT_STALE_CUTOFF_SECONDS);
        assert_eq!(config.poll_batch_cap, DEFAULT_POLL_BATCH_CAP);
        assert_eq!(config.merge_threshold, DEFAULT_MERGE_THRESHOLD);
        assert_eq!(
            config.session_save_chunk_size,
            DEFAULT_SESSION_SAVE_CHUNK_SIZE
        );
        assert_eq!(config.health_bind_address, DEFAULT_HEALTH_BIND_ADDRESS);
        assert!(config.instance_id.starts_with("mm-"));
    }

    #[test]
    fn test_from_vars_success_with_custom_values() {
        let mut vars = base_vars();
        vars.insert("MM_SCHEDULER_INTERVAL_MS".to_string(), "500".to_string());
        vars.insert("MM_PROFILE_TTL_SECONDS".to_string(), "120".to_string());
        vars.insert("MM_SESSION_TTL_SECONDS".to_string(), "3600".to_string());
        vars.insert("MM_STALE_CUTOFF_SECONDS".to_string(), "60".to_string());
        vars.insert("MM_POLL_BATCH_CAP".to_string(), "200".to_string());
        vars.insert("MM_MERGE_THRESHOLD".to_string(), "4".to_string());
        vars.insert(
            "MM_HEALTH_BIND_ADDRESS".to_string(),
            "127.0.0.1:9090".to_string(),
        );
        vars.insert("MM_ID".to_string(), "mm-custom-001".to_string());

        let config = Config::from_vars(&vars).expect("Config should load");

        assert_eq!(config.scheduler_interval_ms, 500);
        assert_eq!(config.profile_ttl_seconds, 120);
        assert_eq!(config.session_ttl_seconds, 3600);
        assert_eq!(config.stale_cutoff_seconds, 60);
        assert_eq!(config.poll_batch_cap, 200);
        assert_eq!(config.merge_threshold, 4);
        assert_eq!(config.health_bind_address, "127.0.0.1:9090");
        assert_eq!(config.instance_id, "mm-custom-001");
    }

    #[test]
    fn test_from_vars_missing_redis_url() {
        let result = Config::from_vars(&HashMap::new());
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "REDIS_URL"));
    }

    #[test]
    fn test_from_vars_rejects_zero_interval() {
        let mut vars = base_vars();
        vars.insert("MM_SCHEDULER_INTERVAL_MS".to_string(), "0".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_from_vars_rejects_zero_batch_cap() {
        let mut vars = base_vars();
        vars.insert("MM_POLL_BATCH_CAP".to_string(), "0".to_string());

        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_debug_redacts_store_url() {
        let config = Config::from_vars(&base_vars()).expect("Config should load");
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("redis://"));
    }
}
