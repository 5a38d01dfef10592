//! Observability: Prometheus metrics and health endpoints.

pub mod health;
pub mod metrics;

pub use health::{health_router, HealthState};
pub use metrics::init_metrics_recorder;
