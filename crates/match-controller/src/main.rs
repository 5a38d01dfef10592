//! Matchmaking controller.
//!
//! # Startup Flow
//!
//! 1. Initialize tracing (EnvFilter)
//! 2. Load configuration from environment
//! 3. Install the Prometheus metrics recorder
//! 4. Connect to the shared ephemeral store (readiness gate)
//! 5. Start the health/metrics HTTP server
//! 6. Build the matchmaking core and spawn the scheduler task
//! 7. Wait for shutdown signal, then cancel and drain

#![warn(clippy::pedantic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use match_controller::audit::TracingAuditSink;
use match_controller::config::Config;
use match_controller::observability::{health_router, init_metrics_recorder, HealthState};
use match_controller::services::MatchingService;
use match_controller::store::RedisStore;
use match_controller::tasks::start_match_scheduler;
use match_controller::transport::TracingPushTransport;
use secrecy::ExposeSecret;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "match_controller=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting matchmaking controller");

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!(e)
    })?;

    info!(
        instance_id = %config.instance_id,
        scheduler_interval_ms = config.scheduler_interval_ms,
        poll_batch_cap = config.poll_batch_cap,
        merge_threshold = config.merge_threshold,
        health_bind_address = %config.health_bind_address,
        "Configuration loaded successfully"
    );

    // Metrics recorder must be installed before any metrics are recorded.
    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        anyhow::anyhow!(e)
    })?;

    let health_state = Arc::new(HealthState::new());

    info!("Connecting to store...");
    let store = RedisStore::new(config.redis_url.expose_secret())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to connect to store");
            anyhow::anyhow!(e)
        })?;
    info!("Store connection established");

    let shutdown_token = CancellationToken::new();

    // Health/metrics server. Bind before spawning to fail fast on bind
    // errors.
    let health_addr: SocketAddr = config.health_bind_address.parse().map_err(|e| {
        error!(error = %e, addr = %config.health_bind_address, "Invalid health bind address");
        anyhow::anyhow!("Invalid health bind address: {e}")
    })?;

    let metrics_router = Router::new().route(
        "/metrics",
        axum::routing::get(move || {
            let handle = prometheus_handle.clone();
            async move { handle.render() }
        }),
    );
    let app = health_router(Arc::clone(&health_state)).merge(metrics_router);

    let listener = tokio::net::TcpListener::bind(health_addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %health_addr, "Failed to bind health server");
            anyhow::anyhow!("Failed to bind health server to {health_addr}: {e}")
        })?;
    info!(addr = %health_addr, "Health server bound successfully");

    let health_shutdown_token = shutdown_token.child_token();
    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            health_shutdown_token.cancelled().await;
            info!("Health server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Health server failed");
        }
    });
    info!(addr = %health_addr, "Health server started");

    // Build the matchmaking core. The push transport and audit sink are
    // deployment wiring points; the tracing stand-ins log instead of
    // delivering/persisting.
    let service = Arc::new(MatchingService::new(
        Arc::new(store),
        Arc::new(TracingPushTransport),
        Arc::new(TracingAuditSink),
        &config,
    ));

    let scheduler_token = shutdown_token.child_token();
    let scheduler_service = Arc::clone(&service);
    let scheduler_interval = Duration::from_millis(config.scheduler_interval_ms);
    tokio::spawn(async move {
        start_match_scheduler(scheduler_service, scheduler_interval, scheduler_token).await;
    });
    info!("Matching scheduler started");

    health_state.set_ready();
    info!("Matchmaking controller running - press Ctrl+C to shutdown");
    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");

    // Stop readiness first so traffic drains before the scheduler stops.
    health_state.set_not_ready();
    shutdown_token.cancel();

    // Give in-flight work time to finish.
    tokio::time::sleep(Duration::from_secs(2)).await;

    info!("Matchmaking controller shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. This is acceptable
/// because without signal handlers, we cannot gracefully shut down the
/// service.
async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
