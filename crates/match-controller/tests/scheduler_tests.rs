//! Scheduler task timing tests.
//!
//! Uses tokio's test-util time control to verify the interval-driven loop
//! pairs waiters, keeps ticking, and stops on cancellation.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use match_controller::audit::AuditSink;
use match_controller::config::Config;
use match_controller::models::{MatchRequest, MatchStatus, OutboundMessage, Region};
use match_controller::services::MatchingService;
use match_controller::store::EphemeralStore;
use match_controller::tasks::start_match_scheduler;
use match_controller::transport::PushTransport;
use match_test_utils::{CapturingTransport, MemoryStore, RecordingAuditSink};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn build_service() -> (Arc<MatchingService>, Arc<CapturingTransport>) {
    let vars = HashMap::from([(
        "REDIS_URL".to_string(),
        "redis://localhost:6379".to_string(),
    )]);
    let config = Config::from_vars(&vars).unwrap();

    let transport = Arc::new(CapturingTransport::new());
    let service = Arc::new(MatchingService::new(
        Arc::new(MemoryStore::new()) as Arc<dyn EphemeralStore>,
        Arc::clone(&transport) as Arc<dyn PushTransport>,
        Arc::new(RecordingAuditSink::new()) as Arc<dyn AuditSink>,
        &config,
    ));

    (service, transport)
}

fn kr_request(user_id: i64) -> MatchRequest {
    MatchRequest {
        user_id,
        region: Some("kr".to_string()),
        gender: Some("male".to_string()),
        language: Some("ko".to_string()),
    }
}

fn success_count(transport: &CapturingTransport, external_id: &str) -> usize {
    transport
        .sent_to(external_id)
        .into_iter()
        .filter(|message| {
            matches!(
                message,
                OutboundMessage::MatchingResult(result) if result.status == MatchStatus::Success
            )
        })
        .count()
}

async fn settle() {
    // Let the spawned scheduler task make progress under paused time.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_first_tick_pairs_waiting_users() {
    let (service, transport) = build_service();

    service.request_match("ext-a", Region::Kr, &kr_request(1)).await;
    service.request_match("ext-b", Region::Kr, &kr_request(2)).await;

    let cancel_token = CancellationToken::new();
    tokio::spawn(start_match_scheduler(
        Arc::clone(&service),
        Duration::from_secs(2),
        cancel_token.clone(),
    ));

    // The first interval tick fires immediately.
    tokio::time::advance(Duration::from_millis(10)).await;
    settle().await;

    assert_eq!(success_count(&transport, "ext-a"), 1);
    assert_eq!(success_count(&transport, "ext-b"), 1);

    cancel_token.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_later_arrivals_pair_on_a_later_tick() {
    let (service, transport) = build_service();

    let cancel_token = CancellationToken::new();
    tokio::spawn(start_match_scheduler(
        Arc::clone(&service),
        Duration::from_secs(2),
        cancel_token.clone(),
    ));

    tokio::time::advance(Duration::from_millis(10)).await;
    settle().await;

    // Nobody waiting yet; nothing delivered.
    assert!(transport.all_sent().is_empty());

    service.request_match("ext-c", Region::Kr, &kr_request(3)).await;
    service.request_match("ext-d", Region::Kr, &kr_request(4)).await;

    tokio::time::advance(Duration::from_secs(2)).await;
    settle().await;

    assert_eq!(success_count(&transport, "ext-c"), 1);
    assert_eq!(success_count(&transport, "ext-d"), 1);

    cancel_token.cancel();
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_the_loop() {
    let (service, transport) = build_service();

    let cancel_token = CancellationToken::new();
    tokio::spawn(start_match_scheduler(
        Arc::clone(&service),
        Duration::from_secs(2),
        cancel_token.clone(),
    ));

    tokio::time::advance(Duration::from_millis(10)).await;
    settle().await;

    cancel_token.cancel();
    settle().await;

    // Users arriving after cancellation are never paired.
    service.request_match("ext-e", Region::Kr, &kr_request(5)).await;
    service.request_match("ext-f", Region::Kr, &kr_request(6)).await;

    tokio::time::advance(Duration::from_secs(10)).await;
    settle().await;

    assert_eq!(success_count(&transport, "ext-e"), 0);
    assert_eq!(success_count(&transport, "ext-f"), 0);
}
