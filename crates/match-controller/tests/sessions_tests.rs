//! Session-registry tests: save/lookup, audit forwarding, partner
//! resolution, close-down, and chunked batch writes.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use match_controller::audit::AuditSink;
use match_controller::config::Config;
use match_controller::models::{Gender, Language, Region, SessionData};
use match_controller::repositories::SessionRepository;
use match_controller::store::EphemeralStore;
use match_test_utils::audit::RecordingAuditSink;
use match_test_utils::fixtures;
use match_test_utils::MemoryStore;

fn test_config() -> Config {
    let vars = HashMap::from([(
        "REDIS_URL".to_string(),
        "redis://localhost:6379".to_string(),
    )]);
    Config::from_vars(&vars).unwrap()
}

fn repo(
    store: &Arc<MemoryStore>,
    audit: &Arc<RecordingAuditSink>,
) -> SessionRepository {
    SessionRepository::new(
        Arc::clone(store) as Arc<dyn EphemeralStore>,
        Arc::clone(audit) as Arc<dyn AuditSink>,
        &test_config(),
    )
}

fn sample_session() -> SessionData {
    let a = fixtures::profile("ext-a", Gender::Male, Language::Ko, Region::Kr);
    let b = fixtures::profile("ext-b", Gender::Male, Language::Ko, Region::Kr);
    SessionData::from_pair(&a, &b)
}

async fn wait_for<F: Fn() -> bool>(condition: F) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

#[tokio::test]
async fn test_save_then_lookup_by_id_and_participant() {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAuditSink::new());
    let sessions = repo(&store, &audit);

    let session = sample_session();
    assert!(sessions.save_sessions(std::slice::from_ref(&session)).await);

    let by_id = sessions.get_session(&session.session_id).await;
    assert_eq!(by_id.as_ref(), Some(&session));

    let by_a = sessions.get_session_by_user_id("ext-a").await;
    let by_b = sessions.get_session_by_user_id("ext-b").await;
    assert_eq!(by_a.as_ref().map(|s| s.session_id.as_str()), Some(session.session_id.as_str()));
    assert_eq!(by_b.as_ref().map(|s| s.session_id.as_str()), Some(session.session_id.as_str()));
}

#[tokio::test]
async fn test_save_forwards_to_audit_sink() {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAuditSink::new());
    let sessions = repo(&store, &audit);

    let session = sample_session();
    assert!(sessions.save_sessions(std::slice::from_ref(&session)).await);

    let audit_probe = Arc::clone(&audit);
    wait_for(move || !audit_probe.recorded_sessions().is_empty()).await;
    assert_eq!(audit.recorded_sessions().len(), 1);
}

#[tokio::test]
async fn test_missing_session_lookups_return_none() {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAuditSink::new());
    let sessions = repo(&store, &audit);

    assert!(sessions.get_session("nope").await.is_none());
    assert!(sessions.get_session_by_user_id("nobody").await.is_none());
}

#[test]
fn test_find_partner_id() {
    let session = sample_session();

    assert_eq!(
        SessionRepository::find_partner_id(Some(&session), "ext-a"),
        Some("ext-b".to_string())
    );
    assert_eq!(
        SessionRepository::find_partner_id(Some(&session), "ext-b"),
        Some("ext-a".to_string())
    );
    assert_eq!(
        SessionRepository::find_partner_id(Some(&session), "ext-c"),
        None
    );
    assert_eq!(SessionRepository::find_partner_id(None, "ext-a"), None);
}

#[tokio::test]
async fn test_close_session_removes_record_and_backrefs() {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAuditSink::new());
    let sessions = repo(&store, &audit);

    let session = sample_session();
    assert!(sessions.save_sessions(std::slice::from_ref(&session)).await);

    sessions.close_session(Some(&session)).await;

    // Direct store inspection: record and every back-reference gone.
    let session_key = format!("mm:session:{}", session.session_id);
    assert!(!store.contains_value(&session_key));
    assert!(!store.contains_value("mm:session:user:ext-a"));
    assert!(!store.contains_value("mm:session:user:ext-b"));

    let audit_probe = Arc::clone(&audit);
    wait_for(move || !audit_probe.ended_events().is_empty()).await;
    let events = audit.ended_events();
    assert_eq!(events.len(), 1);
    assert_eq!(
        events.first().map(|e| e.session_id.as_str()),
        Some(session.session_id.as_str())
    );
    assert!(events.first().map_or(false, |e| e.ended_at >= e.started_at));
}

#[tokio::test]
async fn test_close_session_none_is_noop() {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAuditSink::new());
    let sessions = repo(&store, &audit);

    sessions.close_session(None).await;
    assert!(audit.ended_events().is_empty());
}

#[tokio::test]
async fn test_save_sessions_chunks_large_input() {
    let store = Arc::new(MemoryStore::new());
    let audit = Arc::new(RecordingAuditSink::new());
    let sessions = repo(&store, &audit);

    let batch: Vec<SessionData> = (0..250)
        .map(|i| {
            let a = fixtures::profile(
                &format!("a-{i}"),
                Gender::Male,
                Language::Ko,
                Region::Kr,
            );
            let b = fixtures::profile(
                &format!("b-{i}"),
                Gender::Male,
                Language::Ko,
                Region::Kr,
            );
            SessionData::from_pair(&a, &b)
        })
        .collect();

    assert!(sessions.save_sessions(&batch).await);

    for session in &batch {
        assert!(sessions.get_session(&session.session_id).await.is_some());
    }
}
