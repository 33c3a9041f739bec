mod common;

use chrono::Duration;
use common::{credential, pipeline, CannedCompletion, FakeOAuth, RecordingCalendar};
use promptcal::components::google_calendar::{StoredToken, TokenStore};
use promptcal::pipeline::Outcome;
use std::fs;
use std::sync::Arc;

const LUNCH: &str = r#"{
    "summary": "Lunch with Sam",
    "start": "2026-10-20T12:00:00",
    "end": "2026-10-20T13:00:00",
    "timezone": "America/New_York",
    "recurrence": null
}"#;

const STANDUP: &str = r#"{
    "summary": "Standup",
    "start": "2026-10-20T09:00:00",
    "end": "2026-10-20T09:15:00",
    "timezone": "Europe/Helsinki",
    "recurrence": ["RRULE:FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;UNTIL=20261231T235959Z"]
}"#;

fn save_valid_token(store: &TokenStore) {
    store
        .save(&credential("ya29.valid", Duration::hours(1)))
        .unwrap();
}

#[tokio::test]
async fn test_one_off_event_omits_recurrence() {
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    save_valid_token(&TokenStore::new(&token_path));

    let oauth = Arc::new(FakeOAuth::default());
    let calendar = Arc::new(RecordingCalendar::default());
    let pipeline = pipeline(&token_path, oauth.clone(), CannedCompletion::new(LUNCH), calendar.clone());

    let outcome = pipeline.schedule("Lunch with Sam tomorrow at noon").await;

    assert_eq!(
        outcome,
        Outcome::Confirmed(
            "✅ Event 'Lunch with Sam' scheduled on 2026-10-20 from 12:00 to 13:00.".to_string()
        )
    );

    let inserted = calendar.inserted();
    assert_eq!(inserted.len(), 1);
    let (calendar_id, payload, access_token) = &inserted[0];
    assert_eq!(calendar_id, "primary");
    assert_eq!(access_token, "ya29.valid");
    assert_eq!(payload.recurrence, None);
    assert!(serde_json::to_value(payload).unwrap().get("recurrence").is_none());

    // The model suggested New York; the host zone wins
    assert_eq!(payload.start.time_zone, "Europe/Helsinki");
    assert_eq!(payload.end.time_zone, "Europe/Helsinki");
    assert_eq!(oauth.authorizations(), 0);
}

#[tokio::test]
async fn test_recurring_event_carries_rrule() {
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    save_valid_token(&TokenStore::new(&token_path));

    let calendar = Arc::new(RecordingCalendar::default());
    let pipeline = pipeline(
        &token_path,
        Arc::new(FakeOAuth::default()),
        CannedCompletion::new(STANDUP),
        calendar.clone(),
    );

    let scheduled = pipeline
        .try_schedule("Standup every weekday at 9am until Dec 31")
        .await
        .unwrap();

    assert_eq!(scheduled.descriptor.recurrence.len(), 1);
    assert!(scheduled.descriptor.recurrence[0]
        .starts_with("RRULE:FREQ=WEEKLY;BYDAY=MO,TU,WE,TH,FR;UNTIL="));

    let inserted = calendar.inserted();
    assert_eq!(
        inserted[0].1.recurrence,
        Some(scheduled.descriptor.recurrence.clone())
    );

    match pipeline.schedule("Standup every weekday at 9am until Dec 31").await {
        Outcome::Confirmed(message) => assert!(message.contains("Recurring")),
        other => panic!("expected confirmation, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_completion_never_reaches_calendar() {
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    save_valid_token(&TokenStore::new(&token_path));

    let calendar = Arc::new(RecordingCalendar::default());
    let pipeline = pipeline(
        &token_path,
        Arc::new(FakeOAuth::default()),
        CannedCompletion::new("I'm sorry, I can't do that."),
        calendar.clone(),
    );

    match pipeline.schedule("Dentist on Friday").await {
        Outcome::Failed(message) => {
            assert!(message.starts_with("❌ Error: Could not parse event from prompt"))
        }
        other => panic!("expected failure, got {:?}", other),
    }
    assert!(calendar.inserted().is_empty());
}

#[tokio::test]
async fn test_corrupted_token_file_triggers_authorization() {
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    fs::write(&token_path, "this is not a token").unwrap();

    let oauth = Arc::new(FakeOAuth {
        authorize_ok: true,
        ..Default::default()
    });
    let calendar = Arc::new(RecordingCalendar::default());
    let pipeline = pipeline(&token_path, oauth.clone(), CannedCompletion::new(LUNCH), calendar.clone());

    let outcome = pipeline.schedule("Lunch with Sam tomorrow at noon").await;

    assert!(matches!(outcome, Outcome::Confirmed(_)));
    assert_eq!(oauth.authorizations(), 1);
    assert_eq!(calendar.inserted()[0].2, "ya29.interactive");
    match TokenStore::new(&token_path).load().unwrap() {
        StoredToken::Present(saved) => assert_eq!(saved.access_token, "ya29.interactive"),
        other => panic!("expected a rewritten token, got {:?}", other),
    }
}

#[tokio::test]
async fn test_revoked_refresh_token_reauthorizes() {
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    TokenStore::new(&token_path)
        .save(&credential("ya29.stale", Duration::hours(-2)))
        .unwrap();

    let oauth = Arc::new(FakeOAuth {
        refresh_ok: false,
        authorize_ok: true,
        ..Default::default()
    });
    let calendar = Arc::new(RecordingCalendar::default());
    let pipeline = pipeline(&token_path, oauth.clone(), CannedCompletion::new(LUNCH), calendar.clone());

    let outcome = pipeline.schedule("Lunch with Sam tomorrow at noon").await;

    assert!(matches!(outcome, Outcome::Confirmed(_)));
    assert_eq!(oauth.refreshes(), 1);
    assert_eq!(oauth.authorizations(), 1);
    assert_eq!(calendar.inserted()[0].2, "ya29.interactive");
}

#[tokio::test]
async fn test_expired_token_is_refreshed_without_consent() {
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    TokenStore::new(&token_path)
        .save(&credential("ya29.stale", Duration::hours(-2)))
        .unwrap();

    let oauth = Arc::new(FakeOAuth {
        refresh_ok: true,
        ..Default::default()
    });
    let calendar = Arc::new(RecordingCalendar::default());
    let pipeline = pipeline(&token_path, oauth.clone(), CannedCompletion::new(LUNCH), calendar.clone());

    assert!(matches!(
        pipeline.schedule("Lunch with Sam tomorrow at noon").await,
        Outcome::Confirmed(_)
    ));
    assert_eq!(oauth.authorizations(), 0);
    assert_eq!(calendar.inserted()[0].2, "ya29.refreshed");
}

#[tokio::test]
async fn test_authorization_failure_stops_before_completion() {
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");

    let completion = CannedCompletion::new(LUNCH);
    let calendar = Arc::new(RecordingCalendar::default());
    let pipeline = pipeline(
        &token_path,
        Arc::new(FakeOAuth::default()),
        completion.clone(),
        calendar.clone(),
    );

    match pipeline.schedule("Lunch with Sam tomorrow at noon").await {
        Outcome::Failed(message) => assert!(message.starts_with("❌ Error: Credential unavailable")),
        other => panic!("expected failure, got {:?}", other),
    }
    assert_eq!(completion.calls(), 0);
    assert!(calendar.inserted().is_empty());
    assert!(!token_path.exists());
}

#[tokio::test]
async fn test_calendar_rejection_is_reported_once() {
    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    save_valid_token(&TokenStore::new(&token_path));

    let calendar = Arc::new(RecordingCalendar {
        reject_with: Some("HTTP 403 Forbidden - rateLimitExceeded".to_string()),
        ..Default::default()
    });
    let pipeline = pipeline(
        &token_path,
        Arc::new(FakeOAuth::default()),
        CannedCompletion::new(LUNCH),
        calendar,
    );

    assert_eq!(
        pipeline.schedule("Lunch with Sam tomorrow at noon").await,
        Outcome::Failed(
            "❌ Error: Calendar rejected the event: HTTP 403 Forbidden - rateLimitExceeded"
                .to_string()
        )
    );
}
