mod common;

use chrono::Duration;
use common::{credential, pipeline, CannedCompletion, FakeOAuth};
use promptcal::components::google_calendar::{CalendarClient, TokenStore};
use promptcal::config::Config;
use promptcal::pipeline::{Outcome, Pipeline};
use std::collections::HashMap;
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(token_path: &str) -> Config {
    let env: HashMap<&str, &str> = HashMap::from([
        ("GROQ_API_KEY", "gsk_test"),
        ("GOOGLE_TOKEN_FILE", token_path),
        ("TIMEZONE", "Europe/Helsinki"),
    ]);
    Config::from_sources(|key| env.get(key).map(|v| v.to_string()), None).unwrap()
}

/// Smoke test to verify that the production pipeline can be wired from config
#[test]
fn test_pipeline_builds_from_config() {
    let config = test_config("/tmp/promptcal-smoke-token.json");
    assert_eq!(config.fallback_timezone, "Europe/Helsinki");
    assert!(Pipeline::from_config(&config).is_ok());
}

/// The real calendar client receives the materialized payload
#[tokio::test]
async fn test_schedule_against_calendar_api() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/calendars/primary/events"))
        .and(header("Authorization", "Bearer ya29.valid"))
        .and(body_partial_json(serde_json::json!({
            "summary": "Team retro",
            "start": {"dateTime": "2026-10-23T15:00:00", "timeZone": "Europe/Helsinki"},
            "end": {"dateTime": "2026-10-23T16:00:00", "timeZone": "Europe/Helsinki"},
            "recurrence": ["RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=FR"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "retro1",
            "status": "confirmed",
            "htmlLink": "https://www.google.com/calendar/event?eid=retro1"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let token_path = dir.path().join("token.json");
    TokenStore::new(&token_path)
        .save(&credential("ya29.valid", Duration::hours(1)))
        .unwrap();

    let completion = CannedCompletion::new(
        "```json\n{\"summary\": \"Team retro\", \"start\": \"2026-10-23T15:00:00\", \"end\": \"2026-10-23T16:00:00\", \"timezone\": \"UTC\", \"recurrence\": [\"FREQ=WEEKLY;INTERVAL=2;BYDAY=FR\"]}\n```",
    );
    let pipeline = pipeline(
        &token_path,
        Arc::new(FakeOAuth::default()),
        completion,
        Arc::new(CalendarClient::new(&mock_server.uri())),
    );

    let outcome = pipeline.schedule("Team retro every other Friday at 3pm").await;

    assert_eq!(
        outcome,
        Outcome::Confirmed(
            "✅ Event 'Team retro' scheduled on 2026-10-23 from 15:00 to 16:00. 🔁 Recurring event."
                .to_string()
        )
    );
}
