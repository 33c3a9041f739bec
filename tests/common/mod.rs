#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, Utc};
use promptcal::components::google_calendar::{
    CalendarApi, CreatedEvent, Credential, EventMaterializer, EventPayload, FixedTimezone,
    OAuthFlow, TokenManager, TokenStore,
};
use promptcal::components::prompt_parser::{CompletionBackend, PromptParser};
use promptcal::error::{credential_error, submission_error, BotResult};
use promptcal::pipeline::Pipeline;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn credential(access_token: &str, expires_in: Duration) -> Credential {
    Credential {
        access_token: access_token.to_string(),
        refresh_token: Some("1//refresh".to_string()),
        token_uri: "https://oauth2.googleapis.com/token".to_string(),
        client_id: "client-id.apps.googleusercontent.com".to_string(),
        client_secret: "client-secret".to_string(),
        scopes: vec!["https://www.googleapis.com/auth/calendar".to_string()],
        expiry: Some(Utc::now() + expires_in),
    }
}

/// OAuth flow with scripted outcomes
#[derive(Default)]
pub struct FakeOAuth {
    pub refresh_ok: bool,
    pub authorize_ok: bool,
    pub refreshes: AtomicUsize,
    pub authorizations: AtomicUsize,
}

impl FakeOAuth {
    pub fn refreshes(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }

    pub fn authorizations(&self) -> usize {
        self.authorizations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OAuthFlow for FakeOAuth {
    async fn refresh(&self, current: &Credential) -> BotResult<Credential> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.refresh_ok {
            let mut refreshed = current.clone();
            refreshed.access_token = "ya29.refreshed".to_string();
            refreshed.expiry = Some(Utc::now() + Duration::hours(1));
            Ok(refreshed)
        } else {
            Err(credential_error("invalid_grant: Token has been expired or revoked."))
        }
    }

    async fn authorize(&self) -> BotResult<Credential> {
        self.authorizations.fetch_add(1, Ordering::SeqCst);
        if self.authorize_ok {
            Ok(credential("ya29.interactive", Duration::hours(1)))
        } else {
            Err(credential_error("consent window closed"))
        }
    }
}

/// Completion backend returning a fixed body
pub struct CannedCompletion {
    body: String,
    calls: AtomicUsize,
}

impl CannedCompletion {
    pub fn new(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: body.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for CannedCompletion {
    async fn complete(&self, _system: &str, _prompt: &str) -> BotResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.body.clone())
    }
}

/// Calendar that records what it was asked to insert
#[derive(Default)]
pub struct RecordingCalendar {
    pub reject_with: Option<String>,
    pub inserted: Mutex<Vec<(String, EventPayload, String)>>,
}

impl RecordingCalendar {
    pub fn inserted(&self) -> Vec<(String, EventPayload, String)> {
        self.inserted.lock().unwrap().clone()
    }
}

#[async_trait]
impl CalendarApi for RecordingCalendar {
    async fn insert_event(
        &self,
        calendar_id: &str,
        payload: &EventPayload,
        access_token: &str,
    ) -> BotResult<CreatedEvent> {
        if let Some(reason) = &self.reject_with {
            return Err(submission_error(reason));
        }
        self.inserted.lock().unwrap().push((
            calendar_id.to_string(),
            payload.clone(),
            access_token.to_string(),
        ));
        Ok(CreatedEvent {
            id: "evt-1".to_string(),
            status: Some("confirmed".to_string()),
            summary: Some(payload.summary.clone()),
            ..Default::default()
        })
    }
}

pub fn pipeline(
    token_path: &Path,
    oauth: Arc<FakeOAuth>,
    completion: Arc<CannedCompletion>,
    calendar: Arc<dyn CalendarApi>,
) -> Pipeline {
    Pipeline::new(
        TokenManager::new(TokenStore::new(token_path), oauth),
        PromptParser::new(completion),
        EventMaterializer::new(
            calendar,
            Arc::new(FixedTimezone(chrono_tz::Europe::Helsinki)),
            "primary",
        ),
    )
}
