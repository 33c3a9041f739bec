use super::models::{CreatedEvent, EventPayload};
use crate::error::{submission_error, BotResult};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info};
use url::Url;

/// Event insertion against a calendar provider
#[async_trait]
pub trait CalendarApi: Send + Sync {
    async fn insert_event(
        &self,
        calendar_id: &str,
        payload: &EventPayload,
        access_token: &str,
    ) -> BotResult<CreatedEvent>;
}

/// Google Calendar v3 REST client
#[derive(Clone)]
pub struct CalendarClient {
    client: Client,
    base_url: String,
}

impl CalendarClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn events_url(&self, calendar_id: &str) -> BotResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| submission_error(&format!("Failed to parse URL: {}", e)))?;

        url.path_segments_mut()
            .map_err(|_| submission_error("Calendar API base URL cannot hold a path"))?
            .pop_if_empty()
            .extend(["calendars", calendar_id, "events"]);

        Ok(url)
    }
}

#[async_trait]
impl CalendarApi for CalendarClient {
    async fn insert_event(
        &self,
        calendar_id: &str,
        payload: &EventPayload,
        access_token: &str,
    ) -> BotResult<CreatedEvent> {
        let url = self.events_url(calendar_id)?;
        debug!("Inserting event into {}", url);

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .json(payload)
            .send()
            .await
            .map_err(|e| submission_error(&format!("Failed to create event: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(submission_error(&format!(
                "HTTP {} - {}",
                status, error_body
            )));
        }

        let created: CreatedEvent = response
            .json()
            .await
            .map_err(|e| submission_error(&format!("Failed to parse created event: {}", e)))?;

        info!("Created event {}", created.id);
        Ok(created)
    }
}
