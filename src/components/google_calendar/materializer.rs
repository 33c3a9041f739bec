use super::client::CalendarApi;
use super::models::{CreatedEvent, EventDateTime, EventPayload};
use super::time::{format_wall_clock, TimezoneSource};
use super::token::Credential;
use crate::components::prompt_parser::EventDescriptor;
use crate::error::BotResult;
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{debug, info};

/// Build the insertion payload for `descriptor` in zone `tz`.
///
/// The descriptor's own timezone hint is not consulted. Recurrence is only
/// attached when there is at least one rule, since field presence turns
/// recurrence on.
pub fn build_payload(descriptor: &EventDescriptor, tz: Tz) -> EventPayload {
    let zone = tz.name().to_string();

    EventPayload {
        summary: descriptor.summary.clone(),
        start: EventDateTime {
            date_time: format_wall_clock(&descriptor.start),
            time_zone: zone.clone(),
        },
        end: EventDateTime {
            date_time: format_wall_clock(&descriptor.end),
            time_zone: zone,
        },
        recurrence: if descriptor.recurrence.is_empty() {
            None
        } else {
            Some(descriptor.recurrence.clone())
        },
    }
}

/// Turns a descriptor into a created calendar event
#[derive(Clone)]
pub struct EventMaterializer {
    calendar: Arc<dyn CalendarApi>,
    timezone: Arc<dyn TimezoneSource>,
    calendar_id: String,
}

impl EventMaterializer {
    pub fn new(
        calendar: Arc<dyn CalendarApi>,
        timezone: Arc<dyn TimezoneSource>,
        calendar_id: &str,
    ) -> Self {
        Self {
            calendar,
            timezone,
            calendar_id: calendar_id.to_string(),
        }
    }

    pub fn resolve_timezone(&self) -> BotResult<Tz> {
        self.timezone.resolve()
    }

    pub async fn materialize(
        &self,
        descriptor: &EventDescriptor,
        credential: &Credential,
    ) -> BotResult<CreatedEvent> {
        let tz = self.resolve_timezone()?;

        if let Some(hint) = descriptor.timezone.as_deref() {
            if hint != tz.name() {
                debug!("Ignoring suggested timezone {} in favor of {}", hint, tz);
            }
        }

        let payload = build_payload(descriptor, tz);
        info!(
            "Submitting '{}' to calendar {} ({} recurrence rules)",
            payload.summary,
            self.calendar_id,
            descriptor.recurrence.len()
        );

        self.calendar
            .insert_event(&self.calendar_id, &payload, &credential.access_token)
            .await
    }
}
