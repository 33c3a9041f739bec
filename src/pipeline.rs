use crate::components::google_calendar::{
    time::now_in, CalendarClient, CreatedEvent, EventMaterializer, GoogleOAuth, HostTimezone,
    TokenManager, TokenStore,
};
use crate::components::prompt_parser::{EventDescriptor, GroqCompletion, PromptParser};
use crate::config::Config;
use crate::error::{parse_error, BotResult, Error};
use chrono_tz::Tz;
use std::sync::Arc;
use tracing::{error, info};

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct ScheduledEvent {
    pub descriptor: EventDescriptor,
    pub created: CreatedEvent,
    pub timezone: Tz,
}

/// The single line reported back to the caller
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Confirmed(String),
    Failed(String),
}

/// Credential, then parse, then submit
#[derive(Clone)]
pub struct Pipeline {
    tokens: TokenManager,
    parser: PromptParser,
    materializer: EventMaterializer,
}

impl Pipeline {
    pub fn new(tokens: TokenManager, parser: PromptParser, materializer: EventMaterializer) -> Self {
        Self {
            tokens,
            parser,
            materializer,
        }
    }

    /// Wire the production collaborators from configuration
    pub fn from_config(config: &Config) -> BotResult<Self> {
        let tokens = TokenManager::new(
            TokenStore::new(config.token_path.clone()),
            Arc::new(GoogleOAuth::new(config)),
        );
        let parser = PromptParser::new(Arc::new(GroqCompletion::new(config)));
        let materializer = EventMaterializer::new(
            Arc::new(CalendarClient::new(&config.calendar_api_base)),
            Arc::new(HostTimezone::new(&config.fallback_timezone)?),
            &config.calendar_id,
        );

        Ok(Self::new(tokens, parser, materializer))
    }

    /// Run every stage, stopping at the first failure
    pub async fn try_schedule(&self, prompt: &str) -> BotResult<ScheduledEvent> {
        if prompt.trim().is_empty() {
            return Err(parse_error("Prompt is empty"));
        }

        let credential = self.tokens.ensure_credential().await?;

        let timezone = self.materializer.resolve_timezone()?;
        let descriptor = self.parser.parse(prompt, now_in(timezone)).await?;

        let created = self.materializer.materialize(&descriptor, &credential).await?;
        info!("Scheduled event {}", created.id);

        Ok(ScheduledEvent {
            descriptor,
            created,
            timezone,
        })
    }

    pub async fn schedule(&self, prompt: &str) -> Outcome {
        match self.try_schedule(prompt).await {
            Ok(scheduled) => Outcome::Confirmed(confirmation_message(&scheduled.descriptor)),
            Err(e) => {
                error!("Scheduling failed: {:?}", e);
                Outcome::Failed(error_message(&e))
            }
        }
    }
}

pub fn confirmation_message(descriptor: &EventDescriptor) -> String {
    let mut message = format!(
        "✅ Event '{}' scheduled on {} from {} to {}.",
        descriptor.summary,
        descriptor.start.format("%Y-%m-%d"),
        descriptor.start.format("%H:%M"),
        descriptor.end.format("%H:%M")
    );
    if descriptor.is_recurring() {
        message.push_str(" 🔁 Recurring event.");
    }
    message
}

pub fn error_message(err: &Error) -> String {
    format!("❌ Error: {}", err)
}
