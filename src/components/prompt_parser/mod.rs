mod backend;
mod models;
mod prompt;

pub use backend::{CompletionBackend, GroqCompletion};
pub use models::{normalize_recurrence, parse_wall_clock, validate_rrule, EventDescriptor};
pub use prompt::system_instruction;

use crate::error::{parse_error, BotResult};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Turns a freeform prompt into an [`EventDescriptor`]
#[derive(Clone)]
pub struct PromptParser {
    backend: Arc<dyn CompletionBackend>,
}

impl PromptParser {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self { backend }
    }

    /// Ask the model to structure `prompt`, with `now` as the reference for
    /// relative dates, and validate what comes back
    pub async fn parse(&self, prompt: &str, now: NaiveDateTime) -> BotResult<EventDescriptor> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(parse_error("Prompt is empty"));
        }

        let instruction = system_instruction(now);
        let response = self.backend.complete(&instruction, prompt).await?;
        debug!("Raw completion response: {}", response);

        let json = extract_json_object(&response).ok_or_else(|| {
            error!("Could not extract a JSON object from response: {}", response);
            parse_error("Completion response is not a JSON object")
        })?;

        let descriptor = EventDescriptor::decode(json)?;
        info!(
            "Parsed '{}' from {} to {} ({} recurrence rules)",
            descriptor.summary,
            descriptor.start,
            descriptor.end,
            descriptor.recurrence.len()
        );
        Ok(descriptor)
    }
}

/// Locate the JSON object in a model response, tolerating a Markdown fence
/// or stray text around it
pub fn extract_json_object(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    let unfenced = if let Some(inner) = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
    {
        inner.trim_end_matches("```").trim()
    } else {
        trimmed
    };

    if unfenced.starts_with('{') && unfenced.ends_with('}') {
        return Some(unfenced);
    }

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    (start < end).then(|| &unfenced[start..=end])
}
