use crate::config::Config;
use crate::error::{completion_error, BotResult};
use async_trait::async_trait;
use rig::completion::{Chat, Message};
use rig::providers::openai::Client as OpenAIClient;
use serde_json::json;
use tracing::info;

/// A language model that turns an instruction plus prompt into text
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> BotResult<String>;
}

/// Groq through its OpenAI-compatible API, in JSON-object response mode
pub struct GroqCompletion {
    client: OpenAIClient,
    model: String,
}

impl GroqCompletion {
    pub fn new(config: &Config) -> Self {
        Self {
            client: OpenAIClient::from_url(&config.groq_api_key, &config.completion_base_url),
            model: config.completion_model.clone(),
        }
    }
}

#[async_trait]
impl CompletionBackend for GroqCompletion {
    async fn complete(&self, system: &str, prompt: &str) -> BotResult<String> {
        info!("Requesting completion from model {}", self.model);

        let agent = self
            .client
            .agent(&self.model)
            .preamble(system)
            .temperature(0.0)
            .additional_params(json!({ "response_format": { "type": "json_object" } }))
            .build();

        let response = agent
            .chat(prompt.to_string(), Vec::<Message>::new())
            .await
            .map_err(|e| completion_error(&format!("Completion API request failed: {}", e)))?;

        info!("Received completion response");
        Ok(response)
    }
}
