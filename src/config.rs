use crate::error::{config_error, env_error, BotResult};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Default completion model
pub const DEFAULT_MODEL: &str = "mixtral-8x7b-32768";
/// Groq's OpenAI-compatible endpoint
pub const DEFAULT_COMPLETION_BASE_URL: &str = "https://api.groq.com/openai/v1";
/// Google Calendar REST API root
pub const DEFAULT_CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
/// Optional overrides file, relative to the working directory
pub const CONFIG_FILE: &str = "config/promptcal.toml";

/// Main configuration structure
#[derive(Debug, Clone)]
pub struct Config {
    /// API key for the completion provider
    pub groq_api_key: String,
    /// Completion model identifier
    pub completion_model: String,
    /// Base URL of the OpenAI-compatible completion API
    pub completion_base_url: String,
    /// Externally provisioned OAuth client secret (read only)
    pub client_secret_path: PathBuf,
    /// Persisted authorized-user token
    pub token_path: PathBuf,
    /// Calendar receiving new events
    pub calendar_id: String,
    /// Google Calendar API root
    pub calendar_api_base: String,
    /// Zone used when the host zone cannot be determined
    pub fallback_timezone: String,
    /// Seconds to wait for the browser redirect during interactive authorization
    pub auth_timeout_secs: u64,
}

/// Keys accepted in `config/promptcal.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    completion_model: Option<String>,
    completion_base_url: Option<String>,
    client_secret_path: Option<PathBuf>,
    token_path: Option<PathBuf>,
    calendar_id: Option<String>,
    calendar_api_base: Option<String>,
    fallback_timezone: Option<String>,
    auth_timeout_secs: Option<u64>,
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> BotResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let file = fs::read_to_string(CONFIG_FILE).ok();
        Self::from_sources(|key| env::var(key).ok(), file.as_deref())
    }

    /// Build a config from an environment lookup and optional TOML overrides.
    ///
    /// Environment values win over the file, the file wins over defaults.
    pub fn from_sources<F>(lookup: F, file: Option<&str>) -> BotResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = match file {
            Some(content) => toml::from_str(content)?,
            None => FileConfig::default(),
        };

        let groq_api_key = lookup("GROQ_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| env_error("GROQ_API_KEY"))?;

        let completion_model = lookup("GROQ_MODEL")
            .or(file.completion_model)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        let completion_base_url = lookup("GROQ_BASE_URL")
            .or(file.completion_base_url)
            .unwrap_or_else(|| DEFAULT_COMPLETION_BASE_URL.to_string());

        let client_secret_path = lookup("GOOGLE_CLIENT_SECRET_FILE")
            .map(PathBuf::from)
            .or(file.client_secret_path)
            .unwrap_or_else(|| PathBuf::from("credentials.json"));

        let token_path = lookup("GOOGLE_TOKEN_FILE")
            .map(PathBuf::from)
            .or(file.token_path)
            .unwrap_or_else(|| PathBuf::from("token.json"));

        let calendar_id = lookup("GOOGLE_CALENDAR_ID")
            .or(file.calendar_id)
            .unwrap_or_else(|| String::from("primary"));

        let calendar_api_base = file
            .calendar_api_base
            .unwrap_or_else(|| DEFAULT_CALENDAR_API_BASE.to_string());

        // Default timezone
        let fallback_timezone = lookup("TIMEZONE")
            .or(file.fallback_timezone)
            .unwrap_or_else(|| String::from("UTC"));
        if fallback_timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(config_error(&format!(
                "Invalid TIMEZONE '{}', expected an IANA zone name",
                fallback_timezone
            )));
        }

        let auth_timeout_secs = match lookup("GOOGLE_AUTH_TIMEOUT") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|_| config_error("Invalid GOOGLE_AUTH_TIMEOUT format"))?,
            None => file.auth_timeout_secs.unwrap_or(300),
        };

        Ok(Config {
            groq_api_key,
            completion_model,
            completion_base_url,
            client_secret_path,
            token_path,
            calendar_id,
            calendar_api_base,
            fallback_timezone,
            auth_timeout_secs,
        })
    }
}
