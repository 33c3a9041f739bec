use miette::Diagnostic;
use thiserror::Error;

/// Main error type for the application
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Credential unavailable: {0}")]
    #[diagnostic(code(promptcal::credential))]
    Credential(String),

    #[error("Could not parse event from prompt: {0}")]
    #[diagnostic(code(promptcal::parse))]
    Parse(String),

    #[error("Calendar rejected the event: {0}")]
    #[diagnostic(code(promptcal::submission))]
    Submission(String),

    #[error("Completion request failed: {0}")]
    #[diagnostic(code(promptcal::completion))]
    Completion(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(promptcal::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(promptcal::config))]
    Config(String),

    #[error(transparent)]
    #[diagnostic(code(promptcal::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(promptcal::serialization))]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

// Implement From for TOML deserialization errors
impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type BotResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create credential errors
pub fn credential_error(message: &str) -> Error {
    Error::Credential(message.to_string())
}

/// Helper to create parse errors
pub fn parse_error(message: &str) -> Error {
    Error::Parse(message.to_string())
}

/// Helper to create submission errors
pub fn submission_error(message: &str) -> Error {
    Error::Submission(message.to_string())
}

/// Helper to create completion errors
pub fn completion_error(message: &str) -> Error {
    Error::Completion(message.to_string())
}
