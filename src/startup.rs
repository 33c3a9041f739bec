use crate::config::Config;
use crate::error::{BotResult, Error};
use crate::pipeline::{error_message, Outcome, Pipeline};
use tracing::error;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration.
///
/// Logs go to stderr so stdout only ever carries the confirmation line.
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Config(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> BotResult<Config> {
    Config::load().inspect_err(|e| error!("Failed to load configuration: {:?}", e))
}

/// Build the pipeline from configuration and schedule one prompt
pub async fn run(prompt: &str) -> Outcome {
    let pipeline = match load_config().and_then(|config| Pipeline::from_config(&config)) {
        Ok(pipeline) => pipeline,
        Err(e) => return Outcome::Failed(error_message(&e)),
    };

    pipeline.schedule(prompt).await
}
