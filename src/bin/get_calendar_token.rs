use promptcal::components::google_calendar::{GoogleOAuth, TokenManager, TokenStore};
use promptcal::error::BotResult;
use promptcal::startup;
use std::sync::Arc;

#[tokio::main(flavor = "current_thread")]
async fn main() -> BotResult<()> {
    // Load configuration
    let config = startup::load_config()?;

    let token_manager = TokenManager::new(
        TokenStore::new(config.token_path.clone()),
        Arc::new(GoogleOAuth::new(&config)),
    );

    println!("Opening browser for Google Calendar authorization...");
    token_manager.reauthorize().await?;

    println!(
        "Token successfully saved to {}!",
        token_manager.store().path().display()
    );

    Ok(())
}
