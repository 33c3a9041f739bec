use clap::Parser;
use promptcal::pipeline::Outcome;
use promptcal::startup;
use std::process::ExitCode;

/// Schedule an event in Google Calendar based on a natural language prompt
#[derive(Debug, Parser)]
#[command(name = "promptcal", version)]
struct Cli {
    /// What to schedule, e.g. "Lunch with Sam tomorrow at noon"
    prompt: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> miette::Result<ExitCode> {
    // Initialize logging
    startup::init_logging()?;

    let cli = Cli::parse();

    match startup::run(&cli.prompt).await {
        Outcome::Confirmed(message) => {
            println!("{}", message);
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Failed(message) => {
            eprintln!("{}", message);
            Ok(ExitCode::FAILURE)
        }
    }
}
