//! Chatkeep - personal assistant chat with local history
//!
#![doc = "Main entry point for the chatkeep command-line client."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use chatkeep::cli::{Cli, Commands};
use chatkeep::commands::{self, AppContext};
use chatkeep::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Chat { resume, image } => {
            tracing::info!("Starting interactive chat");
            if let Some(id) = &resume {
                tracing::debug!("Resuming conversation: {}", id);
            }
            commands::chat::run_chat(config, resume, image).await
        }
        Commands::Health => {
            let ctx = AppContext::open(config).await?;
            commands::health::run_health(&ctx).await
        }
        Commands::History { command } => {
            tracing::debug!("Starting history command");
            let ctx = AppContext::open(config).await?;
            commands::history::handle_history(&ctx, command).await
        }
        Commands::Settings { command } => {
            let ctx = AppContext::open(config).await?;
            commands::settings::handle_settings(&ctx, command).await
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins; otherwise `chatkeep=info`, or `chatkeep=debug` with `-v`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "chatkeep=debug" } else { "chatkeep=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
