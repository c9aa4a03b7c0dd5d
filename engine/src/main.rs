// Relaybot
// Main entry point for the relaybot binary

use clap::Parser;
use relaybot_engine::cli::{Cli, Command};
use relaybot_engine::handlers::{
    error_report, handle_check, handle_console, handle_init, load_config, OutputFormat,
};
use relaybot_engine::telemetry::{effective_level, init_telemetry_with_level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    // `init` must work before any configuration exists
    if let Command::Init = cli.command {
        init_telemetry_with_level(effective_level(cli.log.as_deref(), "info"));
        return handle_init(cli.config.as_deref(), format);
    }

    // Load configuration (or use custom path if provided)
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", error_report(&e));
            std::process::exit(1);
        }
    };

    // Only takes effect if RUST_LOG env var is not set
    init_telemetry_with_level(effective_level(
        cli.log.as_deref(),
        &config.core.log_level,
    ));

    tracing::info!(
        "Relaybot v{} with {} provider(s)",
        env!("CARGO_PKG_VERSION"),
        config.providers.len()
    );

    // Handle commands
    match cli.command {
        Command::Check => handle_check(&config, format),

        Command::Console { chat_id } => {
            tracing::info!("Starting console session as chat {}", chat_id);
            handle_console(&config, chat_id).await
        }

        Command::Init => Ok(()),
    }
}
