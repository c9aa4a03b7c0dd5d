//! CLI interface for relaybot
//!
//! Command-line interface using clap's derive API: configuration checks and
//! an offline console session that drives the relay without a chat network.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Relaybot chat relay
///
/// Relays chat commands to language model providers and keeps a short,
/// expiring memory of each conversation.
#[derive(Parser, Debug)]
#[command(name = "relaybot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Validate the configuration and show the resolved providers
    Check,

    /// Write the default configuration file if none exists
    Init,

    /// Chat with the configured providers on stdin/stdout, offline
    Console {
        /// Chat ID the session pretends to be
        #[arg(long, default_value = "1", allow_negative_numbers = true)]
        chat_id: i64,
    },
}
