//! Savepoint - A Matrix bot for gaming groups.
//!
//! This is the main entry point for the Savepoint bot, which looks games up in
//! the Steam catalog and runs reaction-based polls in Matrix rooms.
//!
//! # Features
//!
//! - **Game Lookups**: List random games or show the details of a game
//! - **Polls**: Start a poll, vote with letter reactions, watch the counts update live
//! - **Poll Expiry**: Optionally close polls after a configurable time window
//! - **Session Persistence**: Maintains the Matrix login across restarts
//! - **YAML Configuration**: Simple configuration file format with environment variable support
//!
//! # Configuration
//!
//! Create a `config.yaml` file with your settings:
//!
//! ```yaml
//! matrix:
//!   user_id: "@savepoint:matrix.org"
//!   password: "your-password"
//!
//! catalog:
//!   api_key: "your-steam-web-api-key"
//!
//! poll:
//!   duration: 1440
//! ```
//!
//! See the [`config`] module for every option.
//!
//! # Environment Variable Overrides
//!
//! Override any configuration value using environment variables with the `SAVEPOINT_` prefix:
//!
//! ```bash
//! export SAVEPOINT_MATRIX__PASSWORD="your-password"
//! export SAVEPOINT_CATALOG__API_KEY="your-steam-web-api-key"
//! ```
//!
//! # Usage
//!
//! ```bash
//! savepoint --config config.yaml --data ./savepoint-data
//! ```
//!
//! # Bot Commands
//!
//! - `s!start` - Check that the bot is alive
//! - `s!help` - Display help information
//! - `s!games` - List 5 random games
//! - `s!gameDetails <name>` - Show the details of a game
//! - `s!poll <question>, <choice>, <choice>` - Start a poll
//! - `s!endPoll` - Close the latest poll of the room
//! - `s!userInfo` - Show your profile
//!
//! # Architecture
//!
//! - [`bot`] - Application context and dispatch of Matrix events
//! - [`catalog`] - Steam API client and cached game lookups
//! - [`commands`] - Command parsing and execution
//! - [`config`] - YAML configuration with environment variable support
//! - [`matrix`] - Matrix client integration and session management
//! - [`polls`] - Poll engine, vote reconciliation and rendering order
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bot;
mod catalog;
mod commands;
mod config;
mod matrix;
mod polls;

/// Command-line arguments for the Savepoint bot.
///
/// # Examples
///
/// ```bash
/// savepoint --config config.yaml --data ./savepoint-data
/// ```
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: String,

    /// Path to the directory for storing persistent data.
    ///
    /// This directory will contain:
    /// - `session` - Matrix session data (access token, device id, sync token)
    /// - `sqlite` - Matrix SDK state store
    ///
    /// The access token allows impersonation of the bot, restrict the
    /// permissions of this directory.
    #[arg(short, long)]
    data: String,
}

#[tokio::main]
async fn main() {
    // info unless RUST_LOG says otherwise
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting savepoint {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!("cannot read configuration {}: {}", args.config, e);
            return;
        }
    };

    let bot = match Bot::new(config, args).await {
        Ok(bot) => bot,
        Err(e) => {
            error!("cannot start savepoint: {:?}", e);
            return;
        }
    };
    bot.start().await;
}
