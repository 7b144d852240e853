//! Bot command parsing and execution.
//!
//! This module provides the command processing pipeline of the Savepoint bot.
//!
//! # Overview
//!
//! 1. **Parsing** - Converting Matrix messages into structured [`command::Command`] enums
//! 2. **Execution** - Routing commands to their action handlers
//! 3. **Response** - Formatting results as Markdown for Matrix display
//!
//! # Architecture
//!
//! ```text
//! Matrix Message
//!      │
//!      ▼
//! ┌─────────────┐
//! │  Commander  │  ← Entry point: parse() + parse_command()
//! └─────────────┘
//!      │
//!      ├── parse() ──────────► command::Command
//!      │
//!      └── parse_command() ──► Action Handlers
//!                               - handle_start
//!                               - handle_help
//!                               - handle_games
//!                               - handle_game_details
//!                               - handle_poll / handle_end_poll
//!                               - handle_user_info
//!                                     │
//!                                     ▼
//!                               CommandResult
//! ```
//!
//! # Available Commands
//!
//! All commands start with the configured prefix, `s!` by default.
//!
//! | Command | Arguments | Description |
//! |---------|-----------|-------------|
//! | `start` | None | Liveness check |
//! | `help` | None | Display help information |
//! | `games` | None | List 5 random games |
//! | `gameDetails` | `<name>` | Show the details of a game |
//! | `poll` | `<question>, <choice>, <choice>[, ...]` | Start a poll |
//! | `endPoll` | None | Close the latest poll of the room |
//! | `userInfo` | None | Show the profile of the requester |
//!
//! # Error Handling
//!
//! - **Silent Errors** ([`CommandParseError::NotForBot`]): plain chat and
//!   unknown commands. These never generate responses.
//! - **User Errors** ([`CommandParseError::InvalidCommand`]): usage errors,
//!   with a message for the user.

mod actions;
mod command;
mod commander;
pub(crate) mod markdown_response;

pub use crate::commands::commander::Commander;
use crate::polls::PollHandle;

/// Runtime context for command execution.
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Matrix room ID where the command was issued
    pub room_id: String,
    /// Matrix user ID of the command issuer
    pub user_id: String,
}

/// Result of command execution.
///
/// Command handlers do not schedule anything themselves. A poll they open is
/// returned so the caller can arm its expiry.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CommandResult {
    /// Markdown-formatted reply, `None` when the command already displayed
    /// its output
    pub response: Option<String>,
    /// Poll opened by the command
    pub opened_poll: Option<PollHandle>,
}

impl CommandResult {
    /// Result carrying only a reply.
    pub fn reply(response: String) -> Self {
        CommandResult {
            response: Some(response),
            opened_poll: None,
        }
    }
}

/// Errors that can occur during command parsing.
///
/// This enum distinguishes between errors that should produce user-facing
/// messages and those that should be silently ignored.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandParseError {
    /// Message is not for this bot (silent error)
    NotForBot,
    /// Invalid command syntax with error message
    InvalidCommand(String),
}
