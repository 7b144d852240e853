//! Command orchestration and execution.
//!
//! This module provides the [`Commander`] struct, which serves as the main entry point
//! for processing bot commands. It coordinates command parsing and execution, routing
//! commands to their appropriate handlers.
//!
//! # Flow
//!
//! ```text
//! Matrix Message → parse() → Command → parse_command() → CommandResult
//! ```

use std::sync::Arc;

use crate::{
    catalog::{CatalogLookup, CatalogRequester},
    commands::{
        CommandContext, CommandParseError, CommandResult,
        actions::{
            handle_end_poll, handle_game_details, handle_games, handle_help, handle_poll,
            handle_start, handle_user_info,
        },
        command::{Command, format_command_error},
    },
    config::EndScope,
    matrix::Messenger,
    polls::PollEngine,
};

/// Command orchestrator for parsing and executing bot commands.
///
/// # Command Prefix
///
/// All commands must start with the configured prefix. Messages without it
/// are silently ignored (returning [`CommandParseError::NotForBot`]).
pub struct Commander<R: CatalogRequester, M: Messenger> {
    /// Prefix of every command
    prefix: String,
    /// Game catalog used by the lookup commands
    catalog: CatalogLookup<R>,
    /// Owner of the open polls
    poll_engine: Arc<PollEngine<M>>,
    /// Display surface, used to read user profiles
    messenger: Arc<M>,
    /// Who may end a poll
    end_scope: EndScope,
}

impl<R: CatalogRequester, M: Messenger> Commander<R, M> {
    pub fn new(
        prefix: &str,
        catalog: CatalogLookup<R>,
        poll_engine: Arc<PollEngine<M>>,
        messenger: Arc<M>,
        end_scope: EndScope,
    ) -> Self {
        Commander {
            prefix: prefix.to_owned(),
            catalog,
            poll_engine,
            messenger,
            end_scope,
        }
    }

    /// Parses a Matrix message body into a structured command.
    ///
    /// # Returns
    ///
    /// * `Ok(Command)` - Successfully parsed and validated command
    /// * `Err(CommandParseError::NotForBot)` - Plain chat or unknown command
    /// * `Err(CommandParseError::InvalidCommand)` - Command usage is invalid
    pub fn parse(&self, body: &str) -> Result<Command, CommandParseError> {
        Command::parse(&self.prefix, body).map_err(|error| {
            match format_command_error(&self.prefix, error) {
                Some(message) => CommandParseError::InvalidCommand(message),
                None => CommandParseError::NotForBot,
            }
        })
    }

    /// Executes a parsed command and returns the result.
    ///
    /// Every failure is turned into a reply, this never fails.
    pub async fn parse_command(&self, command: &Command, context: &CommandContext) -> CommandResult {
        match command {
            Command::Start => handle_start(),
            Command::Help => handle_help(&self.prefix),
            Command::Games => handle_games(&self.catalog).await,
            Command::GameDetails(name) => handle_game_details(&self.catalog, name).await,
            Command::Poll(arguments) => handle_poll(&self.poll_engine, context, arguments).await,
            Command::EndPoll => handle_end_poll(&self.poll_engine, context, self.end_scope).await,
            Command::UserInfo => handle_user_info(self.messenger.as_ref(), context).await,
        }
    }
}
