//! Command parsing.
//!
//! This module converts Matrix message text into structured [`Command`] enums.
//! A command is the configured prefix, immediately followed by the command name
//! and an optional argument string that is kept as typed.

use log::debug;

use crate::commands::markdown_response::format_invalid_game_details;

/// Represents a parsed bot command.
#[derive(Debug, Hash, PartialEq, Eq)]
pub enum Command {
    /// Liveness check
    Start,
    /// Display help information
    Help,
    /// List random games from the catalog
    Games,
    /// Show the details of a game
    ///
    /// # Fields
    ///
    /// * `String` - Name searched in the catalog
    GameDetails(String),
    /// Start a poll
    ///
    /// # Fields
    ///
    /// * `String` - Raw arguments, parsed by the poll engine
    Poll(String),
    /// Close the latest poll of the room
    EndPoll,
    /// Show the profile of the requester
    UserInfo,
}

/// Errors that can occur during command parsing.
#[derive(Debug, PartialEq, Eq)]
pub enum CommandParsingError {
    /// The message does not start with the prefix
    NotACommand,
    /// The command name is not recognized
    Unknown,
    /// The gameDetails command has no name
    InvalidGameDetails,
}

impl Command {
    /// Parses a message body into a Command.
    ///
    /// Command names are case-sensitive. Leading whitespace of the argument
    /// string is removed, the rest is kept untouched.
    ///
    /// # Errors
    ///
    /// - [`CommandParsingError::NotACommand`] if the body does not start with `prefix`
    /// - [`CommandParsingError::Unknown`] if the command name is not recognized
    /// - [`CommandParsingError::InvalidGameDetails`] if `gameDetails` has no name
    ///
    /// # Examples
    ///
    /// ```
    /// let command = Command::parse("s!", "s!gameDetails portal");
    /// assert_eq!(command, Ok(Command::GameDetails("portal".to_owned())));
    /// ```
    pub fn parse(prefix: &str, body: &str) -> Result<Self, CommandParsingError> {
        let Some(rest) = body.strip_prefix(prefix) else {
            return Err(CommandParsingError::NotACommand);
        };
        let rest = rest.trim_start();

        let (name, arguments) = match rest.split_once(char::is_whitespace) {
            Some((name, arguments)) => (name, arguments.trim()),
            None => (rest, ""),
        };

        debug!("parsing command {:?} with arguments {:?}", name, arguments);

        match name {
            "start" => Ok(Command::Start),
            "help" => Ok(Command::Help),
            "games" => Ok(Command::Games),
            "gameDetails" => {
                if arguments.is_empty() {
                    return Err(CommandParsingError::InvalidGameDetails);
                }
                Ok(Command::GameDetails(arguments.to_owned()))
            }
            "poll" => Ok(Command::Poll(arguments.to_owned())),
            "endPoll" => Ok(Command::EndPoll),
            "userInfo" => Ok(Command::UserInfo),
            _ => Err(CommandParsingError::Unknown),
        }
    }
}

/// Formats a command error into a user-friendly message.
///
/// Only usage errors produce a message. Plain chat and unknown commands are
/// ignored silently and return `None`.
pub fn format_command_error(prefix: &str, error: CommandParsingError) -> Option<String> {
    match error {
        CommandParsingError::InvalidGameDetails => Some(format_invalid_game_details(prefix)),
        _ => None,
    }
}
