//! Help command handler.
//!
//! Displays every available command with its syntax, using the configured
//! prefix. This is a stateless command.

use log::debug;

use crate::commands::{CommandResult, markdown_response::format_help};

pub fn handle_help(prefix: &str) -> CommandResult {
    debug!("handling help command");

    CommandResult::reply(format_help(prefix))
}
