//! Start command handler.

use log::debug;

use crate::commands::{CommandResult, markdown_response::format_start};

pub fn handle_start() -> CommandResult {
    debug!("handling start command");

    CommandResult::reply(format_start())
}
