//! User info command handler.

use log::{debug, error};

use crate::{
    commands::{
        CommandContext, CommandResult,
        markdown_response::{format_user_info, format_user_info_error},
    },
    matrix::Messenger,
};

pub async fn handle_user_info<M: Messenger>(messenger: &M, context: &CommandContext) -> CommandResult {
    debug!("handling userInfo command");

    let response = match messenger
        .get_user_profile(&context.room_id, &context.user_id)
        .await
    {
        Ok(profile) => format_user_info(&profile),
        Err(e) => {
            error!("failed to read profile of {}: {:?}", context.user_id, e);
            format_user_info_error()
        }
    };

    CommandResult::reply(response)
}
