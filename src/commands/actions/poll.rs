//! Poll command handlers.
//!
//! `poll` hands the raw arguments to the poll engine, which validates them and
//! displays the poll. `endPoll` closes the most recent open poll of the room,
//! subject to the configured [`EndScope`].

use log::{debug, info};

use crate::{
    commands::{
        CommandContext, CommandResult,
        markdown_response::{
            format_end_poll_disabled, format_end_poll_forbidden, format_no_open_poll,
            format_poll_ended, format_poll_error,
        },
    },
    config::EndScope,
    matrix::Messenger,
    polls::{CloseReason, PollEngine},
};

pub async fn handle_poll<M: Messenger>(
    poll_engine: &PollEngine<M>,
    context: &CommandContext,
    arguments: &str,
) -> CommandResult {
    debug!("handling poll command");

    match poll_engine
        .open(&context.room_id, &context.user_id, arguments)
        .await
    {
        // The poll message is the answer
        Ok(handle) => CommandResult {
            response: None,
            opened_poll: Some(handle),
        },
        Err(error) => {
            info!("poll of {} rejected: {:?}", context.user_id, error);
            CommandResult::reply(format_poll_error(&error))
        }
    }
}

pub async fn handle_end_poll<M: Messenger>(
    poll_engine: &PollEngine<M>,
    context: &CommandContext,
    end_scope: EndScope,
) -> CommandResult {
    debug!("handling endPoll command");

    if end_scope == EndScope::Disabled {
        return CommandResult::reply(format_end_poll_disabled());
    }

    let Some((poll_id, created_by)) = poll_engine.latest_open_poll(&context.room_id).await else {
        return CommandResult::reply(format_no_open_poll());
    };

    if end_scope == EndScope::Creator && created_by != context.user_id {
        info!(
            "{} is not allowed to end poll {} of {}",
            context.user_id, poll_id, created_by
        );
        return CommandResult::reply(format_end_poll_forbidden());
    }

    // Lost a race with the expiry or another endPoll
    if !poll_engine.close(&poll_id, CloseReason::Ended).await {
        return CommandResult::reply(format_no_open_poll());
    }

    CommandResult::reply(format_poll_ended())
}
