//! Command action handlers.
//!
//! Individual handler functions for each bot command. Each handler processes
//! one command and returns a [`CommandResult`](crate::commands::CommandResult).
//!
//! # Handler Pattern
//!
//! Handlers follow a consistent pattern:
//! 1. Receive the collaborators they need (catalog, poll engine, messenger)
//! 2. Run the command, turning every failure into a reply
//! 3. Return a result with a Markdown response and the poll opened, if any
//!
//! # Available Handlers
//!
//! - [`handle_start`] - Liveness check
//! - [`handle_help`] - Display help information
//! - [`handle_games`] - List random games
//! - [`handle_game_details`] - Show the details of a game
//! - [`handle_poll`] - Start a poll
//! - [`handle_end_poll`] - Close the latest poll of the room
//! - [`handle_user_info`] - Show the profile of the requester

mod game_details;
mod games;
mod help;
mod poll;
mod start;
mod user_info;

pub use crate::commands::actions::{
    game_details::handle_game_details,
    games::handle_games,
    help::handle_help,
    poll::{handle_end_poll, handle_poll},
    start::handle_start,
    user_info::handle_user_info,
};
