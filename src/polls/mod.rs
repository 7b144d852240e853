//! Reaction-driven polls.
//!
//! A poll is a message listing lettered options. Users vote by reacting with
//! the regional indicator emoji of an option, and the message is edited in
//! place with the live counts until the poll closes.

mod engine;
mod parser;
mod poll;
mod tally;

pub use engine::{CloseReason, PollEngine, PollHandle, VoteEvent};
pub use poll::{Poll, PollOption, PollStatus};

/// Errors raised when creating a poll.
#[derive(Debug, PartialEq, Eq)]
pub enum PollError {
    /// The poll has no question
    MissingQuestion,
    /// The poll has fewer than two options
    TooFewOptions,
    /// The poll has more options than available labels
    TooManyOptions,
    /// The poll message could not be sent
    SendFailed,
}
