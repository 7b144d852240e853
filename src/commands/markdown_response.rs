//! Markdown response formatters for bot commands.
//!
//! This module provides functions to format bot responses in Markdown format
//! for display in Matrix chat rooms, including the poll message that is edited
//! as votes come in.

use crate::{
    catalog::AppDetails,
    matrix::UserProfile,
    polls::{Poll, PollError, PollStatus},
};

/// Placeholder for detail fields the store did not provide.
const NOT_AVAILABLE: &str = "N/A";

/// Formats the help message showing available bot commands.
///
/// # Arguments
///
/// * `prefix` - The command prefix, shown in front of every command
///
/// # Examples
///
/// ```
/// let help = format_help("s!");
/// assert!(help.contains("s!poll"));
/// ```
pub fn format_help(prefix: &str) -> String {
    format!(
        "Commands:\n\
        - `{p}start`: check that the bot is alive\n\
        - `{p}games`: list 5 random games\n\
        - `{p}gameDetails <name>`: show the details of a game\n\
        - `{p}poll <question>, <choice>, <choice>[, ...]`: start a poll, vote with the letter reactions\n\
        - `{p}endPoll`: close the latest poll of the room\n\
        - `{p}userInfo`: show your profile\n\
        - `{p}help`: show this help message\n\n\
        > *savepoint* is a free open source gaming bot.",
        p = prefix
    )
}

/// Liveness reply of the `start` command.
pub fn format_start() -> String {
    "Time to game!".to_owned()
}

/// Formats a list of randomly picked game names.
///
/// # Examples
///
/// ```
/// let output = format_games(&["Portal".to_owned()]);
/// assert!(output.contains("- Portal"));
/// ```
pub fn format_games(names: &[String]) -> String {
    if names.is_empty() {
        return "No games found.".to_owned();
    }

    let mut response = format!("Here are {} random games:\n", names.len());
    for name in names {
        response.push_str(&format!("- {}\n", name));
    }

    response
}

/// Formats the detail view of a game.
///
/// Missing fields are rendered as `N/A`, and only the first screenshot is
/// linked.
///
/// # Arguments
///
/// * `query` - The name the user searched for
/// * `details` - The detail record of the matching game
pub fn format_game_details(query: &str, details: &AppDetails) -> String {
    let title = if details.name.is_empty() {
        query
    } else {
        details.name.as_str()
    };

    let platforms = details
        .platforms
        .as_ref()
        .map(|platforms| platforms.names())
        .unwrap_or_default();
    let genres: Vec<&str> = details
        .genres
        .iter()
        .map(|genre| genre.description.as_str())
        .collect();
    let release_date = details
        .release_date
        .as_ref()
        .map(|release_date| release_date.date.as_str())
        .filter(|date| !date.is_empty());

    let mut response = format!(
        "**Game Details**\n\n\
        Details about {}\n\n\
        - **Developers**: {}\n\
        - **Publishers**: {}\n\
        - **Platforms**: {}\n\
        - **Genres**: {}\n\
        - **Release Date**: {}\n",
        title,
        join_or_na(&details.developers),
        join_or_na(&details.publishers),
        join_or_na(&platforms),
        join_or_na(&genres),
        release_date.unwrap_or(NOT_AVAILABLE),
    );

    if let Some(screenshot) = details
        .screenshots
        .iter()
        .find(|screenshot| !screenshot.path_thumbnail.is_empty())
    {
        response.push_str(&format!("\n[Screenshot]({})\n", screenshot.path_thumbnail));
    }
    response.push_str("\n> Data from Steam");

    response
}

fn join_or_na<S: AsRef<str>>(values: &[S]) -> String {
    if values.is_empty() {
        return NOT_AVAILABLE.to_owned();
    }

    values
        .iter()
        .map(|value| value.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_game_not_found(name: &str) -> String {
    format!("Game not found with the name: {}", name)
}

/// Generic reply when the catalog cannot be reached.
pub fn format_game_details_error() -> String {
    "An error occurred while fetching game details.".to_owned()
}

pub fn format_games_error() -> String {
    "An error occurred while fetching games.".to_owned()
}

pub fn format_invalid_game_details(prefix: &str) -> String {
    format!(
        "Invalid gameDetails command. Usage: `{}gameDetails <name>`",
        prefix
    )
}

/// Formats a poll message with its current tallies.
///
/// The same layout is used for the initial message, every re-render and the
/// final closed render.
///
/// # Examples
///
/// ```text
/// **Best color?**
///
/// - 🇦 Red: 1 vote
/// - 🇧 Green: 2 votes
/// - 🇨 Blue: 0 votes
///
/// React to vote!
/// ```
pub fn format_poll(poll: &Poll) -> String {
    let closed = poll.status == PollStatus::Closed;

    let mut response = format!(
        "**{}**{}\n\n",
        poll.question,
        if closed { " (closed)" } else { "" }
    );
    for option in &poll.options {
        response.push_str(&format!(
            "- {} {}: {} {}\n",
            option.key,
            option.text,
            option.vote_count,
            if option.vote_count == 1 { "vote" } else { "votes" }
        ));
    }

    if closed {
        response.push_str("\nThis poll is closed.");
    } else {
        response.push_str("\nReact to vote!");
    }

    response
}

/// Formats the reply to a poll that could not be created.
pub fn format_poll_error(error: &PollError) -> String {
    match error {
        PollError::MissingQuestion => {
            "Please provide a question and at least two choices (separated by commas).".to_owned()
        }
        PollError::TooFewOptions => "Please provide at least two choices.".to_owned(),
        PollError::TooManyOptions => "Please provide at most 26 choices.".to_owned(),
        PollError::SendFailed => "An error occurred while creating the poll.".to_owned(),
    }
}

pub fn format_poll_ended() -> String {
    "The poll has been closed.".to_owned()
}

pub fn format_no_open_poll() -> String {
    "There is no open poll in this room.".to_owned()
}

pub fn format_end_poll_forbidden() -> String {
    "Only the author of the poll can close it.".to_owned()
}

pub fn format_end_poll_disabled() -> String {
    "Polls close by themselves, they cannot be ended manually.".to_owned()
}

/// Formats the profile of the user who asked for it.
pub fn format_user_info(profile: &UserProfile) -> String {
    format!(
        "**User Info**\n\n\
        - **User**: {}\n\
        - **Display name**: {}\n\
        - **Avatar**: {}\n\
        - **Room**: {}",
        profile.user_id,
        profile.display_name.as_deref().unwrap_or(NOT_AVAILABLE),
        profile.avatar_url.as_deref().unwrap_or(NOT_AVAILABLE),
        profile.room_name.as_deref().unwrap_or(NOT_AVAILABLE),
    )
}

pub fn format_user_info_error() -> String {
    "An error occurred while fetching your profile.".to_owned()
}
