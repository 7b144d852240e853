//! Matrix protocol integration for the bot.
//!
//! This module connects the bot to a Matrix homeserver and exposes:
//! - Session management and persistence
//! - Real-time event synchronization for messages and reactions
//! - Message sending, editing and reactions through the [`Messenger`] trait
//!
//! # Architecture
//!
//! The module is structured around the [`MatrixClient`] which coordinates:
//! - **Login**: Password login or session restoration via the login submodule
//! - **Session**: Persistence of the login and sync token via the session submodule
//! - **Sync**: Event handling and conversion to [`GatewayEvent`] via the sync submodule
//!
//! # Examples
//!
//! ```no_run
//! use savepoint::matrix::{MatrixClient, UserCredentials};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let credentials = UserCredentials {
//!     user_id: "@savepoint:example.com".to_string(),
//!     password: "password".to_string(),
//! };
//!
//! let client = MatrixClient::new(&credentials, "./data").await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod login;
mod session;
mod sync;

#[cfg(test)]
pub use crate::matrix::client::MockMessenger;
pub use crate::matrix::client::{MatrixClient, Messenger};

/// User credentials for a Matrix account
#[derive(Debug, Clone)]
pub struct UserCredentials {
    /// User ID of the matrix account
    pub user_id: String,
    /// Password of the matrix account
    pub password: String,
}

/// Profile of a room member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    /// Display name in the room, if set
    pub display_name: Option<String>,
    /// `mxc://` avatar URI, if set
    pub avatar_url: Option<String>,
    /// Name of the room the profile was read in, if set
    pub room_name: Option<String>,
}

/// Event received from the homeserver that the bot reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    /// Text message in a joined room
    Message {
        body: String,
        room_id: String,
        sender_id: String,
        event_id: String,
    },
    /// Annotation reaction on a message
    Reaction {
        reaction_id: String,
        /// Event id of the message reacted to
        target_id: String,
        key: String,
        sender_id: String,
    },
    /// Redaction of an event, possibly a reaction
    Redaction {
        room_id: String,
        redacted_id: String,
    },
}
