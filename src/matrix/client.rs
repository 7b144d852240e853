//! Matrix client wrapper for bot messaging and synchronization.
//!
//! This module provides a high-level [`MatrixClient`] interface that wraps the
//! Matrix SDK client and handles message sending, editing, reactions,
//! synchronization and session management.

use log::{error, info};
use matrix_sdk::{
    Client, Room,
    ruma::{
        EventId, OwnedEventId, RoomId, UserId,
        events::{
            reaction::ReactionEventContent,
            relation::Annotation,
            room::message::{
                AddMentions, ForwardThread, ReplacementMetadata, ReplyMetadata,
                RoomMessageEventContent, RoomMessageEventContentWithoutRelation,
            },
        },
    },
};
use mockall::automock;

use crate::matrix::{
    GatewayEvent, UserCredentials, UserProfile, login::setup_client, session::SessionStore,
    sync::MatrixSync,
};

/// Display surface of the bot.
///
/// Everything the bot shows in a room goes through this trait so the poll
/// engine and the commands can be tested without a homeserver.
#[automock]
pub trait Messenger {
    /// Sends a Markdown message and returns its event id.
    async fn send_message(&self, room_id: &str, body: &str) -> Result<String, anyhow::Error>;
    /// Reacts to a message with `key`.
    async fn send_reaction(
        &self,
        room_id: &str,
        event_id: &str,
        key: &str,
    ) -> Result<(), anyhow::Error>;
    /// Replaces the content of a message sent by the bot.
    async fn edit_message(
        &self,
        room_id: &str,
        event_id: &str,
        body: &str,
    ) -> Result<(), anyhow::Error>;
    /// Reads the profile of a member of a room.
    async fn get_user_profile(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<UserProfile, anyhow::Error>;
}

/// High-level Matrix client for bot messaging operations.
pub struct MatrixClient {
    /// Synchronization service for handling real-time events
    matrix_sync: MatrixSync,
    /// Underlying Matrix SDK client
    client: Client,
}

impl MatrixClient {
    /// Logs in, or restores the previous session, and prepares the sync.
    ///
    /// # Arguments
    ///
    /// * `user_credentials` - User ID and password of the bot account
    /// * `data_dir` - Directory storing the session and the SQLite database
    ///
    /// # Errors
    ///
    /// Returns an error if the login or the session restoration fails.
    pub async fn new(
        user_credentials: &UserCredentials,
        data_dir: &str,
    ) -> Result<Self, anyhow::Error> {
        let store = SessionStore::new(data_dir);
        let client = setup_client(user_credentials, &store).await?;

        client.account().set_display_name(Some("Savepoint")).await?;

        let matrix_sync = MatrixSync::new(&client, &store);

        Ok(MatrixClient {
            matrix_sync,
            client,
        })
    }

    /// User ID of the bot account.
    pub fn user_id(&self) -> Option<String> {
        self.client.user_id().map(|user_id| user_id.to_string())
    }

    /// Starts the Matrix synchronization loop.
    ///
    /// `on_event` is called for each message, reaction and redaction of a
    /// joined room. Never returns under normal operation.
    pub async fn sync<F>(&self, on_event: F) -> Result<(), anyhow::Error>
    where
        F: Fn(GatewayEvent) + Send + Sync + 'static,
    {
        match self.matrix_sync.sync(on_event).await {
            Ok(_) => info!("matrix sync ended successfully"),
            Err(e) => error!("matrix sync ended with error: {:?}", e),
        }

        Ok(())
    }

    /// Sends a Markdown reply to a specific message.
    ///
    /// # Arguments
    ///
    /// * `room_id` - The Matrix room ID where the reply should be sent
    /// * `sender_id` - The user ID of the original message sender
    /// * `event_id` - The event ID of the message being replied to
    /// * `body` - The reply content (supports Markdown formatting)
    pub async fn send_reply(
        &self,
        room_id: &str,
        sender_id: &str,
        event_id: &str,
        body: &str,
    ) -> Result<(), anyhow::Error> {
        let sender = UserId::parse(sender_id)?;
        let event = EventId::parse(event_id)?;

        let content = RoomMessageEventContent::text_markdown(body).make_reply_to(
            ReplyMetadata::new(&event, &sender, None),
            ForwardThread::No,
            AddMentions::No,
        );

        self.room(room_id)?.send(content).await?;
        Ok(())
    }

    /// Returns a room the bot knows about.
    fn room(&self, room_id: &str) -> Result<Room, anyhow::Error> {
        let room_id = RoomId::parse(room_id)?;
        self.client
            .get_room(&room_id)
            .ok_or_else(|| anyhow::anyhow!("unknown room {}", room_id))
    }
}

impl Messenger for MatrixClient {
    async fn send_message(&self, room_id: &str, body: &str) -> Result<String, anyhow::Error> {
        let content = RoomMessageEventContent::text_markdown(body);
        let result = self.room(room_id)?.send(content).await?;

        Ok(result.event_id.to_string())
    }

    async fn send_reaction(
        &self,
        room_id: &str,
        event_id: &str,
        key: &str,
    ) -> Result<(), anyhow::Error> {
        let event_id: OwnedEventId = EventId::parse(event_id)?;
        let content = ReactionEventContent::new(Annotation::new(event_id, key.to_owned()));

        self.room(room_id)?.send(content).await?;
        Ok(())
    }

    async fn edit_message(
        &self,
        room_id: &str,
        event_id: &str,
        body: &str,
    ) -> Result<(), anyhow::Error> {
        let event_id: OwnedEventId = EventId::parse(event_id)?;
        let content = RoomMessageEventContentWithoutRelation::text_markdown(body)
            .make_replacement(ReplacementMetadata::new(event_id, None));

        self.room(room_id)?.send(content).await?;
        Ok(())
    }

    async fn get_user_profile(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<UserProfile, anyhow::Error> {
        let room = self.room(room_id)?;
        let user = UserId::parse(user_id)?;
        let member = room.get_member(&user).await?;

        Ok(UserProfile {
            user_id: user.to_string(),
            display_name: member
                .as_ref()
                .and_then(|m| m.display_name().map(str::to_owned)),
            avatar_url: member
                .as_ref()
                .and_then(|m| m.avatar_url().map(|url| url.to_string())),
            room_name: room.name(),
        })
    }
}
