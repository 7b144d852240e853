//! Matrix client synchronization and event handling.
//!
//! This module provides the [`MatrixSync`] struct for running the sync loop
//! and turning the room events the bot cares about into [`GatewayEvent`]s.
//!
//! # Overview
//!
//! The [`MatrixSync::sync`] method:
//! 1. Performs an initial sync so invitations received offline are handled
//!    and older messages are not replayed
//! 2. Sets up event handlers for messages, reactions and redactions
//! 3. Enters a continuous sync loop with automatic token persistence

use std::sync::Arc;

use anyhow::Result;
use log::{error, info, warn};
use matrix_sdk::{
    Client, LoopCtrl, Room, RoomState,
    config::SyncSettings,
    ruma::{
        api::client::filter::FilterDefinition,
        events::{
            reaction::OriginalSyncReactionEvent,
            room::{
                member::StrippedRoomMemberEvent,
                message::{MessageType, OriginalSyncRoomMessageEvent},
                redaction::OriginalSyncRoomRedactionEvent,
            },
        },
    },
};
use tokio::time::{Duration, sleep};

use crate::matrix::{GatewayEvent, session::SessionStore};

/// Seconds before the second join attempt.
const FIRST_JOIN_DELAY: u64 = 2;
/// Longest wait between join attempts, in seconds.
const MAX_JOIN_DELAY: u64 = 3600;

/// Runs the synchronization with the homeserver.
pub struct MatrixSync {
    client: Client,
    store: SessionStore,
}

impl MatrixSync {
    pub fn new(client: &Client, store: &SessionStore) -> Self {
        MatrixSync {
            client: client.to_owned(),
            store: store.to_owned(),
        }
    }

    /// Starts the synchronization and never returns under normal operation.
    ///
    /// `on_event` is invoked for every message, reaction and redaction in a
    /// joined room received after the initial sync.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync loop hits a fatal error. Sync token
    /// persistence errors are only logged.
    pub async fn sync<F>(&self, on_event: F) -> Result<()>
    where
        F: Fn(GatewayEvent) + Send + Sync + 'static,
    {
        info!("start syncing");

        self.client.add_event_handler(auto_join_rooms);

        // Lazy-load room members
        let filter = FilterDefinition::with_lazy_loading();
        let mut sync_settings = SyncSettings::default().filter(filter.into());

        if let Some(sync_token) = self.store.sync_token().await {
            sync_settings = sync_settings.token(sync_token);
        }

        // First sync without handlers so the backlog is not handled as commands
        let mut delay = 1;
        let response = loop {
            match self.client.sync_once(sync_settings.clone()).await {
                Ok(response) => break response,
                Err(err) => {
                    error!("initial sync failed ({err:?}), retrying in {delay}s");
                    sleep(Duration::from_secs(delay)).await;
                    delay = (delay * 2).min(60);
                }
            }
        };
        if let Err(err) = self.store.save_sync_token(response.next_batch.clone()).await {
            error!("failed to persist sync token: {:?}", err);
        }

        let on_event = Arc::new(on_event);

        self.client.add_event_handler({
            let on_event = Arc::clone(&on_event);
            move |event: OriginalSyncRoomMessageEvent, room: Room| {
                let on_event = Arc::clone(&on_event);
                async move { on_room_message(event, room, on_event.as_ref()) }
            }
        });

        self.client.add_event_handler({
            let on_event = Arc::clone(&on_event);
            move |event: OriginalSyncReactionEvent, room: Room| {
                let on_event = Arc::clone(&on_event);
                async move { on_reaction(event, room, on_event.as_ref()) }
            }
        });

        self.client.add_event_handler({
            let on_event = Arc::clone(&on_event);
            move |event: OriginalSyncRoomRedactionEvent, room: Room| {
                let on_event = Arc::clone(&on_event);
                async move { on_redaction(event, room, on_event.as_ref()) }
            }
        });

        sync_settings = sync_settings.token(response.next_batch);

        self.client
            .sync_with_result_callback(sync_settings, |sync_result| async move {
                let response = sync_result?;

                if let Err(err) = self.store.save_sync_token(response.next_batch).await {
                    error!("failed to persist sync token: {:?}", err);
                }

                Ok(LoopCtrl::Continue)
            })
            .await?;

        Ok(())
    }
}

/// Accepts invitations addressed to the bot.
///
/// Homeservers may deliver the invite before the room can be joined
/// (<https://github.com/matrix-org/synapse/issues/4345>), so joining backs off
/// from [`FIRST_JOIN_DELAY`] and gives up past [`MAX_JOIN_DELAY`].
async fn auto_join_rooms(invite: StrippedRoomMemberEvent, client: Client, room: Room) {
    let Some(bot_id) = client.user_id().map(ToOwned::to_owned) else {
        warn!("invite received before login completed");
        return;
    };

    if invite.state_key != bot_id {
        return;
    }

    tokio::spawn(async move {
        let room_id = room.room_id().to_owned();
        info!("invited to {} by {}", room_id, invite.sender);

        let mut delay = FIRST_JOIN_DELAY;
        loop {
            match room.join().await {
                Ok(()) => {
                    info!("joined {}", room_id);
                    return;
                }
                Err(err) if delay > MAX_JOIN_DELAY => {
                    error!("giving up on joining {}: {:?}", room_id, err);
                    return;
                }
                Err(err) => {
                    warn!("joining {} failed, next attempt in {}s: {:?}", room_id, delay, err);
                    sleep(Duration::from_secs(delay)).await;
                    delay *= 2;
                }
            }
        }
    });
}

/// Forwards text messages of joined rooms.
///
/// Non-text messages (images, files, etc.) are silently ignored.
fn on_room_message<F>(event: OriginalSyncRoomMessageEvent, room: Room, on_event: &F)
where
    F: Fn(GatewayEvent),
{
    if room.state() != RoomState::Joined {
        return;
    }

    let MessageType::Text(text_content) = event.content.msgtype else {
        return;
    };

    on_event(GatewayEvent::Message {
        body: text_content.body,
        room_id: room.room_id().to_string(),
        sender_id: event.sender.to_string(),
        event_id: event.event_id.to_string(),
    });
}

/// Forwards annotation reactions of joined rooms.
fn on_reaction<F>(event: OriginalSyncReactionEvent, room: Room, on_event: &F)
where
    F: Fn(GatewayEvent),
{
    if room.state() != RoomState::Joined {
        return;
    }

    let annotation = event.content.relates_to;
    on_event(GatewayEvent::Reaction {
        reaction_id: event.event_id.to_string(),
        target_id: annotation.event_id.to_string(),
        key: annotation.key,
        sender_id: event.sender.to_string(),
    });
}

/// Forwards redactions of joined rooms.
///
/// The redacted event id moved from the event to its content in recent room
/// versions, both places are read.
fn on_redaction<F>(event: OriginalSyncRoomRedactionEvent, room: Room, on_event: &F)
where
    F: Fn(GatewayEvent),
{
    if room.state() != RoomState::Joined {
        return;
    }

    let Some(redacted_id) = event.redacts.or(event.content.redacts) else {
        return;
    };

    on_event(GatewayEvent::Redaction {
        room_id: room.room_id().to_string(),
        redacted_id: redacted_id.to_string(),
    });
}
