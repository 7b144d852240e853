//! Bot module wiring the Matrix gateway to the commands and the polls.
//!
//! This module provides the main [`Bot`] implementation. It owns the
//! application context (gateway handle, catalog lookup, poll engine and
//! commander), built once at startup and handed to every event handler.
//!
//! # Event Flow
//!
//! ```text
//! Message   → Parse Command → Execute → Reply (→ arm poll expiry)
//! Reaction  → Poll Engine: vote added
//! Redaction → Poll Engine: vote removed
//! ```
//!
//! Every event is handled in its own task, so a slow catalog request or a
//! failing handler never holds up the next event.

use std::{sync::Arc, time::Duration};

use log::{debug, error, info};
use tokio::time::sleep;

use crate::{
    Args,
    catalog::{CatalogLookup, SteamRequester},
    commands::{CommandContext, CommandParseError, Commander},
    config::Config,
    matrix::{GatewayEvent, MatrixClient, UserCredentials},
    polls::{CloseReason, PollEngine, PollHandle, VoteEvent},
};

/// Shared state of the running bot.
#[derive(Clone)]
struct BotContext {
    matrix_client: Arc<MatrixClient>,
    poll_engine: Arc<PollEngine<MatrixClient>>,
    commander: Arc<Commander<SteamRequester, MatrixClient>>,
    /// Time window of a poll, `None` when polls only end manually
    poll_duration: Option<Duration>,
    bot_user_id: String,
}

pub struct Bot {
    context: BotContext,
}

impl Bot {
    /// Connects to Matrix and builds the application context.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog client cannot be built or the Matrix
    /// login fails.
    pub async fn new(config: Config, args: Args) -> Result<Self, anyhow::Error> {
        let requester = SteamRequester::new(
            &config.catalog.api_url,
            &config.catalog.store_url,
            &config.catalog.api_key,
            Duration::from_secs(config.catalog.timeout),
        )?;
        let catalog = CatalogLookup::new(requester, Duration::from_secs(config.catalog.cache_ttl));

        let matrix_client = Arc::new(
            MatrixClient::new(
                &UserCredentials {
                    user_id: config.matrix.user_id.clone(),
                    password: config.matrix.password,
                },
                &args.data,
            )
            .await?,
        );
        let bot_user_id = matrix_client
            .user_id()
            .unwrap_or(config.matrix.user_id);

        let poll_engine = Arc::new(PollEngine::new(Arc::clone(&matrix_client), &bot_user_id));
        let commander = Arc::new(Commander::new(
            &config.bot.prefix,
            catalog,
            Arc::clone(&poll_engine),
            Arc::clone(&matrix_client),
            config.poll.end_scope,
        ));

        let poll_duration = config.poll.window();

        Ok(Bot {
            context: BotContext {
                matrix_client,
                poll_engine,
                commander,
                poll_duration,
                bot_user_id,
            },
        })
    }

    /// Runs the Matrix sync loop until it stops.
    pub async fn start(self) {
        info!("bot {} is listening", self.context.bot_user_id);

        let context = self.context.clone();
        let on_event = move |event: GatewayEvent| Self::handle_event(context.clone(), event);

        if let Err(e) = self.context.matrix_client.sync(on_event).await {
            error!("matrix sync stopped: {:?}", e);
        }
    }

    fn handle_event(context: BotContext, event: GatewayEvent) {
        debug!("received {:?}", event);

        match event {
            GatewayEvent::Message {
                body,
                room_id,
                sender_id,
                event_id,
            } => {
                if sender_id == context.bot_user_id {
                    return;
                }
                tokio::spawn(Self::handle_message(
                    context, body, room_id, sender_id, event_id,
                ));
            }
            GatewayEvent::Reaction {
                reaction_id,
                target_id,
                key,
                sender_id,
            } => {
                tokio::spawn(async move {
                    context
                        .poll_engine
                        .handle_vote(VoteEvent::Added {
                            poll_id: target_id,
                            reaction_id,
                            key,
                            voter: sender_id,
                        })
                        .await;
                });
            }
            GatewayEvent::Redaction {
                room_id,
                redacted_id,
            } => {
                tokio::spawn(async move {
                    context
                        .poll_engine
                        .handle_vote(VoteEvent::Removed {
                            room_id,
                            reaction_id: redacted_id,
                        })
                        .await;
                });
            }
        }
    }

    async fn handle_message(
        context: BotContext,
        body: String,
        room_id: String,
        sender_id: String,
        event_id: String,
    ) {
        let command = match context.commander.parse(&body) {
            Ok(command) => command,
            // Return silently if the message is not for the bot
            Err(CommandParseError::NotForBot) => return,
            Err(CommandParseError::InvalidCommand(message)) => {
                Self::reply(&context, &room_id, &sender_id, &event_id, &message).await;
                return;
            }
        };

        info!("{} sent {:?} in {}", sender_id, command, room_id);

        let command_context = CommandContext {
            room_id: room_id.clone(),
            user_id: sender_id.clone(),
        };
        let result = context
            .commander
            .parse_command(&command, &command_context)
            .await;

        if let Some(handle) = result.opened_poll {
            Self::schedule_expiry(&context, handle).await;
        }

        if let Some(response) = result.response {
            Self::reply(&context, &room_id, &sender_id, &event_id, &response).await;
        }
    }

    /// Closes the poll once its time window elapsed.
    async fn schedule_expiry(context: &BotContext, handle: PollHandle) {
        let Some(duration) = context.poll_duration else {
            return;
        };

        debug!("poll {} expires in {:?}", handle.poll_id, duration);

        let poll_engine = Arc::clone(&context.poll_engine);
        let poll_id = handle.poll_id.clone();
        let task = tokio::spawn(async move {
            sleep(duration).await;
            poll_engine.close(&poll_id, CloseReason::Expired).await;
        });

        context
            .poll_engine
            .set_expiry(&handle.poll_id, task.abort_handle())
            .await;
    }

    async fn reply(context: &BotContext, room_id: &str, sender_id: &str, event_id: &str, body: &str) {
        if let Err(e) = context
            .matrix_client
            .send_reply(room_id, sender_id, event_id, body)
            .await
        {
            error!("failed to reply in room {}: {:?}", room_id, e);
        }
    }
}
