//! Poll lifecycle and vote reconciliation.
//!
//! The [`PollEngine`] owns the table of open polls, keyed by the event id of
//! their message. It creates polls, reconciles reaction events against them,
//! re-renders the poll messages and closes polls.
//!
//! # Rendering order
//!
//! Every accepted vote bumps the poll revision and snapshots the rendered body
//! while the table is locked. The snapshot is then rendered outside the table
//! lock, through a per-poll render lock that remembers the last revision shown.
//! A snapshot older than that revision is dropped, so a stale count is never
//! displayed after a newer one.

use std::{collections::HashMap, sync::Arc};

use log::{debug, error, info, warn};
use tokio::{sync::Mutex, task::AbortHandle};

use crate::{
    commands::markdown_response::format_poll,
    matrix::Messenger,
    polls::{
        PollError,
        parser::parse_poll_arguments,
        poll::{Poll, PollStatus},
        tally::Tally,
    },
};

/// Reaction event delivered by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteEvent {
    /// A user reacted to a message
    Added {
        /// Event id of the message reacted to
        poll_id: String,
        reaction_id: String,
        /// Reaction key, e.g. `🇦`
        key: String,
        voter: String,
    },
    /// A reaction was redacted
    Removed {
        /// Room the redaction was sent in
        room_id: String,
        reaction_id: String,
    },
}

/// Result of reconciling a [`VoteEvent`].
#[derive(Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// The vote count of an option was recomputed
    Counted { label: char, votes: usize },
    /// The event did not affect any poll
    Ignored(IgnoredVote),
}

/// Reasons a vote event is dropped.
#[derive(Debug, PartialEq, Eq)]
pub enum IgnoredVote {
    /// Reaction sent by the bot itself
    OwnReaction,
    /// No open poll for this message
    UnknownPoll,
    /// Reaction key not mapped to an option
    UnknownLabel,
    /// Reaction already counted or already removed
    Duplicate,
    /// Removal of a reaction that was never counted
    UnknownReaction,
}

/// Why a poll is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The poll time window elapsed
    Expired,
    /// Someone ended the poll
    Ended,
}

/// Handle on an open poll returned by [`PollEngine::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollHandle {
    pub poll_id: String,
    pub room_id: String,
}

/// Open poll and its bookkeeping.
struct PollEntry {
    poll: Poll,
    tally: Tally,
    /// Bumped for every change that must be rendered
    revision: u64,
    /// Opening order, used to find the latest poll of a room
    sequence: u64,
    /// Last rendered revision, held while rendering
    rendered: Arc<Mutex<u64>>,
    /// Pending expiry task
    expiry: Option<AbortHandle>,
}

#[derive(Default)]
struct PollTable {
    polls: HashMap<String, PollEntry>,
    /// Reaction id to poll id, to resolve redactions
    reactions: HashMap<String, String>,
    /// Redactions received before the reaction they remove, with their room
    early_removals: HashMap<String, String>,
    sequence: u64,
}

/// Snapshot of a poll to render.
struct Render {
    poll_id: String,
    room_id: String,
    body: String,
    revision: u64,
    rendered: Arc<Mutex<u64>>,
}

/// Owner of all open polls.
pub struct PollEngine<M: Messenger> {
    /// Presentation layer the polls are rendered with
    messenger: Arc<M>,
    /// Identity of the bot, whose own reactions are never counted
    bot_user_id: String,
    table: Mutex<PollTable>,
}

impl<M: Messenger> PollEngine<M> {
    pub fn new(messenger: Arc<M>, bot_user_id: &str) -> Self {
        PollEngine {
            messenger,
            bot_user_id: bot_user_id.to_owned(),
            table: Mutex::new(PollTable::default()),
        }
    }

    /// Creates a poll from the text following the poll command.
    ///
    /// The poll message is sent, the poll is registered under the message
    /// event id and one reaction per option is seeded on the message.
    ///
    /// # Errors
    ///
    /// Validation errors from [`parse_poll_arguments`], or
    /// [`PollError::SendFailed`] when the poll message cannot be sent. No poll
    /// is registered in both cases.
    pub async fn open(
        &self,
        room_id: &str,
        created_by: &str,
        arguments: &str,
    ) -> Result<PollHandle, PollError> {
        let draft = parse_poll_arguments(arguments)?;
        let mut poll = Poll::new(room_id, created_by, draft);

        let poll_id = match self
            .messenger
            .send_message(room_id, &format_poll(&poll))
            .await
        {
            Ok(event_id) => event_id,
            Err(e) => {
                error!("failed to send poll message in room {}: {:?}", room_id, e);
                return Err(PollError::SendFailed);
            }
        };
        poll.id = poll_id.clone();

        let keys: Vec<String> = poll.options.iter().map(|o| o.key.clone()).collect();
        info!("opened poll {}", poll);

        // Reactions reconciled before this point find no poll and are dropped
        {
            let mut table = self.table.lock().await;
            table.sequence += 1;
            let sequence = table.sequence;
            table.polls.insert(
                poll_id.clone(),
                PollEntry {
                    poll,
                    tally: Tally::default(),
                    revision: 0,
                    sequence,
                    rendered: Arc::new(Mutex::new(0)),
                    expiry: None,
                },
            );
        }

        for key in keys {
            if let Err(e) = self.messenger.send_reaction(room_id, &poll_id, &key).await {
                warn!("failed to seed reaction {} on poll {}: {:?}", key, poll_id, e);
            }
        }

        Ok(PollHandle {
            poll_id,
            room_id: room_id.to_owned(),
        })
    }

    /// Attaches the expiry task of a poll so ending the poll early cancels it.
    ///
    /// The task is aborted right away if the poll is already closed.
    pub async fn set_expiry(&self, poll_id: &str, expiry: AbortHandle) {
        let mut table = self.table.lock().await;
        match table.polls.get_mut(poll_id) {
            Some(entry) => entry.expiry = Some(expiry),
            None => expiry.abort(),
        }
    }

    /// Reconciles a reaction event and re-renders the poll it belongs to.
    ///
    /// A failed render abandons the poll: it is closed without a final render.
    pub async fn handle_vote(&self, event: VoteEvent) -> VoteOutcome {
        let reconciled = {
            let mut table = self.table.lock().await;
            self.reconcile(&mut table, event)
        };

        let (render, label, votes) = match reconciled {
            Ok(reconciled) => reconciled,
            Err(reason) => {
                debug!("ignored vote event: {:?}", reason);
                return VoteOutcome::Ignored(reason);
            }
        };

        let poll_id = render.poll_id.clone();
        if let Err(e) = self.render(render).await {
            error!("failed to render poll {}, abandoning it: {:?}", poll_id, e);
            self.abandon(&poll_id).await;
        }

        VoteOutcome::Counted { label, votes }
    }

    /// Applies a vote event to the table and snapshots the updated poll.
    fn reconcile(
        &self,
        table: &mut PollTable,
        event: VoteEvent,
    ) -> Result<(Render, char, usize), IgnoredVote> {
        let (entry, option) = match event {
            VoteEvent::Added {
                poll_id,
                reaction_id,
                key,
                voter,
            } => {
                if voter == self.bot_user_id {
                    return Err(IgnoredVote::OwnReaction);
                }
                let Some(entry) = table.polls.get_mut(&poll_id) else {
                    return Err(IgnoredVote::UnknownPoll);
                };
                if entry.poll.status != PollStatus::Open {
                    return Err(IgnoredVote::UnknownPoll);
                }
                if table.early_removals.remove(&reaction_id).is_some() {
                    debug!("reaction {} was removed before it arrived", reaction_id);
                    entry.tally.retract(&reaction_id);
                    return Err(IgnoredVote::Duplicate);
                }
                let Some(option) = entry.poll.option_index(&key) else {
                    return Err(IgnoredVote::UnknownLabel);
                };
                if !entry.tally.add(&reaction_id, option, &voter) {
                    return Err(IgnoredVote::Duplicate);
                }
                debug!("{} voted {} on poll {}", voter, key, poll_id);
                table.reactions.insert(reaction_id, poll_id);
                (entry, option)
            }
            VoteEvent::Removed {
                room_id,
                reaction_id,
            } => {
                let Some(poll_id) = table.reactions.remove(&reaction_id) else {
                    // The reaction may still be on its way
                    if table.polls.values().any(|entry| entry.poll.room_id == room_id) {
                        table.early_removals.insert(reaction_id, room_id);
                    }
                    return Err(IgnoredVote::UnknownReaction);
                };
                let Some(entry) = table.polls.get_mut(&poll_id) else {
                    return Err(IgnoredVote::UnknownPoll);
                };
                if entry.poll.status != PollStatus::Open {
                    return Err(IgnoredVote::UnknownPoll);
                }
                let Some(option) = entry.tally.retract(&reaction_id) else {
                    return Err(IgnoredVote::UnknownReaction);
                };
                debug!("reaction {} removed from poll {}", reaction_id, poll_id);
                (entry, option)
            }
        };

        let votes = entry.tally.count(option);
        let poll_option = &mut entry.poll.options[option];
        poll_option.vote_count = votes;
        let label = poll_option.label;

        Ok((snapshot(entry), label, votes))
    }

    /// Renders a snapshot unless a newer revision was already shown.
    async fn render(&self, render: Render) -> Result<(), anyhow::Error> {
        let mut rendered = render.rendered.lock().await;
        if render.revision <= *rendered {
            debug!(
                "skip stale render of poll {} (revision {} <= {})",
                render.poll_id, render.revision, *rendered
            );
            return Ok(());
        }

        self.messenger
            .edit_message(&render.room_id, &render.poll_id, &render.body)
            .await?;
        *rendered = render.revision;

        Ok(())
    }

    /// Closes a poll and renders its final tally.
    ///
    /// Returns `false` when the poll is unknown or already closed, closing is
    /// idempotent.
    pub async fn close(&self, poll_id: &str, reason: CloseReason) -> bool {
        let render = {
            let mut table = self.table.lock().await;
            let Some(mut entry) = detach(&mut table, poll_id) else {
                debug!("poll {} is not open, nothing to close", poll_id);
                return false;
            };

            // The expiry task is the caller when the poll expired
            if reason != CloseReason::Expired {
                if let Some(expiry) = entry.expiry.take() {
                    expiry.abort();
                }
            }

            snapshot(&mut entry)
        };

        info!("closed poll {} ({:?})", poll_id, reason);

        if let Err(e) = self.render(render).await {
            error!("failed to render final tally of poll {}: {:?}", poll_id, e);
        }

        true
    }

    /// Closes a poll without rendering it, after its message became unusable.
    async fn abandon(&self, poll_id: &str) {
        let mut table = self.table.lock().await;
        if let Some(mut entry) = detach(&mut table, poll_id) {
            if let Some(expiry) = entry.expiry.take() {
                expiry.abort();
            }
            warn!("abandoned poll {}", poll_id);
        }
    }

    /// Returns the id and author of the most recently opened poll of a room.
    pub async fn latest_open_poll(&self, room_id: &str) -> Option<(String, String)> {
        let table = self.table.lock().await;
        table
            .polls
            .values()
            .filter(|entry| entry.poll.room_id == room_id)
            .max_by_key(|entry| entry.sequence)
            .map(|entry| (entry.poll.id.clone(), entry.poll.created_by.clone()))
    }
}

/// Removes a poll and its reactions from the table, marking it closed.
///
/// Early removals of the room are dropped with its last open poll.
fn detach(table: &mut PollTable, poll_id: &str) -> Option<PollEntry> {
    let mut entry = table.polls.remove(poll_id)?;
    table.reactions.retain(|_, id| id != poll_id);

    let room_id = &entry.poll.room_id;
    if !table.polls.values().any(|other| &other.poll.room_id == room_id) {
        table.early_removals.retain(|_, room| room.as_str() != room_id.as_str());
    }
    entry.poll.status = PollStatus::Closed;
    Some(entry)
}

/// Bumps the poll revision and captures its rendered body.
fn snapshot(entry: &mut PollEntry) -> Render {
    entry.revision += 1;

    Render {
        poll_id: entry.poll.id.clone(),
        room_id: entry.poll.room_id.clone(),
        body: format_poll(&entry.poll),
        revision: entry.revision,
        rendered: Arc::clone(&entry.rendered),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::matrix::MockMessenger;

    const ROOM: &str = "!room:example.com";
    const BOT: &str = "@bot:example.com";
    const POLL_ID: &str = "$poll:example.com";

    /// Messenger accepting every call and recording edited bodies.
    fn create_messenger(edits: Arc<StdMutex<Vec<String>>>) -> MockMessenger {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_send_message()
            .returning(|_, _| Ok(POLL_ID.to_owned()));
        messenger.expect_send_reaction().returning(|_, _, _| Ok(()));
        messenger
            .expect_edit_message()
            .returning(move |_, _, body| {
                edits.lock().unwrap().push(body.to_owned());
                Ok(())
            });
        messenger
    }

    fn added(reaction_id: &str, key: &str, voter: &str) -> VoteEvent {
        VoteEvent::Added {
            poll_id: POLL_ID.to_owned(),
            reaction_id: reaction_id.to_owned(),
            key: key.to_owned(),
            voter: voter.to_owned(),
        }
    }

    fn removed(reaction_id: &str) -> VoteEvent {
        VoteEvent::Removed {
            room_id: ROOM.to_owned(),
            reaction_id: reaction_id.to_owned(),
        }
    }

    async fn vote_counts(engine: &PollEngine<MockMessenger>) -> Vec<usize> {
        let table = engine.table.lock().await;
        table.polls[POLL_ID]
            .poll
            .options
            .iter()
            .map(|o| o.vote_count)
            .collect()
    }

    #[tokio::test]
    async fn test_open_sends_poll_and_seeds_reactions() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_send_message()
            .withf(|room_id, body| {
                room_id == ROOM && body.contains("Best color?") && body.contains("Blue: 0 votes")
            })
            .times(1)
            .returning(|_, _| Ok(POLL_ID.to_owned()));
        for key in ["🇦", "🇧", "🇨"] {
            messenger
                .expect_send_reaction()
                .withf(move |room_id, event_id, k| {
                    room_id == ROOM && event_id == POLL_ID && k == key
                })
                .times(1)
                .returning(|_, _, _| Ok(()));
        }

        let engine = PollEngine::new(Arc::new(messenger), BOT);
        let handle = engine
            .open(ROOM, "@alice:example.com", r#""Best color?", Red, Green, Blue"#)
            .await
            .unwrap();

        assert_eq!(handle.poll_id, POLL_ID);
        assert_eq!(handle.room_id, ROOM);
        assert_eq!(vote_counts(&engine).await, vec![0, 0, 0]);

        let table = engine.table.lock().await;
        let poll = &table.polls[POLL_ID].poll;
        assert_eq!(poll.status, PollStatus::Open);
        let labels: Vec<char> = poll.options.iter().map(|o| o.label).collect();
        assert_eq!(labels, vec!['A', 'B', 'C']);
    }

    #[tokio::test]
    async fn test_open_rejects_too_few_options() {
        let mut messenger = MockMessenger::new();
        messenger.expect_send_message().never();
        messenger.expect_send_reaction().never();

        let engine = PollEngine::new(Arc::new(messenger), BOT);
        let result = engine.open(ROOM, "@alice:example.com", "Question?, Only").await;

        assert_eq!(result, Err(PollError::TooFewOptions));
        assert!(engine.table.lock().await.polls.is_empty());
    }

    #[tokio::test]
    async fn test_open_send_failure_creates_nothing() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_send_message()
            .returning(|_, _| Err(anyhow::anyhow!("room not found")));
        messenger.expect_send_reaction().never();

        let engine = PollEngine::new(Arc::new(messenger), BOT);
        let result = engine.open(ROOM, "@alice:example.com", "Q, A, B").await;

        assert_eq!(result, Err(PollError::SendFailed));
        assert!(engine.table.lock().await.polls.is_empty());
    }

    #[tokio::test]
    async fn test_open_survives_seed_failure() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_send_message()
            .returning(|_, _| Ok(POLL_ID.to_owned()));
        messenger
            .expect_send_reaction()
            .times(2)
            .returning(|_, _, _| Err(anyhow::anyhow!("rate limited")));

        let engine = PollEngine::new(Arc::new(messenger), BOT);
        assert!(engine.open(ROOM, "@alice:example.com", "Q, A, B").await.is_ok());
        assert!(engine.table.lock().await.polls.contains_key(POLL_ID));
    }

    #[tokio::test]
    async fn test_vote_scenario() {
        let edits = Arc::new(StdMutex::new(Vec::new()));
        let engine = PollEngine::new(Arc::new(create_messenger(Arc::clone(&edits))), BOT);
        engine
            .open(ROOM, "@alice:example.com", r#""Best color?", Red, Green, Blue"#)
            .await
            .unwrap();

        engine.handle_vote(added("$r1", "🇧", "@alice:example.com")).await;
        engine.handle_vote(added("$r2", "🇧", "@bob:example.com")).await;
        let outcome = engine.handle_vote(added("$r3", "🇦", "@carol:example.com")).await;
        assert_eq!(outcome, VoteOutcome::Counted { label: 'A', votes: 1 });
        assert_eq!(vote_counts(&engine).await, vec![1, 2, 0]);

        let outcome = engine.handle_vote(removed("$r2")).await;
        assert_eq!(outcome, VoteOutcome::Counted { label: 'B', votes: 1 });
        assert_eq!(vote_counts(&engine).await, vec![1, 1, 0]);

        let edits = edits.lock().unwrap();
        assert_eq!(edits.len(), 4);
        let last = edits.last().unwrap();
        assert!(last.contains("Red: 1 vote"));
        assert!(last.contains("Green: 1 vote"));
        assert!(last.contains("Blue: 0 votes"));
    }

    #[tokio::test]
    async fn test_duplicate_delivery_is_idempotent() {
        let edits = Arc::new(StdMutex::new(Vec::new()));
        let engine = PollEngine::new(Arc::new(create_messenger(Arc::clone(&edits))), BOT);
        engine.open(ROOM, "@alice:example.com", "Q, A, B").await.unwrap();

        engine.handle_vote(added("$r1", "🇦", "@alice:example.com")).await;
        let outcome = engine.handle_vote(added("$r1", "🇦", "@alice:example.com")).await;

        assert_eq!(outcome, VoteOutcome::Ignored(IgnoredVote::Duplicate));
        assert_eq!(vote_counts(&engine).await, vec![1, 0]);
        assert_eq!(edits.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ignored_votes_do_not_change_counts() {
        let edits = Arc::new(StdMutex::new(Vec::new()));
        let engine = PollEngine::new(Arc::new(create_messenger(Arc::clone(&edits))), BOT);
        engine.open(ROOM, "@alice:example.com", "Q, A, B").await.unwrap();

        assert_eq!(
            engine.handle_vote(added("$r1", "🇦", BOT)).await,
            VoteOutcome::Ignored(IgnoredVote::OwnReaction)
        );
        assert_eq!(
            engine.handle_vote(added("$r2", "🇿", "@alice:example.com")).await,
            VoteOutcome::Ignored(IgnoredVote::UnknownLabel)
        );
        assert_eq!(
            engine.handle_vote(added("$r3", "👍", "@alice:example.com")).await,
            VoteOutcome::Ignored(IgnoredVote::UnknownLabel)
        );
        assert_eq!(
            engine
                .handle_vote(VoteEvent::Added {
                    poll_id: "$other:example.com".to_owned(),
                    reaction_id: "$r4".to_owned(),
                    key: "🇦".to_owned(),
                    voter: "@alice:example.com".to_owned(),
                })
                .await,
            VoteOutcome::Ignored(IgnoredVote::UnknownPoll)
        );
        assert_eq!(
            engine.handle_vote(removed("$unknown")).await,
            VoteOutcome::Ignored(IgnoredVote::UnknownReaction)
        );

        assert_eq!(vote_counts(&engine).await, vec![0, 0]);
        assert!(edits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_removal_before_reaction_is_not_counted() {
        let edits = Arc::new(StdMutex::new(Vec::new()));
        let engine = PollEngine::new(Arc::new(create_messenger(Arc::clone(&edits))), BOT);
        engine.open(ROOM, "@alice:example.com", "Q, A, B").await.unwrap();

        assert_eq!(
            engine.handle_vote(removed("$r1")).await,
            VoteOutcome::Ignored(IgnoredVote::UnknownReaction)
        );
        assert_eq!(
            engine.handle_vote(added("$r1", "🇦", "@alice:example.com")).await,
            VoteOutcome::Ignored(IgnoredVote::Duplicate)
        );
        assert_eq!(
            engine.handle_vote(added("$r1", "🇦", "@alice:example.com")).await,
            VoteOutcome::Ignored(IgnoredVote::Duplicate)
        );

        assert_eq!(vote_counts(&engine).await, vec![0, 0]);
        assert!(edits.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_final_counts_do_not_depend_on_delivery_order() {
        let events = [
            added("$r1", "🇧", "@alice:example.com"),
            added("$r2", "🇧", "@bob:example.com"),
            added("$r3", "🇦", "@carol:example.com"),
            removed("$r2"),
        ];
        let orders = [
            [0, 1, 2, 3],
            [3, 0, 1, 2],
            [0, 3, 2, 1],
            [2, 3, 1, 0],
            [1, 3, 0, 2],
            [3, 2, 1, 0],
        ];

        for order in orders {
            let edits = Arc::new(StdMutex::new(Vec::new()));
            let engine = PollEngine::new(Arc::new(create_messenger(edits)), BOT);
            engine
                .open(ROOM, "@alice:example.com", r#""Best color?", Red, Green, Blue"#)
                .await
                .unwrap();

            for index in order {
                engine.handle_vote(events[index].clone()).await;
            }

            assert_eq!(vote_counts(&engine).await, vec![1, 1, 0], "order {:?}", order);
        }
    }

    #[tokio::test]
    async fn test_early_removals_outside_polled_rooms_are_not_kept() {
        let engine = PollEngine::new(Arc::new(create_messenger(Arc::default())), BOT);

        engine.handle_vote(removed("$r1")).await;
        assert!(engine.table.lock().await.early_removals.is_empty());

        engine.open(ROOM, "@alice:example.com", "Q, A, B").await.unwrap();
        engine.handle_vote(removed("$r2")).await;
        assert!(engine.table.lock().await.early_removals.contains_key("$r2"));

        engine.close(POLL_ID, CloseReason::Ended).await;
        assert!(engine.table.lock().await.early_removals.is_empty());
    }

    #[tokio::test]
    async fn test_close_renders_final_tally_once() {
        let edits = Arc::new(StdMutex::new(Vec::new()));
        let engine = PollEngine::new(Arc::new(create_messenger(Arc::clone(&edits))), BOT);
        engine.open(ROOM, "@alice:example.com", "Q, A, B").await.unwrap();
        engine.handle_vote(added("$r1", "🇦", "@alice:example.com")).await;

        assert!(engine.close(POLL_ID, CloseReason::Ended).await);
        assert!(!engine.close(POLL_ID, CloseReason::Ended).await);
        assert!(!engine.close(POLL_ID, CloseReason::Expired).await);

        let edits = edits.lock().unwrap();
        assert_eq!(edits.len(), 2);
        assert!(edits[1].contains("closed"));
        assert!(edits[1].contains("A: 1 vote"));
    }

    #[tokio::test]
    async fn test_votes_after_close_are_ignored() {
        let edits = Arc::new(StdMutex::new(Vec::new()));
        let engine = PollEngine::new(Arc::new(create_messenger(Arc::clone(&edits))), BOT);
        engine.open(ROOM, "@alice:example.com", "Q, A, B").await.unwrap();
        engine.handle_vote(added("$r1", "🇦", "@alice:example.com")).await;
        engine.close(POLL_ID, CloseReason::Expired).await;

        assert_eq!(
            engine.handle_vote(added("$r2", "🇧", "@bob:example.com")).await,
            VoteOutcome::Ignored(IgnoredVote::UnknownPoll)
        );
        assert_eq!(
            engine.handle_vote(removed("$r1")).await,
            VoteOutcome::Ignored(IgnoredVote::UnknownReaction)
        );

        assert!(engine.table.lock().await.polls.is_empty());
        assert_eq!(edits.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_render_failure_abandons_poll() {
        let mut messenger = MockMessenger::new();
        messenger
            .expect_send_message()
            .returning(|_, _| Ok(POLL_ID.to_owned()));
        messenger.expect_send_reaction().returning(|_, _, _| Ok(()));
        messenger
            .expect_edit_message()
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("message deleted")));

        let engine = PollEngine::new(Arc::new(messenger), BOT);
        engine.open(ROOM, "@alice:example.com", "Q, A, B").await.unwrap();

        let outcome = engine.handle_vote(added("$r1", "🇦", "@alice:example.com")).await;
        assert_eq!(outcome, VoteOutcome::Counted { label: 'A', votes: 1 });
        assert!(engine.table.lock().await.polls.is_empty());

        assert_eq!(
            engine.handle_vote(added("$r2", "🇦", "@bob:example.com")).await,
            VoteOutcome::Ignored(IgnoredVote::UnknownPoll)
        );
        assert!(!engine.close(POLL_ID, CloseReason::Ended).await);
    }

    #[tokio::test]
    async fn test_stale_render_is_skipped() {
        let edits = Arc::new(StdMutex::new(Vec::new()));
        let engine = PollEngine::new(Arc::new(create_messenger(Arc::clone(&edits))), BOT);
        engine.open(ROOM, "@alice:example.com", "Q, A, B").await.unwrap();

        let (older, newer) = {
            let mut table = engine.table.lock().await;
            let older = engine
                .reconcile(&mut table, added("$r1", "🇦", "@alice:example.com"))
                .unwrap()
                .0;
            let newer = engine
                .reconcile(&mut table, added("$r2", "🇦", "@bob:example.com"))
                .unwrap()
                .0;
            (older, newer)
        };

        // The newer snapshot wins the race to the render lock
        engine.render(newer).await.unwrap();
        engine.render(older).await.unwrap();

        let edits = edits.lock().unwrap();
        assert_eq!(edits.len(), 1);
        assert!(edits[0].contains("A: 2 votes"));
    }

    #[tokio::test]
    async fn test_latest_open_poll() {
        let mut messenger = MockMessenger::new();
        let mut next_id = 0;
        messenger.expect_send_message().returning(move |_, _| {
            next_id += 1;
            Ok(format!("$poll{}:example.com", next_id))
        });
        messenger.expect_send_reaction().returning(|_, _, _| Ok(()));
        messenger.expect_edit_message().returning(|_, _, _| Ok(()));

        let engine = PollEngine::new(Arc::new(messenger), BOT);
        assert_eq!(engine.latest_open_poll(ROOM).await, None);

        engine.open(ROOM, "@alice:example.com", "Q, A, B").await.unwrap();
        engine.open(ROOM, "@bob:example.com", "Q, A, B").await.unwrap();
        engine.open("!other:example.com", "@carol:example.com", "Q, A, B").await.unwrap();

        assert_eq!(
            engine.latest_open_poll(ROOM).await,
            Some(("$poll2:example.com".to_owned(), "@bob:example.com".to_owned()))
        );

        engine.close("$poll2:example.com", CloseReason::Ended).await;
        assert_eq!(
            engine.latest_open_poll(ROOM).await,
            Some(("$poll1:example.com".to_owned(), "@alice:example.com".to_owned()))
        );
    }

    #[tokio::test]
    async fn test_close_aborts_expiry_task() {
        let edits = Arc::new(StdMutex::new(Vec::new()));
        let engine = PollEngine::new(Arc::new(create_messenger(edits)), BOT);
        engine.open(ROOM, "@alice:example.com", "Q, A, B").await.unwrap();

        let task = tokio::spawn(async { tokio::time::sleep(std::time::Duration::from_secs(3600)).await });
        engine.set_expiry(POLL_ID, task.abort_handle()).await;
        engine.close(POLL_ID, CloseReason::Ended).await;

        assert!(task.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn test_set_expiry_on_closed_poll_aborts_task() {
        let engine = PollEngine::new(Arc::new(MockMessenger::new()), BOT);

        let task = tokio::spawn(async { tokio::time::sleep(std::time::Duration::from_secs(3600)).await });
        engine.set_expiry(POLL_ID, task.abort_handle()).await;

        assert!(task.await.unwrap_err().is_cancelled());
    }
}
