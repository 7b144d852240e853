//! Poll data structures.

use std::fmt;

use crate::polls::parser::PollDraft;

/// Highest number of options a poll can carry, one per letter of the alphabet.
pub const MAX_OPTIONS: usize = 26;

/// Code point of the regional indicator symbol for `A`.
const REGIONAL_INDICATOR_A: u32 = 0x1F1E6;

/// Lifecycle status of a poll.
///
/// `Closed` is terminal: a closed poll never accepts votes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    Open,
    Closed,
}

/// One option of a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOption {
    /// Letter derived from the option position (`A`, `B`, ...)
    pub label: char,
    /// Reaction key users vote with, the regional indicator emoji of the label
    pub key: String,
    /// Option text as typed by the poll author
    pub text: String,
    /// Number of distinct voters currently reacting with `key`
    pub vote_count: usize,
}

/// A voting session attached to one poll message.
#[derive(Debug, Clone)]
pub struct Poll {
    /// Event id of the poll message, empty until the message is sent
    pub id: String,
    /// Room the poll message lives in
    pub room_id: String,
    pub question: String,
    /// Options in the order they were typed
    pub options: Vec<PollOption>,
    /// User who started the poll
    pub created_by: String,
    pub status: PollStatus,
}

impl Poll {
    /// Builds an open poll from a validated draft, labelling options by position.
    pub fn new(room_id: &str, created_by: &str, draft: PollDraft) -> Self {
        let options = draft
            .options
            .into_iter()
            .enumerate()
            .map(|(index, text)| PollOption {
                label: label_for(index),
                key: key_for(index),
                text,
                vote_count: 0,
            })
            .collect();

        Poll {
            id: String::new(),
            room_id: room_id.to_owned(),
            question: draft.question,
            options,
            created_by: created_by.to_owned(),
            status: PollStatus::Open,
        }
    }

    /// Returns the position of the option voted with `key`.
    ///
    /// Both the emoji key and the plain label letter are accepted.
    pub fn option_index(&self, key: &str) -> Option<usize> {
        self.options
            .iter()
            .position(|option| option.key == key || key.eq_ignore_ascii_case(&option.label.to_string()))
    }
}

impl fmt::Display for Poll {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "id={}, room_id={}, question={}, options={}, status={:?}",
            self.id,
            self.room_id,
            self.question,
            self.options.len(),
            self.status
        )
    }
}

/// Letter labelling the option at `index`.
pub fn label_for(index: usize) -> char {
    char::from(b'A' + (index % MAX_OPTIONS) as u8)
}

/// Reaction key of the option at `index`.
pub fn key_for(index: usize) -> String {
    char::from_u32(REGIONAL_INDICATOR_A + (index % MAX_OPTIONS) as u32)
        .map(String::from)
        .unwrap_or_else(|| label_for(index).to_string())
}
