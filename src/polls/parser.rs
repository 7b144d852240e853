//! Poll argument parsing.
//!
//! Accepts `<question>, <option>, <option>[, ...]`. Each segment is trimmed and
//! a single pair of surrounding quotes is removed, so `"Best color?", Red, Blue`
//! and `Best color?, Red, Blue` are equivalent.

use log::debug;

use crate::polls::{PollError, poll::MAX_OPTIONS};

/// Validated poll content, ready to be turned into a [`Poll`](crate::polls::Poll).
#[derive(Debug, PartialEq, Eq)]
pub struct PollDraft {
    pub question: String,
    pub options: Vec<String>,
}

/// Quote pairs stripped around a segment.
const QUOTES: [(char, char); 2] = [('"', '"'), ('“', '”')];

/// Parses the text following the poll command.
///
/// Empty option segments are dropped before counting options.
///
/// # Errors
///
/// - [`PollError::MissingQuestion`] if the question is empty
/// - [`PollError::TooFewOptions`] if fewer than two options remain
/// - [`PollError::TooManyOptions`] if there are more options than labels
pub fn parse_poll_arguments(arguments: &str) -> Result<PollDraft, PollError> {
    let mut segments = arguments.split(',').map(clean_segment);

    let question = segments.next().unwrap_or_default();
    if question.is_empty() {
        return Err(PollError::MissingQuestion);
    }

    let options: Vec<String> = segments.filter(|option| !option.is_empty()).collect();
    debug!("parsed poll question {:?} with options {:?}", question, options);

    if options.len() < 2 {
        return Err(PollError::TooFewOptions);
    }
    if options.len() > MAX_OPTIONS {
        return Err(PollError::TooManyOptions);
    }

    Ok(PollDraft { question, options })
}

fn clean_segment(segment: &str) -> String {
    let segment = segment.trim();

    QUOTES
        .iter()
        .find_map(|(open, close)| {
            segment
                .strip_prefix(*open)
                .and_then(|inner| inner.strip_suffix(*close))
        })
        .unwrap_or(segment)
        .trim()
        .to_owned()
}
