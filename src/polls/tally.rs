//! Reaction-backed vote tally.
//!
//! A [`Tally`] stores the live reactions of a poll and derives every count from
//! them. Counts are never incremented or decremented in place, so a reaction
//! delivered twice, or a removal racing an addition, always settles on the
//! number of distinct voters currently reacting.

use std::collections::{HashMap, HashSet};

/// A live reaction counted for an option.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Ballot {
    /// Position of the option the reaction votes for
    option: usize,
    /// User who reacted
    voter: String,
}

/// Live reactions of a single poll.
#[derive(Debug, Default)]
pub struct Tally {
    /// Live reactions indexed by reaction event id
    ballots: HashMap<String, Ballot>,
    /// Reaction ids already removed, never counted again
    retracted: HashSet<String>,
}

impl Tally {
    /// Registers a reaction for an option.
    ///
    /// Returns `false` when the reaction is already known or was already
    /// removed, in which case nothing changes.
    pub fn add(&mut self, reaction_id: &str, option: usize, voter: &str) -> bool {
        if self.retracted.contains(reaction_id) || self.ballots.contains_key(reaction_id) {
            return false;
        }

        self.ballots.insert(
            reaction_id.to_owned(),
            Ballot {
                option,
                voter: voter.to_owned(),
            },
        );
        true
    }

    /// Removes a reaction and returns the option it was counted for.
    ///
    /// The reaction id is remembered so a late re-delivery of the reaction is
    /// ignored by [`Tally::add`].
    pub fn retract(&mut self, reaction_id: &str) -> Option<usize> {
        self.retracted.insert(reaction_id.to_owned());
        self.ballots.remove(reaction_id).map(|ballot| ballot.option)
    }

    /// Number of distinct users currently voting for `option`.
    pub fn count(&self, option: usize) -> usize {
        self.ballots
            .values()
            .filter(|ballot| ballot.option == option)
            .map(|ballot| ballot.voter.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_counts_distinct_voters() {
        let mut tally = Tally::default();

        assert!(tally.add("$r1", 1, "@alice:example.com"));
        assert!(tally.add("$r2", 1, "@bob:example.com"));
        assert!(tally.add("$r3", 0, "@alice:example.com"));

        assert_eq!(tally.count(0), 1);
        assert_eq!(tally.count(1), 2);
        assert_eq!(tally.count(2), 0);
    }

    #[test]
    fn test_duplicate_delivery_is_ignored() {
        let mut tally = Tally::default();

        assert!(tally.add("$r1", 0, "@alice:example.com"));
        assert!(!tally.add("$r1", 0, "@alice:example.com"));

        assert_eq!(tally.count(0), 1);
    }

    #[test]
    fn test_same_voter_twice_counts_once() {
        let mut tally = Tally::default();

        tally.add("$r1", 0, "@alice:example.com");
        tally.add("$r2", 0, "@alice:example.com");
        assert_eq!(tally.count(0), 1);

        // The vote stays while one of the reactions is still live
        tally.retract("$r1");
        assert_eq!(tally.count(0), 1);

        tally.retract("$r2");
        assert_eq!(tally.count(0), 0);
    }

    #[test]
    fn test_retract() {
        let mut tally = Tally::default();
        tally.add("$r1", 1, "@alice:example.com");
        tally.add("$r2", 1, "@bob:example.com");

        assert_eq!(tally.retract("$r1"), Some(1));
        assert_eq!(tally.count(1), 1);

        // Retracting twice is harmless
        assert_eq!(tally.retract("$r1"), None);
        assert_eq!(tally.count(1), 1);
    }

    #[test]
    fn test_retract_before_add_is_order_insensitive() {
        let mut tally = Tally::default();

        assert_eq!(tally.retract("$r1"), None);
        assert!(!tally.add("$r1", 0, "@alice:example.com"));

        assert_eq!(tally.count(0), 0);
    }

    #[test]
    fn test_redelivery_after_retract_does_not_resurrect() {
        let mut tally = Tally::default();

        tally.add("$r1", 0, "@alice:example.com");
        tally.retract("$r1");
        assert!(!tally.add("$r1", 0, "@alice:example.com"));

        assert_eq!(tally.count(0), 0);
    }

    #[test]
    fn test_final_count_independent_of_order() {
        let events: Vec<(&str, Option<&str>)> = vec![
            ("$r1", Some("@alice:example.com")),
            ("$r2", Some("@bob:example.com")),
            ("$r3", Some("@carol:example.com")),
            ("$r2", None),
            ("$r1", Some("@alice:example.com")),
        ];

        let apply = |order: &[usize]| {
            let mut tally = Tally::default();
            for &i in order {
                match events[i] {
                    (id, Some(voter)) => {
                        tally.add(id, 0, voter);
                    }
                    (id, None) => {
                        tally.retract(id);
                    }
                }
            }
            tally.count(0)
        };

        assert_eq!(apply(&[0, 1, 2, 3, 4]), 2);
        assert_eq!(apply(&[4, 3, 2, 1, 0]), 2);
        assert_eq!(apply(&[3, 1, 0, 2, 4]), 2);
    }
}
