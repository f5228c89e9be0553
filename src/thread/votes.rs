//! Toggle vote ledger
//!
//! Each voter holds exactly one of: no vote, an upvote, or a downvote. Casting the
//! same vote twice clears it; casting the opposite vote flips it.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::config::HighlightRule;
use super::ThreadError;

/// Direction of a single vote
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    Up,
    Down,
}

impl VoteDirection {
    pub fn opposite(self) -> Self {
        match self {
            VoteDirection::Up => VoteDirection::Down,
            VoteDirection::Down => VoteDirection::Up,
        }
    }
}

impl fmt::Display for VoteDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteDirection::Up => f.write_str("up"),
            VoteDirection::Down => f.write_str("down"),
        }
    }
}

impl FromStr for VoteDirection {
    type Err = ThreadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "up" | "upvote" => Ok(VoteDirection::Up),
            "down" | "downvote" => Ok(VoteDirection::Down),
            other => Err(ThreadError::InvalidVote(other.to_string())),
        }
    }
}

/// What a single `vote` call did to the voter's state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    Cast,
    Flipped,
    Cleared,
}

/// Disjoint up/down voter sets for one node
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteLedger {
    upvoters: BTreeSet<String>,
    downvoters: BTreeSet<String>,
    rule: HighlightRule,
}

impl VoteLedger {
    /// Empty ledger using the default highlight rule
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty ledger using a specific highlight rule
    pub fn with_rule(rule: HighlightRule) -> Self {
        Self {
            rule,
            ..Self::default()
        }
    }

    /// Toggle `username`'s vote in `direction`.
    pub fn vote(&mut self, username: &str, direction: VoteDirection) -> VoteOutcome {
        let (same, opposite) = match direction {
            VoteDirection::Up => (&mut self.upvoters, &mut self.downvoters),
            VoteDirection::Down => (&mut self.downvoters, &mut self.upvoters),
        };

        let outcome = if same.remove(username) {
            VoteOutcome::Cleared
        } else {
            let flipped = opposite.remove(username);
            same.insert(username.to_string());
            if flipped {
                VoteOutcome::Flipped
            } else {
                VoteOutcome::Cast
            }
        };
        outcome
    }

    /// `(upvotes, downvotes)`
    pub fn counts(&self) -> (usize, usize) {
        (self.upvoters.len(), self.downvoters.len())
    }

    pub fn net_score(&self) -> i64 {
        self.upvoters.len() as i64 - self.downvoters.len() as i64
    }

    /// Derived from the current counts on every call
    pub fn highlighted(&self) -> bool {
        self.rule
            .is_highlighted(self.upvoters.len(), self.downvoters.len())
    }

    /// The vote `username` currently holds, if any
    pub fn vote_of(&self, username: &str) -> Option<VoteDirection> {
        if self.upvoters.contains(username) {
            Some(VoteDirection::Up)
        } else if self.downvoters.contains(username) {
            Some(VoteDirection::Down)
        } else {
            None
        }
    }

    pub fn upvoters(&self) -> impl Iterator<Item = &str> {
        self.upvoters.iter().map(String::as_str)
    }

    pub fn downvoters(&self) -> impl Iterator<Item = &str> {
        self.downvoters.iter().map(String::as_str)
    }

    pub fn rule(&self) -> HighlightRule {
        self.rule
    }

    /// Restored ledgers are checked before use; a voter in both sets cannot
    /// come out of `vote`.
    pub(crate) fn is_consistent(&self) -> bool {
        self.upvoters.is_disjoint(&self.downvoters)
    }
}
