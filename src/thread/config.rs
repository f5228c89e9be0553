//! Engine configuration

use serde::{Deserialize, Serialize};

/// Net score a node needs before it is highlighted
pub const HIGHLIGHT_THRESHOLD: i64 = 10;

/// Text shown in place of a deleted node's content
pub const TOMBSTONE_MARKER: &str = "[deleted]";

/// Which tally the highlight threshold is compared against
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HighlightBasis {
    /// Upvotes minus downvotes
    #[default]
    NetScore,

    /// Upvotes alone, ignoring downvotes
    Upvotes,
}

/// Rule deriving the highlight flag from a ledger's counts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightRule {
    pub basis: HighlightBasis,
    pub threshold: i64,
}

impl HighlightRule {
    pub fn is_highlighted(&self, upvotes: usize, downvotes: usize) -> bool {
        let tally = match self.basis {
            HighlightBasis::NetScore => upvotes as i64 - downvotes as i64,
            HighlightBasis::Upvotes => upvotes as i64,
        };
        tally >= self.threshold
    }
}

impl Default for HighlightRule {
    fn default() -> Self {
        Self {
            basis: HighlightBasis::NetScore,
            threshold: HIGHLIGHT_THRESHOLD,
        }
    }
}

/// Whether a deleted node can still receive replies
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplyPolicy {
    #[default]
    RejectTombstoned,
    AllowTombstoned,
}

/// Configuration for a [`ThreadEngine`](super::ThreadEngine).
#[derive(Clone, Debug, Default)]
pub struct EngineConfig {
    /// Highlight rule given to every thread the engine creates
    pub highlight: HighlightRule,
    /// Applied by `add_reply` when the target is tombstoned
    pub reply_policy: ReplyPolicy,
}
