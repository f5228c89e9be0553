//! A single comment or reply

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::{HighlightRule, TOMBSTONE_MARKER};
use super::votes::VoteLedger;

/// One node in a comment forest.
///
/// Nodes live in their thread's arena and refer to each other by arena key, so
/// the forest has the same flat shape in memory and in a snapshot however deep
/// the replies go. Nodes are never removed: deleting one sets a tombstone and
/// masks its content, so every path into the forest stays valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentNode {
    /// Position among siblings when created
    id: usize,
    /// Arena key of the node replied to; `None` for top-level comments
    parent: Option<usize>,
    content: String,
    author: String,
    deleted: bool,
    created_at: DateTime<Utc>,
    /// Arena keys of replies, in insertion order
    children: Vec<usize>,
    votes: VoteLedger,
}

impl CommentNode {
    pub(crate) fn new(
        id: usize,
        parent: Option<usize>,
        content: String,
        author: String,
        rule: HighlightRule,
    ) -> Self {
        Self {
            id,
            parent,
            content,
            author,
            deleted: false,
            created_at: Utc::now(),
            children: Vec::new(),
            votes: VoteLedger::with_rule(rule),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    /// Content as shown to readers; the tombstone marker once deleted
    pub fn content(&self) -> &str {
        if self.deleted {
            TOMBSTONE_MARKER
        } else {
            &self.content
        }
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn reply_count(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn child_keys(&self) -> &[usize] {
        &self.children
    }

    pub fn votes(&self) -> &VoteLedger {
        &self.votes
    }

    pub fn votes_mut(&mut self) -> &mut VoteLedger {
        &mut self.votes
    }

    /// Record the reply stored under arena key `key` and return its id.
    pub(crate) fn adopt(&mut self, key: usize) -> usize {
        let id = self.children.len();
        self.children.push(key);
        id
    }

    /// Set the tombstone. Returns false if the node was already deleted.
    pub fn tombstone(&mut self) -> bool {
        if self.deleted {
            return false;
        }
        self.deleted = true;
        self.content = TOMBSTONE_MARKER.to_string();
        true
    }
}
