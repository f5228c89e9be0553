//! The comment forest of one post

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::{HighlightRule, ReplyPolicy};
use super::node::CommentNode;
use super::path::{self, CommentPath};
use super::votes::{VoteDirection, VoteLedger, VoteOutcome};
use super::ThreadError;

/// Author and body of the post a thread hangs off
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PostHeader {
    pub author: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Ordered, append-only forest of top-level comments for one post.
///
/// Nodes sit in one arena in creation order and point at each other by key.
/// Every mutation resolves its full path before touching anything, so a failed
/// call leaves the forest unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ThreadStore {
    post: Option<PostHeader>,
    post_votes: VoteLedger,
    nodes: Vec<CommentNode>,
    /// Arena keys of top-level comments, in insertion order
    roots: Vec<usize>,
    rule: HighlightRule,
}

impl ThreadStore {
    pub fn new(rule: HighlightRule) -> Self {
        Self {
            post: None,
            post_votes: VoteLedger::with_rule(rule),
            nodes: Vec::new(),
            roots: Vec::new(),
            rule,
        }
    }

    pub fn with_post(author: String, body: String, rule: HighlightRule) -> Self {
        let mut store = Self::new(rule);
        store.post = Some(PostHeader {
            author,
            body,
            created_at: Utc::now(),
        });
        store
    }

    pub fn post(&self) -> Option<&PostHeader> {
        self.post.as_ref()
    }

    pub fn post_votes(&self) -> &VoteLedger {
        &self.post_votes
    }

    /// Top-level comments in insertion order
    pub fn comments(&self) -> impl ExactSizeIterator<Item = &CommentNode> + '_ {
        self.roots.iter().map(move |&key| &self.nodes[key])
    }

    pub fn rule(&self) -> HighlightRule {
        self.rule
    }

    /// Replace the post body. Returns false for a thread without a post header.
    pub fn edit_post(&mut self, body: String) -> bool {
        match self.post.as_mut() {
            Some(post) => {
                post.body = body;
                true
            }
            None => false,
        }
    }

    /// Append a top-level comment and return its id.
    pub fn add_top_level(&mut self, content: String, author: String) -> usize {
        let id = self.roots.len();
        self.roots.push(self.nodes.len());
        self.nodes
            .push(CommentNode::new(id, None, content, author, self.rule));
        id
    }

    /// Arena key of the node at `path`, one path segment at a time.
    fn locate(&self, path: &str) -> Result<usize, ThreadError> {
        check(path)?;
        let mut siblings = self.roots.as_slice();
        let mut rest = path;
        loop {
            let (index, tail) = path::decode(rest)?;
            let key = siblings
                .get(index)
                .copied()
                .ok_or_else(|| ThreadError::OutOfRange {
                    path: path.to_string(),
                    index,
                    len: siblings.len(),
                })?;
            if tail.is_empty() {
                return Ok(key);
            }
            siblings = self.nodes[key].child_keys();
            rest = tail;
        }
    }

    /// Find the node at `path`.
    pub fn resolve(&self, path: &str) -> Result<&CommentNode, ThreadError> {
        let key = self.locate(path)?;
        Ok(&self.nodes[key])
    }

    pub fn resolve_mut(&mut self, path: &str) -> Result<&mut CommentNode, ThreadError> {
        let key = self.locate(path)?;
        Ok(&mut self.nodes[key])
    }

    /// Append a reply under the node at `path` and return the reply's path.
    pub fn add_reply(
        &mut self,
        path: &str,
        content: String,
        author: String,
        policy: ReplyPolicy,
    ) -> Result<CommentPath, ThreadError> {
        let parent_path: CommentPath = path.parse()?;
        let parent = self.locate(path)?;
        if self.nodes[parent].is_deleted() && policy == ReplyPolicy::RejectTombstoned {
            return Err(ThreadError::TombstonedTarget(path.to_string()));
        }

        let key = self.nodes.len();
        let id = self.nodes[parent].reply_count();
        self.nodes
            .push(CommentNode::new(id, Some(parent), content, author, self.rule));
        self.nodes[parent].adopt(key);
        Ok(parent_path.child(id))
    }

    /// Tombstone the node at `path`. Returns false if it was already deleted.
    pub fn delete(&mut self, path: &str) -> Result<bool, ThreadError> {
        Ok(self.resolve_mut(path)?.tombstone())
    }

    /// Toggle a vote on the node at `path`, or on the post itself when `path` is
    /// absent or empty.
    pub fn vote(
        &mut self,
        path: Option<&str>,
        username: &str,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, ThreadError> {
        let ledger = self.ledger_mut(path)?;
        Ok(ledger.vote(username, direction))
    }

    pub fn ledger(&self, path: Option<&str>) -> Result<&VoteLedger, ThreadError> {
        match path.filter(|p| !p.is_empty()) {
            Some(p) => Ok(self.resolve(p)?.votes()),
            None => Ok(&self.post_votes),
        }
    }

    fn ledger_mut(&mut self, path: Option<&str>) -> Result<&mut VoteLedger, ThreadError> {
        match path.filter(|p| !p.is_empty()) {
            Some(p) => Ok(self.resolve_mut(p)?.votes_mut()),
            None => Ok(&mut self.post_votes),
        }
    }

    /// Depth-first, pre-order walk of the whole forest
    pub fn walk(&self) -> Walk<'_> {
        let stack = self
            .roots
            .iter()
            .enumerate()
            .rev()
            .map(|(i, &key)| (key, CommentPath::top_level(i)))
            .collect();
        Walk { store: self, stack }
    }

    /// Pre-order walk of the subtree rooted at `path`
    pub fn walk_at(&self, path: &str) -> Result<Walk<'_>, ThreadError> {
        let typed: CommentPath = path.parse()?;
        let key = self.locate(path)?;
        Ok(Walk {
            store: self,
            stack: vec![(key, typed)],
        })
    }

    /// Non-deleted comments and replies across the whole forest
    pub fn live_count(&self) -> usize {
        self.nodes.iter().filter(|node| !node.is_deleted()).count()
    }

    /// Structural check for state restored from outside the engine: every node
    /// is reached exactly once, ids match positions, parents precede children.
    pub(crate) fn is_consistent(&self) -> bool {
        let mut seen = vec![false; self.nodes.len()];
        let mut claim = |key: usize, parent: Option<usize>, position: usize| -> bool {
            match (self.nodes.get(key), seen.get_mut(key)) {
                (Some(node), Some(reached)) if !*reached => {
                    *reached = true;
                    node.id() == position
                        && node.parent() == parent
                        && parent.map_or(true, |p| p < key)
                }
                _ => false,
            }
        };

        for (position, &key) in self.roots.iter().enumerate() {
            if !claim(key, None, position) {
                return false;
            }
        }
        for (parent, node) in self.nodes.iter().enumerate() {
            for (position, &key) in node.child_keys().iter().enumerate() {
                if !claim(key, Some(parent), position) {
                    return false;
                }
            }
        }

        seen.iter().all(|&reached| reached)
            && self.post_votes.is_consistent()
            && self.nodes.iter().all(|node| node.votes().is_consistent())
    }
}

impl Default for ThreadStore {
    fn default() -> Self {
        Self::new(HighlightRule::default())
    }
}

/// Pre-order iterator over `(path, node)` pairs, driven by an explicit stack
pub struct Walk<'a> {
    store: &'a ThreadStore,
    stack: Vec<(usize, CommentPath)>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = (CommentPath, &'a CommentNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, path) = self.stack.pop()?;
        let node = &self.store.nodes[key];
        for (i, &child) in node.child_keys().iter().enumerate().rev() {
            self.stack.push((child, path.child(i)));
        }
        Some((path, node))
    }
}

fn check(path: &str) -> Result<(), ThreadError> {
    if path::is_well_formed(path) {
        Ok(())
    } else {
        Err(ThreadError::Malformed(path.to_string()))
    }
}
