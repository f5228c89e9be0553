//! Plain-text projection and serialisable views of a thread
//!
//! Both walk the forest depth-first, pre-order, in insertion order. Neither vote
//! scores nor tombstones affect where a node appears.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::node::CommentNode;
use super::path::CommentPath;
use super::store::ThreadStore;
use super::votes::VoteLedger;
use super::ThreadError;

/// Appended to the tally of a highlighted node
pub const HIGHLIGHT_MARKER: &str = "[*]";

const INDENT: &str = "  ";

/// Render a thread as an indented text block.
pub fn render(store: &ThreadStore) -> String {
    let mut out = String::new();

    match store.post() {
        Some(post) => {
            let _ = writeln!(out, "({}): {}", post.author, post.body);
        }
        None => out.push_str("(post)\n"),
    }
    let _ = writeln!(out, "{}", tally(store.post_votes()));

    if store.comments().len() > 0 {
        out.push('\n');
    }
    for (path, node) in store.walk() {
        let _ = writeln!(
            out,
            "{}[{}] ({}) {}  {}",
            INDENT.repeat(path.depth() - 1),
            path,
            node.author(),
            node.content(),
            tally(node.votes())
        );
    }
    out
}

fn tally(votes: &VoteLedger) -> String {
    let (up, down) = votes.counts();
    let mut line = format!("^{} v{} score {}", up, down, votes.net_score());
    if votes.highlighted() {
        line.push(' ');
        line.push_str(HIGHLIGHT_MARKER);
    }
    line
}

// === Views ===

/// Read-only view of one node and its replies
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NodeView {
    pub path: CommentPath,
    pub author: String,
    pub content: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub upvotes: usize,
    pub downvotes: usize,
    pub score: i64,
    pub highlighted: bool,
    pub replies: Vec<NodeView>,
}

impl NodeView {
    /// View of the subtree at `path`
    pub fn at(store: &ThreadStore, path: &str) -> Result<Self, ThreadError> {
        let mut views = assemble(store.walk_at(path)?);
        views
            .pop()
            .ok_or_else(|| ThreadError::Malformed(path.to_string()))
    }

    fn without_replies(path: CommentPath, node: &CommentNode) -> Self {
        let (upvotes, downvotes) = node.votes().counts();
        Self {
            path,
            author: node.author().to_string(),
            content: node.content().to_string(),
            deleted: node.is_deleted(),
            created_at: node.created_at(),
            upvotes,
            downvotes,
            score: node.votes().net_score(),
            highlighted: node.votes().highlighted(),
            replies: Vec::new(),
        }
    }
}

/// Build nested views from a pre-order walk without recursing.
///
/// Visiting nodes in reverse pre-order finishes every reply before its parent,
/// and leaves a node's replies on top of the stack, first reply uppermost.
fn assemble<'a>(walk: impl Iterator<Item = (CommentPath, &'a CommentNode)>) -> Vec<NodeView> {
    let visited: Vec<_> = walk.collect();
    let mut finished: Vec<NodeView> = Vec::new();
    for (path, node) in visited.into_iter().rev() {
        let mut view = NodeView::without_replies(path, node);
        let split = finished.len().saturating_sub(node.reply_count());
        view.replies = finished.drain(split..).rev().collect();
        finished.push(view);
    }
    finished.reverse();
    finished
}

/// The post a thread belongs to, with its own tally
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PostView {
    pub author: Option<String>,
    pub body: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub upvotes: usize,
    pub downvotes: usize,
    pub score: i64,
    pub highlighted: bool,
}

/// Read-only view of a whole thread
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThreadView {
    pub thread_id: Uuid,
    pub post: PostView,
    pub comment_count: usize,
    pub comments: Vec<NodeView>,
}

impl ThreadView {
    pub fn new(thread_id: Uuid, store: &ThreadStore) -> Self {
        let votes = store.post_votes();
        let (upvotes, downvotes) = votes.counts();
        let post = PostView {
            author: store.post().map(|p| p.author.clone()),
            body: store.post().map(|p| p.body.clone()),
            created_at: store.post().map(|p| p.created_at),
            upvotes,
            downvotes,
            score: votes.net_score(),
            highlighted: votes.highlighted(),
        };

        Self {
            thread_id,
            post,
            comment_count: store.live_count(),
            comments: assemble(store.walk()),
        }
    }
}
