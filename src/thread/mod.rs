//! Threaded comments for forum posts
//!
//! Comments and replies form an ordered forest per post, addressed by dotted
//! positional paths (`"2.0.1"`). Nodes are tombstoned rather than removed, so a
//! path stays valid for the life of the thread. Every node carries a toggle vote
//! ledger whose net score drives a derived highlight flag.

pub mod config;
pub mod engine;
pub mod node;
pub mod path;
pub mod render;
pub mod snapshot;
pub mod store;
pub mod votes;

pub use config::{
    EngineConfig, HighlightBasis, HighlightRule, ReplyPolicy, HIGHLIGHT_THRESHOLD,
    TOMBSTONE_MARKER,
};
pub use engine::{ThreadEngine, ThreadId};
pub use node::CommentNode;
pub use path::CommentPath;
pub use render::{render, NodeView, PostView, ThreadView, HIGHLIGHT_MARKER};
pub use snapshot::ThreadSnapshot;
pub use store::{PostHeader, ThreadStore, Walk};
pub use votes::{VoteDirection, VoteLedger, VoteOutcome};

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ThreadError {
    #[error("Malformed path: {0:?}")]
    Malformed(String),

    #[error("Path {path} out of range: index {index} with {len} siblings")]
    OutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("Thread not found: {0}")]
    NotFound(Uuid),

    #[error("Cannot reply to deleted comment {0}")]
    TombstonedTarget(String),

    #[error("Invalid vote direction: {0}")]
    InvalidVote(String),

    #[error("Thread already exists: {0}")]
    AlreadyExists(Uuid),

    #[error("Corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Lock poisoned")]
    LockPoisoned,
}
