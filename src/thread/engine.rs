//! Entry point for all thread operations
//!
//! Holds every live thread behind its own mutex. The registry lock is only held
//! long enough to find or insert a thread, so operations on different posts never
//! wait on each other, while every operation on one post is serialized.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use uuid::Uuid;

use super::config::EngineConfig;
use super::path::CommentPath;
use super::render::{self, NodeView, ThreadView};
use super::snapshot::ThreadSnapshot;
use super::store::ThreadStore;
use super::votes::{VoteDirection, VoteOutcome};
use super::ThreadError;

/// Identifier of one post's comment thread
pub type ThreadId = Uuid;

pub struct ThreadEngine {
    config: EngineConfig,
    threads: RwLock<HashMap<ThreadId, Arc<Mutex<ThreadStore>>>>,
}

impl ThreadEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            threads: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Create an empty thread with no post header.
    pub fn create_thread(&self) -> Result<ThreadId, ThreadError> {
        self.insert(ThreadStore::new(self.config.highlight))
    }

    /// Create a thread for a post written by `author`.
    pub fn create_post(&self, author: &str, body: &str) -> Result<ThreadId, ThreadError> {
        self.insert(ThreadStore::with_post(
            author.to_string(),
            body.to_string(),
            self.config.highlight,
        ))
    }

    /// Forget a thread once its post is gone.
    pub fn drop_thread(&self, thread_id: ThreadId) -> Result<(), ThreadError> {
        let mut threads = self.threads.write().map_err(|_| ThreadError::LockPoisoned)?;
        threads
            .remove(&thread_id)
            .ok_or(ThreadError::NotFound(thread_id))?;
        log::info!("Dropped thread {}", thread_id);
        Ok(())
    }

    pub fn thread_ids(&self) -> Result<Vec<ThreadId>, ThreadError> {
        let threads = self.threads.read().map_err(|_| ThreadError::LockPoisoned)?;
        Ok(threads.keys().copied().collect())
    }

    pub fn edit_post(&self, thread_id: ThreadId, body: &str) -> Result<bool, ThreadError> {
        self.with_store(thread_id, |store| Ok(store.edit_post(body.to_string())))
    }

    /// Add a top-level comment and return its path.
    pub fn add_comment(
        &self,
        thread_id: ThreadId,
        content: &str,
        author: &str,
    ) -> Result<CommentPath, ThreadError> {
        let path = self.with_store(thread_id, |store| {
            let id = store.add_top_level(content.to_string(), author.to_string());
            Ok(CommentPath::top_level(id))
        })?;
        log::debug!("{} commented at {} in thread {}", author, path, thread_id);
        Ok(path)
    }

    /// Reply to the comment or reply at `path` and return the new path.
    pub fn add_reply(
        &self,
        thread_id: ThreadId,
        path: &str,
        content: &str,
        author: &str,
    ) -> Result<CommentPath, ThreadError> {
        let policy = self.config.reply_policy;
        let result = self.with_store(thread_id, |store| {
            store.add_reply(path, content.to_string(), author.to_string(), policy)
        });

        match &result {
            Ok(new_path) => {
                log::debug!("{} replied at {} in thread {}", author, new_path, thread_id)
            }
            Err(e @ ThreadError::TombstonedTarget(_)) => {
                log::warn!("Rejected reply by {} in thread {}: {}", author, thread_id, e)
            }
            Err(_) => {}
        }
        result
    }

    /// Tombstone the node at `path`. Deleting twice is a no-op.
    pub fn delete_comment_or_reply(
        &self,
        thread_id: ThreadId,
        path: &str,
    ) -> Result<(), ThreadError> {
        let changed = self.with_store(thread_id, |store| store.delete(path))?;
        if changed {
            log::debug!("Deleted {} in thread {}", path, thread_id);
        }
        Ok(())
    }

    /// Toggle `username`'s vote on the node at `path`, or on the post when `path`
    /// is absent or empty.
    pub fn vote(
        &self,
        thread_id: ThreadId,
        path: Option<&str>,
        username: &str,
        direction: VoteDirection,
    ) -> Result<VoteOutcome, ThreadError> {
        let outcome = self.with_store(thread_id, |store| store.vote(path, username, direction))?;
        log::debug!(
            "{} vote by {} on {} in thread {}: {:?}",
            direction,
            username,
            path.filter(|p| !p.is_empty()).unwrap_or("post"),
            thread_id,
            outcome
        );
        Ok(outcome)
    }

    /// The vote `username` currently holds on a node or the post
    pub fn vote_of(
        &self,
        thread_id: ThreadId,
        path: Option<&str>,
        username: &str,
    ) -> Result<Option<VoteDirection>, ThreadError> {
        self.with_store(thread_id, |store| Ok(store.ledger(path)?.vote_of(username)))
    }

    /// Plain-text projection of the whole thread
    pub fn render(&self, thread_id: ThreadId) -> Result<String, ThreadError> {
        self.with_store(thread_id, |store| Ok(render::render(store)))
    }

    pub fn view(&self, thread_id: ThreadId) -> Result<ThreadView, ThreadError> {
        self.with_store(thread_id, |store| Ok(ThreadView::new(thread_id, store)))
    }

    /// View of a single node and its replies
    pub fn node(&self, thread_id: ThreadId, path: &str) -> Result<NodeView, ThreadError> {
        self.with_store(thread_id, |store| NodeView::at(store, path))
    }

    pub fn comment_count(&self, thread_id: ThreadId) -> Result<usize, ThreadError> {
        self.with_store(thread_id, |store| Ok(store.live_count()))
    }

    pub fn export_thread(&self, thread_id: ThreadId) -> Result<ThreadSnapshot, ThreadError> {
        let store = self.with_store(thread_id, |store| Ok(store.clone()))?;
        ThreadSnapshot::new(thread_id, store)
    }

    /// Restore an exported thread under its original id.
    pub fn import_thread(&self, snapshot: ThreadSnapshot) -> Result<ThreadId, ThreadError> {
        if let Err(e) = snapshot.verify() {
            log::warn!("Refusing snapshot of thread {}: {}", snapshot.thread_id, e);
            return Err(e);
        }

        let thread_id = snapshot.thread_id;
        let mut threads = self.threads.write().map_err(|_| ThreadError::LockPoisoned)?;
        if threads.contains_key(&thread_id) {
            return Err(ThreadError::AlreadyExists(thread_id));
        }
        threads.insert(thread_id, Arc::new(Mutex::new(snapshot.store)));
        log::info!("Imported thread {}", thread_id);
        Ok(thread_id)
    }

    fn insert(&self, store: ThreadStore) -> Result<ThreadId, ThreadError> {
        let thread_id = Uuid::new_v4();
        let mut threads = self.threads.write().map_err(|_| ThreadError::LockPoisoned)?;
        threads.insert(thread_id, Arc::new(Mutex::new(store)));
        log::info!("Created thread {}", thread_id);
        Ok(thread_id)
    }

    /// Run `f` with exclusive access to one thread.
    fn with_store<R>(
        &self,
        thread_id: ThreadId,
        f: impl FnOnce(&mut ThreadStore) -> Result<R, ThreadError>,
    ) -> Result<R, ThreadError> {
        let store = {
            let threads = self.threads.read().map_err(|_| ThreadError::LockPoisoned)?;
            threads
                .get(&thread_id)
                .cloned()
                .ok_or(ThreadError::NotFound(thread_id))?
        };
        let mut guard = store.lock().map_err(|_| ThreadError::LockPoisoned)?;
        f(&mut *guard)
    }
}

impl Default for ThreadEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread::config::{HighlightBasis, HighlightRule, ReplyPolicy};

    #[test]
    fn test_unknown_thread() {
        let engine = ThreadEngine::default();
        let missing = Uuid::new_v4();
        assert!(matches!(
            engine.add_comment(missing, "x", "alice"),
            Err(ThreadError::NotFound(id)) if id == missing
        ));
        assert!(engine.render(missing).is_err());
        assert!(engine.drop_thread(missing).is_err());
    }

    #[test]
    fn test_comment_and_reply_paths() {
        let engine = ThreadEngine::default();
        let thread = engine.create_thread().unwrap();

        let first = engine.add_comment(thread, "hello", "alice").unwrap();
        let second = engine.add_comment(thread, "again", "bob").unwrap();
        assert_eq!(first.to_string(), "0");
        assert_eq!(second.to_string(), "1");

        let reply = engine.add_reply(thread, "1", "reply", "carol").unwrap();
        assert_eq!(reply.to_string(), "1.0");
        assert_eq!(engine.node(thread, "1.0").unwrap().author, "carol");
    }

    #[test]
    fn test_malformed_rejected_before_lookup() {
        let engine = ThreadEngine::default();
        let thread = engine.create_thread().unwrap();
        engine.add_comment(thread, "hello", "alice").unwrap();

        for bad in ["", "0.", ".0", "00", "0..0", "x"] {
            assert!(
                matches!(engine.add_reply(thread, bad, "r", "bob"), Err(ThreadError::Malformed(_))),
                "{bad:?} should be malformed"
            );
        }
        assert!(matches!(
            engine.delete_comment_or_reply(thread, "0.x"),
            Err(ThreadError::Malformed(_))
        ));
    }

    #[test]
    fn test_vote_of_tracks_toggle() {
        let engine = ThreadEngine::default();
        let thread = engine.create_post("op", "body").unwrap();
        engine.add_comment(thread, "hello", "alice").unwrap();

        engine.vote(thread, Some("0"), "bob", VoteDirection::Up).unwrap();
        assert_eq!(engine.vote_of(thread, Some("0"), "bob").unwrap(), Some(VoteDirection::Up));
        engine.vote(thread, Some("0"), "bob", VoteDirection::Down).unwrap();
        assert_eq!(engine.vote_of(thread, Some("0"), "bob").unwrap(), Some(VoteDirection::Down));
        assert_eq!(engine.vote_of(thread, None, "bob").unwrap(), None);

        let outcome = engine.vote(thread, None, "bob", VoteDirection::Up).unwrap();
        assert_eq!(outcome, VoteOutcome::Cast);
        assert_eq!(engine.view(thread).unwrap().post.upvotes, 1);
    }

    #[test]
    fn test_config_rule_reaches_new_threads() {
        let engine = ThreadEngine::new(EngineConfig {
            highlight: HighlightRule {
                basis: HighlightBasis::Upvotes,
                threshold: 2,
            },
            reply_policy: ReplyPolicy::AllowTombstoned,
        });
        let thread = engine.create_thread().unwrap();
        engine.add_comment(thread, "hello", "alice").unwrap();
        engine.delete_comment_or_reply(thread, "0").unwrap();
        engine.add_reply(thread, "0", "still here", "bob").unwrap();

        engine.vote(thread, Some("0.0"), "a", VoteDirection::Up).unwrap();
        engine.vote(thread, Some("0.0"), "b", VoteDirection::Up).unwrap();
        engine.vote(thread, Some("0.0"), "c", VoteDirection::Down).unwrap();
        assert!(engine.node(thread, "0.0").unwrap().highlighted);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let engine = ThreadEngine::default();
        let thread = engine.create_post("op", "body").unwrap();
        engine.add_comment(thread, "hello", "alice").unwrap();
        engine.add_reply(thread, "0", "hi", "bob").unwrap();
        engine.vote(thread, Some("0.0"), "carol", VoteDirection::Up).unwrap();
        let rendered = engine.render(thread).unwrap();

        let snapshot = engine.export_thread(thread).unwrap();
        assert!(matches!(
            engine.import_thread(snapshot.clone()),
            Err(ThreadError::AlreadyExists(_))
        ));

        let other = ThreadEngine::default();
        let restored = other.import_thread(snapshot).unwrap();
        assert_eq!(restored, thread);
        assert_eq!(other.render(restored).unwrap(), rendered);
    }

    #[test]
    fn test_drop_thread() {
        let engine = ThreadEngine::default();
        let thread = engine.create_thread().unwrap();
        assert_eq!(engine.thread_ids().unwrap(), vec![thread]);
        engine.drop_thread(thread).unwrap();
        assert!(engine.thread_ids().unwrap().is_empty());
        assert!(matches!(engine.view(thread), Err(ThreadError::NotFound(_))));
    }
}
