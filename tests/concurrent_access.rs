//! Concurrent use of one engine from OS threads and from a multi-threaded runtime
//!
//! Run with:
//!   cargo test --test concurrent_access

use std::sync::Arc;
use std::thread;

use threadline::thread::{EngineConfig, ThreadEngine, VoteDirection};

const WORKERS: usize = 8;
const REPLIES_PER_WORKER: usize = 25;

#[test]
fn test_parallel_replies_get_unique_paths() {
    let engine = Arc::new(ThreadEngine::new(EngineConfig::default()));
    let thread_id = engine.create_thread().unwrap();
    engine.add_comment(thread_id, "root", "op").unwrap();

    let handles: Vec<_> = (0..WORKERS)
        .map(|w| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                (0..REPLIES_PER_WORKER)
                    .map(|i| {
                        engine
                            .add_reply(thread_id, "0", &format!("w{w} r{i}"), &format!("worker{w}"))
                            .unwrap()
                            .to_string()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut paths: Vec<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    paths.sort();
    paths.dedup();
    assert_eq!(paths.len(), WORKERS * REPLIES_PER_WORKER);

    let root = engine.node(thread_id, "0").unwrap();
    assert_eq!(root.replies.len(), WORKERS * REPLIES_PER_WORKER);
    for (i, reply) in root.replies.iter().enumerate() {
        assert_eq!(reply.path.to_string(), format!("0.{i}"));
    }
}

#[test]
fn test_parallel_votes_keep_ledger_disjoint() {
    let engine = Arc::new(ThreadEngine::default());
    let thread_id = engine.create_thread().unwrap();
    engine.add_comment(thread_id, "contested", "op").unwrap();

    // Each worker flips the same shared voter an even number of times and casts
    // one vote of its own.
    let handles: Vec<_> = (0..WORKERS)
        .map(|w| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..10 {
                    engine.vote(thread_id, Some("0"), "shared", VoteDirection::Up).unwrap();
                    engine.vote(thread_id, Some("0"), "shared", VoteDirection::Down).unwrap();
                }
                let direction = if w % 2 == 0 { VoteDirection::Up } else { VoteDirection::Down };
                engine.vote(thread_id, Some("0"), &format!("voter{w}"), direction).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let node = engine.node(thread_id, "0").unwrap();
    let shared = engine.vote_of(thread_id, Some("0"), "shared").unwrap();
    let shared_up = usize::from(shared == Some(VoteDirection::Up));
    let shared_down = usize::from(shared == Some(VoteDirection::Down));
    assert_eq!(node.upvotes, WORKERS / 2 + shared_up);
    assert_eq!(node.downvotes, WORKERS / 2 + shared_down);
}

#[test]
fn test_delete_racing_reply_is_all_or_nothing() {
    for _ in 0..20 {
        let engine = Arc::new(ThreadEngine::default());
        let thread_id = engine.create_thread().unwrap();
        engine.add_comment(thread_id, "target", "op").unwrap();

        let deleter = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.delete_comment_or_reply(thread_id, "0").unwrap())
        };
        let replier = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || engine.add_reply(thread_id, "0", "late", "bob"))
        };
        deleter.join().unwrap();
        let reply = replier.join().unwrap();

        let node = engine.node(thread_id, "0").unwrap();
        assert!(node.deleted);
        // Either the reply landed before the delete, or it was refused outright.
        match reply {
            Ok(path) => {
                assert_eq!(path.to_string(), "0.0");
                assert_eq!(node.replies.len(), 1);
            }
            Err(_) => assert!(node.replies.is_empty()),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_request_style_dispatch_across_posts() {
    let engine = Arc::new(ThreadEngine::default());
    let posts: Vec<_> = (0..4)
        .map(|i| engine.create_post(&format!("author{i}"), "body").unwrap())
        .collect();

    let mut tasks = Vec::new();
    for (n, post) in posts.iter().copied().enumerate() {
        for i in 0..10 {
            let engine = Arc::clone(&engine);
            tasks.push(tokio::task::spawn_blocking(move || {
                let path = engine
                    .add_comment(post, &format!("comment {i}"), &format!("user{n}"))
                    .unwrap();
                let label = path.to_string();
                engine
                    .vote(post, Some(label.as_str()), "reader", VoteDirection::Up)
                    .unwrap();
                engine.render(post).unwrap()
            }));
        }
    }
    for task in tasks {
        let rendered = task.await.unwrap();
        assert!(rendered.starts_with('('));
    }

    for post in posts {
        let view = engine.view(post).unwrap();
        assert_eq!(view.comment_count, 10);
        assert!(view.comments.iter().all(|c| c.upvotes == 1));
    }
}
