// Threadline - Threaded comments with positional paths and toggle votes

pub mod thread;

pub use thread::{ThreadEngine, ThreadError, ThreadId};
