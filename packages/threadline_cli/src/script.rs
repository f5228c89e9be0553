//! Line-oriented command scripts
//!
//! One command per line, `#` starts a comment:
//!
//! ```text
//! post <author> <body...>          start a new post thread and switch to it
//! comment <author> <text...>
//! reply <path> <author> <text...>
//! delete <path>
//! up <path|-> <user>               `-` votes on the post itself
//! down <path|-> <user>
//! edit <body...>
//! show                             print the thread as text
//! json                             print the thread as JSON
//! ```

use std::io::{BufRead, Write};

use anyhow::{bail, Context, Result};
use threadline::thread::VoteDirection;
use threadline::{ThreadEngine, ThreadId};

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Post { author: String, body: String },
    Comment { author: String, text: String },
    Reply { path: String, author: String, text: String },
    Delete { path: String },
    Vote { path: Option<String>, user: String, direction: VoteDirection },
    Edit { body: String },
    Show,
    Json,
}

impl Command {
    /// Parse one script line. Blank lines and comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Command>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (verb, rest) = next_word(line);
        let command = match verb {
            "post" => {
                let (author, body) = words(rest, verb)?;
                Command::Post { author, body }
            }
            "comment" => {
                let (author, text) = words(rest, verb)?;
                Command::Comment { author, text }
            }
            "reply" => {
                let (path, rest) = next_word(rest);
                let (author, text) = words(rest, verb)?;
                if path.is_empty() {
                    bail!("reply needs a path");
                }
                Command::Reply { path: path.to_string(), author, text }
            }
            "delete" => match next_word(rest) {
                ("", _) => bail!("delete needs a path"),
                (path, _) => Command::Delete { path: path.to_string() },
            },
            "up" | "down" => {
                let direction: VoteDirection = verb.parse()?;
                let (target, rest) = next_word(rest);
                let (user, _) = next_word(rest);
                if user.is_empty() {
                    bail!("{} needs a target and a user", verb);
                }
                let path = (target != "-").then(|| target.to_string());
                Command::Vote { path, user: user.to_string(), direction }
            }
            "edit" => {
                if rest.is_empty() {
                    bail!("edit needs a body");
                }
                Command::Edit { body: rest.to_string() }
            }
            "show" => Command::Show,
            "json" => Command::Json,
            other => bail!("unknown command {:?}", other),
        };
        Ok(Some(command))
    }
}

/// First whitespace-separated word and the trimmed remainder
fn next_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim_start()),
        None => (s, ""),
    }
}

/// A name followed by free text, both required
fn words(s: &str, verb: &str) -> Result<(String, String)> {
    let (name, text) = next_word(s);
    if name.is_empty() || text.is_empty() {
        bail!("{} needs an author and some text", verb);
    }
    Ok((name.to_string(), text.to_string()))
}

/// Totals for one script run
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub executed: usize,
    pub failed: usize,
}

/// Executes commands against one engine, tracking the current thread.
pub struct Session<'a> {
    engine: &'a ThreadEngine,
    current: Option<ThreadId>,
}

impl<'a> Session<'a> {
    pub fn new(engine: &'a ThreadEngine) -> Self {
        Self { engine, current: None }
    }

    /// Current thread, created without a post header on first use
    fn thread(&mut self) -> Result<ThreadId> {
        match self.current {
            Some(id) => Ok(id),
            None => {
                let id = self.engine.create_thread()?;
                self.current = Some(id);
                Ok(id)
            }
        }
    }

    pub fn execute(&mut self, command: Command, out: &mut impl Write) -> Result<()> {
        match command {
            Command::Post { author, body } => {
                let id = self.engine.create_post(&author, &body)?;
                self.current = Some(id);
                writeln!(out, "post {}", id)?;
            }
            Command::Comment { author, text } => {
                let thread = self.thread()?;
                let path = self.engine.add_comment(thread, &text, &author)?;
                writeln!(out, "comment {}", path)?;
            }
            Command::Reply { path, author, text } => {
                let thread = self.thread()?;
                let new_path = self.engine.add_reply(thread, &path, &text, &author)?;
                writeln!(out, "reply {}", new_path)?;
            }
            Command::Delete { path } => {
                let thread = self.thread()?;
                self.engine.delete_comment_or_reply(thread, &path)?;
                writeln!(out, "deleted {}", path)?;
            }
            Command::Vote { path, user, direction } => {
                let thread = self.thread()?;
                let outcome = self.engine.vote(thread, path.as_deref(), &user, direction)?;
                writeln!(
                    out,
                    "{} {} on {}: {:?}",
                    direction,
                    user,
                    path.as_deref().unwrap_or("post"),
                    outcome
                )?;
            }
            Command::Edit { body } => {
                let thread = self.thread()?;
                if !self.engine.edit_post(thread, &body)? {
                    bail!("thread {} has no post to edit", thread);
                }
                writeln!(out, "edited")?;
            }
            Command::Show => {
                let thread = self.thread()?;
                write!(out, "{}", self.engine.render(thread)?)?;
            }
            Command::Json => {
                let thread = self.thread()?;
                let view = self.engine.view(thread)?;
                writeln!(out, "{}", serde_json::to_string_pretty(&view)?)?;
            }
        }
        Ok(())
    }
}

/// Run every line of `input`. Failed lines are reported to `err` and skipped;
/// with `strict` the first failure is returned instead.
pub fn run(
    engine: &ThreadEngine,
    input: impl BufRead,
    out: &mut impl Write,
    err: &mut impl Write,
    strict: bool,
) -> Result<RunSummary> {
    let mut session = Session::new(engine);
    let mut summary = RunSummary::default();

    for (n, line) in input.lines().enumerate() {
        let line = line.context("reading script")?;
        let result = Command::parse(&line).and_then(|command| match command {
            Some(command) => session.execute(command, out).map(Some),
            None => Ok(None),
        });

        match result {
            Ok(Some(())) => summary.executed += 1,
            Ok(None) => {}
            Err(e) if strict => return Err(e.context(format!("stopped at line {}", n + 1))),
            Err(e) => {
                summary.failed += 1;
                log::warn!("line {}: {:#}", n + 1, e);
                writeln!(err, "error on line {}: {:#}", n + 1, e)?;
            }
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn run_text(script: &str, strict: bool) -> (Result<RunSummary>, String, String) {
        let engine = ThreadEngine::default();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let result = run(&engine, Cursor::new(script), &mut out, &mut err, strict);
        (
            result,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("  # note").unwrap(), None);
        assert_eq!(
            Command::parse("reply 0.1 bob  hi there").unwrap(),
            Some(Command::Reply {
                path: "0.1".into(),
                author: "bob".into(),
                text: "hi there".into()
            })
        );
        assert_eq!(
            Command::parse("down - carol").unwrap(),
            Some(Command::Vote { path: None, user: "carol".into(), direction: VoteDirection::Down })
        );
        assert!(Command::parse("comment alice").is_err());
        assert!(Command::parse("frobnicate").is_err());
        assert!(Command::parse("up 0").is_err());
    }

    #[test]
    fn test_run_script() {
        let script = "\
post op Welcome to the thread
comment alice hello
reply 0 bob hi back
up 0 carol
up - carol
show
";
        let (result, out, err) = run_text(script, false);
        assert_eq!(result.unwrap(), RunSummary { executed: 6, failed: 0 });
        assert!(err.is_empty());
        assert!(out.contains("comment 0\n"));
        assert!(out.contains("reply 0.0\n"));
        assert!(out.contains("(op): Welcome to the thread\n^1 v0 score 1\n"));
        assert!(out.contains("[0] (alice) hello  ^1 v0 score 1\n  [0.0] (bob) hi back"));
    }

    #[test]
    fn test_failures_reported_and_skipped() {
        let script = "comment alice hello\ndelete 0\nreply 0 bob too late\nreply 7 bob nowhere\nshow\n";
        let (result, out, err) = run_text(script, false);
        assert_eq!(result.unwrap(), RunSummary { executed: 3, failed: 2 });
        assert!(err.contains("line 3"));
        assert!(err.contains("line 4"));
        assert!(out.contains("[0] (alice) [deleted]"));
    }

    #[test]
    fn test_strict_stops_at_first_failure() {
        let (result, out, err) = run_text("delete 0\ncomment alice never\n", true);
        let error = result.unwrap_err();
        assert!(format!("{:#}", error).starts_with("stopped at line 1: "));
        assert!(!out.contains("comment"));
        assert!(err.is_empty());
    }

    #[test]
    fn test_edit_requires_post() {
        let (result, _, err) = run_text("edit new body\n", false);
        assert_eq!(result.unwrap().failed, 1);
        assert!(err.contains("no post to edit"));
    }

    #[test]
    fn test_run_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "comment alice from a file").unwrap();
        writeln!(file, "json").unwrap();

        let engine = ThreadEngine::default();
        let input = BufReader::new(std::fs::File::open(file.path()).unwrap());
        let mut out = Vec::new();
        let mut err = Vec::new();
        let summary = run(&engine, input, &mut out, &mut err, true).unwrap();
        assert_eq!(summary.executed, 2);

        let text = String::from_utf8(out).unwrap();
        let json_start = text.find('{').unwrap();
        let view: serde_json::Value = serde_json::from_str(&text[json_start..]).unwrap();
        assert_eq!(view["comments"][0]["content"], "from a file");
        assert_eq!(view["comment_count"], 1);
    }
}
