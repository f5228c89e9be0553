//! Threadline CLI
//!
//! Runs a command script against an in-memory thread engine and prints the
//! results as plain text.
//!
//! Usage: threadline [OPTIONS] [SCRIPT]

mod script;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use threadline::thread::{
    EngineConfig, HighlightBasis, HighlightRule, ReplyPolicy, HIGHLIGHT_THRESHOLD,
};
use threadline::ThreadEngine;

#[derive(Parser, Debug)]
#[command(name = "threadline", version, about = "Run a comment thread script")]
struct Cli {
    /// Script to run; reads stdin when omitted
    script: Option<PathBuf>,

    /// Score a node needs to be highlighted
    #[arg(long, default_value_t = HIGHLIGHT_THRESHOLD)]
    threshold: i64,

    /// Compare the threshold against upvotes alone instead of net score
    #[arg(long)]
    highlight_upvotes: bool,

    /// Accept replies under deleted comments
    #[arg(long)]
    allow_replies_to_deleted: bool,

    /// Stop at the first failing line
    #[arg(long)]
    strict: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            highlight: HighlightRule {
                basis: if self.highlight_upvotes {
                    HighlightBasis::Upvotes
                } else {
                    HighlightBasis::NetScore
                },
                threshold: self.threshold,
            },
            reply_policy: if self.allow_replies_to_deleted {
                ReplyPolicy::AllowTombstoned
            } else {
                ReplyPolicy::RejectTombstoned
            },
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let engine = ThreadEngine::new(cli.engine_config());
    let stdout = io::stdout();
    let stderr = io::stderr();
    let mut out = stdout.lock();
    let mut err = stderr.lock();

    let summary = match &cli.script {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("opening script {}", path.display()))?;
            script::run(&engine, BufReader::new(file), &mut out, &mut err, cli.strict)?
        }
        None => script::run(&engine, io::stdin().lock(), &mut out, &mut err, cli.strict)?,
    };

    log::info!(
        "Ran {} commands, {} failed",
        summary.executed,
        summary.failed
    );
    if summary.failed > 0 {
        bail!(
            "{} of {} script commands failed",
            summary.failed,
            summary.executed + summary.failed
        );
    }
    Ok(())
}
