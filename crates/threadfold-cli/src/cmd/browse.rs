//! `tf browse` - interactive paging through an author's threads.
//!
//! Reads one command per line from stdin and re-renders the forest after
//! every load. A failed load leaves the forest as far as it got.

use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::Args;
use threadfold_core::{ConversationApi, Paginator};
use tracing::warn;

use super::Session;
use crate::output::{CliError, OutputMode, render_error, render_forest};

const HELP: &str = "\
commands:
  newest      reload from the newest statuses
  oldest      reload from the oldest statuses
  newer [N]   load N more newer threads
  older [N]   load N more older threads
  help        show this list
  quit        leave";

#[derive(Args, Debug)]
pub struct BrowseArgs {
    /// Account handle (`user@instance`) or numeric account id.
    pub account: String,

    /// Threads per `newer`/`older` step when no count is given.
    #[arg(long, value_name = "N")]
    pub step: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowseCommand {
    Newest,
    Oldest,
    Newer(usize),
    Older(usize),
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str, default_step: usize) -> Result<Option<BrowseCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };

    let count = match words.next() {
        None => default_step,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| format!("'{raw}' is not a thread count"))?,
    };
    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument '{extra}'"));
    }

    let command = match verb.to_ascii_lowercase().as_str() {
        "newest" => BrowseCommand::Newest,
        "oldest" => BrowseCommand::Oldest,
        "newer" | "n" => BrowseCommand::Newer(count),
        "older" | "o" => BrowseCommand::Older(count),
        "help" | "?" => BrowseCommand::Help,
        "quit" | "q" | "exit" => BrowseCommand::Quit,
        other => return Err(format!("unknown command '{other}' (try `help`)")),
    };
    Ok(Some(command))
}

pub fn run_browse(args: &BrowseArgs, session: &Session) -> Result<()> {
    let mut pager = session.open(&args.account)?;
    let step = args.step.unwrap_or_else(|| session.threads_per_load());

    let stdin = io::stdin();
    let stdout = io::stdout();
    browse_loop(
        &mut pager,
        stdin.lock(),
        &mut stdout.lock(),
        session.mode,
        step,
    )
}

fn browse_loop<A: ConversationApi>(
    pager: &mut Paginator<A>,
    input: impl BufRead,
    out: &mut dyn Write,
    mode: OutputMode,
    step: usize,
) -> Result<()> {
    let outcome = pager.load_newest()?;
    render_forest(out, mode, pager.account_id(), pager.forest(), Some(&outcome))?;
    prompt(out, mode)?;

    for line in input.lines() {
        let line = line?;
        let command = match parse_command(&line, step) {
            Ok(Some(command)) => command,
            Ok(None) => {
                prompt(out, mode)?;
                continue;
            }
            Err(message) => {
                render_error(out, mode, &CliError::plain(message))?;
                prompt(out, mode)?;
                continue;
            }
        };

        let result = match command {
            BrowseCommand::Quit => break,
            BrowseCommand::Help => {
                writeln!(out, "{HELP}")?;
                prompt(out, mode)?;
                continue;
            }
            BrowseCommand::Newest => pager.load_newest(),
            BrowseCommand::Oldest => pager.load_oldest(),
            BrowseCommand::Newer(n) => pager.load_newer_threads(n),
            BrowseCommand::Older(n) => pager.load_older_threads(n),
        };

        match result {
            Ok(outcome) => {
                render_forest(out, mode, pager.account_id(), pager.forest(), Some(&outcome))?;
            }
            Err(err) => {
                warn!(code = %err.code(), "load failed: {err}");
                render_error(out, mode, &CliError::with_code(err.to_string(), err.code()))?;
            }
        }
        prompt(out, mode)?;
    }

    Ok(())
}

fn prompt(out: &mut dyn Write, mode: OutputMode) -> io::Result<()> {
    if mode.is_json() {
        return Ok(());
    }
    write!(out, "> ")?;
    out.flush()
}
