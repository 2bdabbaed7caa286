//! `tf show` - load an author's threads once and print them.

use std::io::{self, Write};

use anyhow::Result;
use clap::Args;
use threadfold_core::LoadOutcome;

use super::Session;
use crate::output::render_forest;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Account handle (`user@instance`) or numeric account id.
    pub account: String,

    /// Start from the author's oldest statuses instead of the newest.
    #[arg(long)]
    pub oldest: bool,

    /// After the first page, load this many newer threads.
    #[arg(long, value_name = "N")]
    pub newer: Option<usize>,

    /// After the first page, load this many older threads.
    #[arg(long, value_name = "N")]
    pub older: Option<usize>,
}

pub fn run_show(args: &ShowArgs, session: &Session) -> Result<()> {
    let mut pager = session.open(&args.account)?;

    let first = if args.oldest {
        pager.load_oldest()?
    } else {
        pager.load_newest()?
    };

    let mut total = first;
    if let Some(n) = args.newer {
        merge_outcome(&mut total, &pager.load_newer_threads(n)?);
    }
    if let Some(n) = args.older {
        merge_outcome(&mut total, &pager.load_older_threads(n)?);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    render_forest(
        &mut out,
        session.mode,
        pager.account_id(),
        pager.forest(),
        Some(&total),
    )?;
    out.flush()?;
    Ok(())
}

/// Fold a follow-up load into the running total for the summary line.
fn merge_outcome(total: &mut LoadOutcome, next: &LoadOutcome) {
    total.fetches += next.fetches;
    total.threads_added += next.threads_added;
    total.exhausted = next.exhausted;
    total.ingest.absorb(&next.ingest);
}
