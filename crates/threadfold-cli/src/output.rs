//! Output layer: pretty, text, and JSON renderings of the reply forest.
//!
//! Threads print newest first. Inside a thread, replies print oldest first
//! and indented by depth. A folded subtree collapses to one `[+N hidden]`
//! line; runs of folded siblings share a single line.

use std::io::{self, Write};

use serde::Serialize;
use threadfold_core::{DescendantCounts, ErrorCode, ForestError, ForestState, LoadOutcome, Status};
use tracing::debug;

/// Shared width for human pretty separators.
pub const PRETTY_RULE_WIDTH: usize = 72;

const EXCERPT_CHARS: usize = 60;
/// Wide enough that html2text never wraps a status body.
const HTML_WRAP_WIDTH: usize = 1000;

/// Write a horizontal separator used by pretty human output.
pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{:-<width$}", "", width = PRETTY_RULE_WIDTH)
}

/// The three output modes supported by the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Indented threads with headers and separators.
    Pretty,
    /// Plain indented lines for pipes.
    Text,
    /// The serialized forest.
    Json,
}

impl OutputMode {
    /// Map a resolved config value (`pretty`, `text`, `json`) to a mode.
    pub fn from_resolved(raw: &str) -> Self {
        match raw {
            "json" => Self::Json,
            "text" => Self::Text,
            _ => Self::Pretty,
        }
    }

    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A terminal error with its machine-readable code.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    pub fn plain(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: None,
            error_code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }

    /// Classify an error chain by the first library error found in it.
    pub fn from_anyhow(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        let code = err.chain().find_map(|cause| {
            cause
                .downcast_ref::<ForestError>()
                .map(ForestError::code)
                .or_else(|| {
                    cause
                        .downcast_ref::<threadfold_core::api::ApiError>()
                        .map(threadfold_core::api::ApiError::code)
                })
        });
        match code {
            Some(code) => Self::with_code(message, code),
            None => Self::plain(message),
        }
    }
}

/// Render a [`CliError`] to `w`, adapting format to the output mode.
pub fn render_error(w: &mut dyn Write, mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    match mode {
        OutputMode::Json => {
            let wrapper = serde_json::json!({ "error": error });
            serde_json::to_writer_pretty(&mut *w, &wrapper)?;
            writeln!(w)?;
        }
        OutputMode::Pretty | OutputMode::Text => {
            match &error.error_code {
                Some(code) => writeln!(w, "error[{code}]: {}", error.message)?,
                None => writeln!(w, "error: {}", error.message)?,
            }
            if let Some(suggestion) = &error.suggestion {
                writeln!(w, "  suggestion: {suggestion}")?;
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Forest rendering
// ---------------------------------------------------------------------------

/// JSON envelope for one rendered forest.
#[derive(Debug, Serialize)]
pub struct ForestView<'a> {
    pub account_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<&'a LoadOutcome>,
    pub threads: Vec<&'a str>,
    pub forest: &'a ForestState,
}

#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Status {
        depth: usize,
        status: &'a Status,
        counts: DescendantCounts,
        degraded: bool,
    },
    Hidden {
        depth: usize,
        count: usize,
    },
}

/// Flatten one thread into display lines.
///
/// Walks with an explicit stack so reply chains of any depth render.
fn thread_lines<'a>(forest: &'a ForestState, root_id: &str) -> Result<Vec<Line<'a>>, ForestError> {
    let mut lines: Vec<Line<'a>> = Vec::new();
    let mut stack: Vec<(&'a str, usize)> = vec![(forest.status_guaranteed(root_id)?.id.as_str(), 0)];

    while let Some((id, depth)) = stack.pop() {
        let status = forest.status_guaranteed(id)?;
        let counts = forest.counts(id).unwrap_or_default();
        let folded = forest.is_folded(id).unwrap_or(false);

        if folded && depth > 0 {
            push_hidden(&mut lines, depth, 1 + counts.total);
            continue;
        }

        lines.push(Line::Status {
            depth,
            status,
            counts,
            degraded: forest.is_degraded(id),
        });

        if folded {
            if counts.total > 0 {
                push_hidden(&mut lines, depth + 1, counts.total);
            }
            continue;
        }

        let children: Vec<&'a str> = forest.children_of(id).collect();
        stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }

    Ok(lines)
}

fn push_hidden(lines: &mut Vec<Line<'_>>, depth: usize, count: usize) {
    if let Some(Line::Hidden {
        depth: last_depth,
        count: last_count,
    }) = lines.last_mut()
        && *last_depth == depth
    {
        *last_count += count;
        return;
    }
    lines.push(Line::Hidden { depth, count });
}

/// Render every thread in the forest.
///
/// # Errors
///
/// Fails on write errors or if the forest breaks an invariant mid-walk.
pub fn render_forest(
    w: &mut dyn Write,
    mode: OutputMode,
    account_id: &str,
    forest: &ForestState,
    outcome: Option<&LoadOutcome>,
) -> anyhow::Result<()> {
    let threads = forest.threads_newest_first();

    if mode.is_json() {
        let view = ForestView {
            account_id,
            outcome,
            threads,
            forest,
        };
        serde_json::to_writer_pretty(&mut *w, &view)?;
        writeln!(w)?;
        return Ok(());
    }

    if mode == OutputMode::Pretty {
        writeln!(
            w,
            "{account_id}: {} threads, {} statuses",
            threads.len(),
            forest.len()
        )?;
        if let Some(outcome) = outcome {
            writeln!(w, "{}", outcome_summary(outcome))?;
        }
    }

    for (index, root_id) in threads.iter().enumerate() {
        match mode {
            OutputMode::Pretty => pretty_rule(w)?,
            _ if index > 0 => writeln!(w)?,
            _ => {}
        }
        for line in thread_lines(forest, root_id)? {
            write_line(w, mode, &line)?;
        }
    }

    Ok(())
}

fn write_line(w: &mut dyn Write, mode: OutputMode, line: &Line<'_>) -> io::Result<()> {
    match line {
        Line::Hidden { depth, count } => {
            writeln!(w, "{}[+{count} hidden]", indent(*depth))
        }
        Line::Status {
            depth,
            status,
            counts,
            degraded,
        } => {
            let marker = if *degraded { " (root unavailable)" } else { "" };
            let handle = if status.account.acct.is_empty() {
                status.author_id()
            } else {
                status.account.acct.as_str()
            };
            match mode {
                OutputMode::Text => writeln!(
                    w,
                    "{}{} @{handle} {}/{}{marker} {}",
                    indent(*depth),
                    status.id,
                    counts.shown,
                    counts.total,
                    excerpt(status)
                ),
                _ => {
                    writeln!(w, "{}@{handle}{marker}  [{}]", indent(*depth), status.id)?;
                    let body = excerpt(status);
                    if !body.is_empty() {
                        writeln!(w, "{}  {body}", indent(*depth))?;
                    }
                    if counts.total > 0 {
                        writeln!(
                            w,
                            "{}  replies: {}/{} shown",
                            indent(*depth),
                            counts.shown,
                            counts.total
                        )?;
                    }
                    Ok(())
                }
            }
        }
    }
}

fn indent(depth: usize) -> String {
    "  ".repeat(depth)
}

/// One-line description of a pagination call.
pub fn outcome_summary(outcome: &LoadOutcome) -> String {
    let mut summary = format!(
        "+{} threads in {} fetches",
        outcome.threads_added, outcome.fetches
    );
    if outcome.ingest.degraded > 0 {
        summary.push_str(&format!(", {} degraded", outcome.ingest.degraded));
    }
    if outcome.ingest.edges_dropped > 0 {
        summary.push_str(&format!(", {} edges dropped", outcome.ingest.edges_dropped));
    }
    if outcome.exhausted {
        summary.push_str(", no more statuses");
    }
    summary
}

/// Content warning if present, otherwise the body rendered to plain text.
fn excerpt(status: &Status) -> String {
    let raw = if status.spoiler_text.is_empty() {
        html_to_text(&status.content)
    } else {
        format!("CW: {}", status.spoiler_text)
    };
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > EXCERPT_CHARS {
        let cut: String = collapsed.chars().take(EXCERPT_CHARS).collect();
        format!("{cut}...")
    } else {
        collapsed
    }
}

fn html_to_text(html: &str) -> String {
    html2text::from_read(html.as_bytes(), HTML_WRAP_WIDTH).unwrap_or_else(|err| {
        debug!(error = %err, "status body is not renderable HTML; showing it raw");
        html.to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadfold_core::{Ingestor, MemoryApi};

    fn forest_from(statuses: Vec<Status>, batch: &[Status]) -> ForestState {
        let api = MemoryApi::new(statuses);
        let mut forest = ForestState::new();
        Ingestor::new(&api, "me")
            .ingest(&mut forest, batch)
            .expect("ingest");
        forest
    }

    fn render_text(forest: &ForestState) -> String {
        let mut out = Vec::new();
        render_forest(&mut out, OutputMode::Text, "me", forest, None).expect("render");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn folded_siblings_collapse_into_one_line() {
        let root = Status::new("1", "me").with_content("<p>hello &amp; welcome</p>");
        let forest = forest_from(
            vec![
                root.clone(),
                Status::new("2", "alice").replying_to("1"),
                Status::new("3", "bob").replying_to("1"),
                Status::new("4", "bob").replying_to("3"),
                Status::new("5", "me").replying_to("1"),
            ],
            &[root],
        );

        let text = render_text(&forest);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "1 @me 1/4 hello & welcome",
                "  [+3 hidden]",
                "  5 @me 0/0 ",
            ]
        );
    }

    #[test]
    fn threads_print_newest_first() {
        let a = Status::new("1", "me");
        let b = Status::new("2", "me");
        let forest = forest_from(vec![a.clone(), b.clone()], &[a, b]);

        let text = render_text(&forest);
        let ids: Vec<&str> = text
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| line.split(' ').next().unwrap_or_default())
            .collect();
        assert_eq!(ids, ["2", "1"]);
    }

    #[test]
    fn json_mode_serializes_the_forest() {
        let a = Status::new("1", "me");
        let forest = forest_from(vec![a.clone()], &[a]);
        let mut out = Vec::new();
        render_forest(&mut out, OutputMode::Json, "me", &forest, None).expect("render");

        let value: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(value["account_id"], "me");
        assert_eq!(value["threads"][0], "1");
        assert_eq!(value["forest"]["folded"]["1"], false);
    }

    #[test]
    fn pretty_mode_marks_degraded_threads() {
        // The parent of 2 is unknown upstream, so 2 roots its own thread.
        let orphan = Status::new("2", "me").replying_to("gone");
        let forest = forest_from(vec![orphan.clone()], &[orphan]);
        let mut out = Vec::new();
        render_forest(&mut out, OutputMode::Pretty, "me", &forest, None).expect("render");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.contains("@me (root unavailable)  [2]"));
    }

    #[test]
    fn spoiler_text_replaces_body() {
        let status = Status {
            spoiler_text: "spoilers".into(),
            ..Status::new("1", "me").with_content("the ending")
        };
        assert_eq!(excerpt(&status), "CW: spoilers");
    }

    #[test]
    fn entities_in_bodies_are_decoded() {
        let status =
            Status::new("1", "me").with_content("<p>it&#x27;s&nbsp;fine &#8212; ok</p>");
        assert_eq!(excerpt(&status), "it's fine \u{2014} ok");
    }

    #[test]
    fn markup_between_paragraphs_becomes_spacing() {
        let status = Status::new("1", "me").with_content("<p>one</p><p>two<br>three</p>");
        assert_eq!(excerpt(&status), "one two three");
    }

    #[test]
    fn long_bodies_are_truncated() {
        let status = Status::new("1", "me").with_content("x".repeat(100));
        let text = excerpt(&status);
        assert_eq!(text.chars().count(), EXCERPT_CHARS + 3);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn error_codes_surface_in_text_mode() {
        let err = anyhow::Error::new(ForestError::CycleDetected("7".into()));
        let cli = CliError::from_anyhow(&err);
        let mut out = Vec::new();
        render_error(&mut out, OutputMode::Text, &cli).expect("render");

        let text = String::from_utf8(out).expect("utf8");
        assert!(text.starts_with("error[E7002]:"));
        assert!(text.contains("suggestion:"));
    }

    #[test]
    fn outcome_summary_mentions_exhaustion() {
        let outcome = LoadOutcome {
            fetches: 2,
            threads_added: 1,
            exhausted: true,
            ..LoadOutcome::default()
        };
        assert_eq!(
            outcome_summary(&outcome),
            "+1 threads in 2 fetches, no more statuses"
        );
    }
}
