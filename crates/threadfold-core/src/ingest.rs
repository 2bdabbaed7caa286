//! Merging fetched statuses into the reply forest.
//!
//! For each status in a batch the [`Ingestor`]:
//!
//! 1. skips it if already merged (batches may overlap earlier ones);
//! 2. resolves its **progenitor** from the ancestor chain, falling back to
//!    the status itself when upstream returns no ancestors;
//! 3. fetches the progenitor's full descendant set and merges the thread;
//! 4. links every descendant to its parent, refusing cycle-closing edges;
//! 5. reclassifies the whole thread.
//!
//! Statuses are processed strictly one after another so at most one request
//! is outstanding against the upstream service. A failed request aborts the
//! batch, but threads merged before the failure stay merged.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::api::{ContextQuery, ConversationApi};
use crate::classify::classify;
use crate::error::ForestError;
use crate::forest::{ForestState, LinkOutcome};
use crate::model::Status;

/// Tallies from one [`Ingestor::ingest`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Statuses in the batch.
    pub statuses_seen: usize,
    /// Batch statuses already in the forest.
    pub skipped_existing: usize,
    /// Threads merged (one per unseen batch status).
    pub threads_merged: usize,
    /// New entries in the progenitor set.
    pub progenitors_added: usize,
    /// Progenitors that stand in for an unresolvable ancestor chain.
    pub degraded: usize,
    /// Reply edges refused because they would close a cycle.
    pub edges_dropped: usize,
    /// Conversation-context requests issued.
    pub api_requests: usize,
}

impl IngestReport {
    /// Add another report's tallies into this one.
    pub const fn absorb(&mut self, other: &Self) {
        self.statuses_seen += other.statuses_seen;
        self.skipped_existing += other.skipped_existing;
        self.threads_merged += other.threads_merged;
        self.progenitors_added += other.progenitors_added;
        self.degraded += other.degraded;
        self.edges_dropped += other.edges_dropped;
        self.api_requests += other.api_requests;
    }
}

/// Grows a [`ForestState`] from batches of the tracked author's statuses.
pub struct Ingestor<'a, A: ConversationApi + ?Sized> {
    api: &'a A,
    author_id: &'a str,
}

impl<'a, A: ConversationApi + ?Sized> Ingestor<'a, A> {
    pub const fn new(api: &'a A, author_id: &'a str) -> Self {
        Self { api, author_id }
    }

    /// Merge `statuses` (in any order) into `forest`.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::Api`] if a context request fails, or an
    /// invariant violation if classification finds the forest corrupt.
    /// Threads merged before the error remain in `forest`.
    pub fn ingest(
        &self,
        forest: &mut ForestState,
        statuses: &[Status],
    ) -> Result<IngestReport, ForestError> {
        let mut report = IngestReport {
            statuses_seen: statuses.len(),
            ..IngestReport::default()
        };

        forest.extend_covered_range(statuses.iter().map(|s| s.id.as_str()));

        for status in statuses {
            if forest.contains(&status.id) {
                report.skipped_existing += 1;
                continue;
            }
            self.merge_thread(forest, status, &mut report)?;
        }

        debug!(
            seen = report.statuses_seen,
            skipped = report.skipped_existing,
            threads = report.threads_merged,
            progenitors_added = report.progenitors_added,
            requests = report.api_requests,
            "ingested batch"
        );
        Ok(report)
    }

    fn merge_thread(
        &self,
        forest: &mut ForestState,
        status: &Status,
        report: &mut IngestReport,
    ) -> Result<(), ForestError> {
        let (progenitor, degraded) = self.resolve_progenitor(status, report)?;
        let root_id = progenitor.id.clone();

        if degraded {
            report.degraded += 1;
            warn!(status = %status.id, "no ancestors returned; treating status as its own thread");
        }

        let context = self
            .api
            .conversation_context(&root_id, &ContextQuery::default())?;
        report.api_requests += 1;
        report.threads_merged += 1;

        let mut members: Vec<Status> = context
            .descendants
            .into_iter()
            .filter(|d| d.id != root_id)
            .collect();
        if status.id != root_id && !members.iter().any(|d| d.id == status.id) {
            // Upstream left the triggering status out of its own thread.
            members.push(status.clone());
        }

        forest.merge_status(progenitor);
        for member in &members {
            forest.merge_status(member.clone());
        }

        // A root already linked below another status keeps its place.
        let thread_root = if forest.parent_of(&root_id).is_some() {
            forest.progenitor_of(&root_id)?.to_string()
        } else {
            if forest.add_progenitor(&root_id, degraded) {
                report.progenitors_added += 1;
            }
            root_id
        };

        let mut extra_roots: Vec<String> = Vec::new();
        let mut moved_from: Vec<String> = Vec::new();
        for member in &members {
            let Some(parent) = member.parent_id().filter(|p| forest.contains(p)) else {
                warn!(
                    status = %member.id,
                    parent = ?member.parent_id(),
                    "parent missing from thread; treating reply as its own thread"
                );
                Self::adopt_as_root(forest, &member.id, report, &mut extra_roots);
                continue;
            };

            match forest.link(&member.id, parent) {
                LinkOutcome::Linked | LinkOutcome::Unchanged => {}
                LinkOutcome::Demoted => {
                    debug!(status = %member.id, "former thread root now has a parent");
                }
                LinkOutcome::Moved { from } => {
                    warn!(
                        status = %member.id,
                        from = %from,
                        to = parent,
                        "upstream moved a reply to a different parent"
                    );
                    moved_from.push(from);
                }
                LinkOutcome::SelfLoop | LinkOutcome::WouldCycle => {
                    report.edges_dropped += 1;
                    warn!(
                        status = %member.id,
                        parent,
                        "dropping reply edge that would create a cycle"
                    );
                    Self::adopt_as_root(forest, &member.id, report, &mut extra_roots);
                }
            }
        }

        let root = classify(forest, &thread_root, self.author_id)?;
        debug!(
            progenitor = %thread_root,
            members = members.len(),
            total = root.counts.total,
            shown = root.counts.shown,
            folded = root.folded(),
            "merged thread"
        );

        let mut classified = BTreeSet::from([thread_root]);
        for extra in extra_roots {
            if forest.progenitor_ids().contains(&extra) && classified.insert(extra.clone()) {
                classify(forest, &extra, self.author_id)?;
            }
        }

        // Threads that lost a subtree to this one have stale counts.
        for old_parent in moved_from {
            let old_root = forest.progenitor_of(&old_parent)?.to_string();
            if classified.insert(old_root.clone()) {
                classify(forest, &old_root, self.author_id)?;
            }
        }

        Ok(())
    }

    /// Make an unlinkable status a degraded thread of its own so it stays reachable.
    fn adopt_as_root(
        forest: &mut ForestState,
        id: &str,
        report: &mut IngestReport,
        extra_roots: &mut Vec<String>,
    ) {
        if forest.parent_of(id).is_some() {
            return;
        }
        if forest.add_progenitor(id, true) {
            report.progenitors_added += 1;
            report.degraded += 1;
        }
        extra_roots.push(id.to_string());
    }

    /// Find the root of `status`'s thread.
    ///
    /// Returns the root and whether it is a degraded stand-in.
    fn resolve_progenitor(
        &self,
        status: &Status,
        report: &mut IngestReport,
    ) -> Result<(Status, bool), ForestError> {
        if status.parent_id().is_none() {
            return Ok((status.clone(), false));
        }

        let query = ContextQuery {
            max_id: Some(status.id.clone()),
        };
        let context = self.api.conversation_context(&status.id, &query)?;
        report.api_requests += 1;

        Ok(context
            .ancestors
            .into_iter()
            .next()
            .map_or_else(|| (status.clone(), true), |root| (root, false)))
    }
}
