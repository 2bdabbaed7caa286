//! The reply forest: every thread the tracked author took part in.
//!
//! [`ForestState`] indexes statuses by id and records the reply structure as
//! a pair of mutually consistent maps (`child → parent` and
//! `parent → {children}`). Threads are identified by their **progenitor**,
//! the root status with no resolvable parent.
//!
//! # Invariants
//!
//! - The parent/child maps describe a forest: no id is reachable from itself.
//! - Every status is reachable from exactly one progenitor.
//! - Fold flags and descendant counts of a thread are recomputed as a whole
//!   whenever the thread gains a node (see [`crate::classify`]).
//!
//! Mutation is crate-private; only the ingestor grows the forest. Lookups
//! that the invariants guarantee go through the `*_guaranteed` accessors,
//! which turn an absent key into [`ForestError::MissingKey`] instead of
//! papering over corrupted state.
//!
//! [`ForestState::check_invariants`] re-verifies the whole structure and is
//! what tests and the CLI's debug dump use to inspect a live forest.

#![allow(clippy::module_name_repetitions)]

pub mod range;

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::error::ForestError;
use crate::model::Status;

pub use range::CoveredRange;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Descendant tallies for one status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DescendantCounts {
    /// Every status below this one.
    pub total: usize,
    /// Statuses below this one that stay visible when folded subtrees collapse.
    pub shown: usize,
}

impl DescendantCounts {
    /// Statuses hidden by folding.
    #[must_use]
    pub const fn hidden(&self) -> usize {
        self.total.saturating_sub(self.shown)
    }
}

/// What happened when the ingestor asked for a `child → parent` edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A new edge was recorded.
    Linked,
    /// The child left `from` for the new parent. The thread holding `from`
    /// has lost a subtree and needs reclassifying.
    Moved { from: String },
    /// The edge already existed.
    Unchanged,
    /// The edge was recorded and the child stopped being a progenitor.
    Demoted,
    /// The status names itself as parent; no edge recorded.
    SelfLoop,
    /// The parent already descends from the child; no edge recorded.
    WouldCycle,
}

impl LinkOutcome {
    /// Returns `true` if the edge was refused.
    #[must_use]
    pub const fn is_dropped(&self) -> bool {
        matches!(self, Self::SelfLoop | Self::WouldCycle)
    }
}

// ---------------------------------------------------------------------------
// ForestState
// ---------------------------------------------------------------------------

/// Mutable data model behind one author session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForestState {
    progenitor_ids: BTreeSet<String>,
    degraded_ids: BTreeSet<String>,
    id_to_status: BTreeMap<String, Status>,
    child_to_parent: BTreeMap<String, String>,
    parent_to_children: BTreeMap<String, BTreeSet<String>>,
    folded: BTreeMap<String, bool>,
    descendant_counts: BTreeMap<String, DescendantCounts>,
    covered_range: CoveredRange,
}

impl ForestState {
    /// Create an empty forest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of statuses in the forest.
    #[must_use]
    pub fn len(&self) -> usize {
        self.id_to_status.len()
    }

    /// Returns `true` if nothing has been ingested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id_to_status.is_empty()
    }

    /// Returns `true` if `id` has been merged.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.id_to_status.contains_key(id)
    }

    /// Thread roots, in ascending id order.
    #[must_use]
    pub const fn progenitor_ids(&self) -> &BTreeSet<String> {
        &self.progenitor_ids
    }

    /// Number of threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.progenitor_ids.len()
    }

    /// Thread roots newest first, the order threads are displayed in.
    #[must_use]
    pub fn threads_newest_first(&self) -> Vec<&str> {
        self.progenitor_ids.iter().rev().map(String::as_str).collect()
    }

    /// Progenitors that exist only because ancestor resolution came back empty.
    #[must_use]
    pub const fn degraded_ids(&self) -> &BTreeSet<String> {
        &self.degraded_ids
    }

    /// Returns `true` if `id` is a degraded progenitor.
    #[must_use]
    pub fn is_degraded(&self, id: &str) -> bool {
        self.degraded_ids.contains(id)
    }

    /// Look up a status.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<&Status> {
        self.id_to_status.get(id)
    }

    /// Look up a status the invariants say must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::MissingKey`] if `id` is absent.
    pub fn status_guaranteed(&self, id: &str) -> Result<&Status, ForestError> {
        self.id_to_status.get(id).ok_or_else(|| ForestError::MissingKey {
            map: "id_to_status",
            key: id.to_string(),
        })
    }

    /// Iterate every merged status in id order.
    pub fn statuses(&self) -> impl Iterator<Item = &Status> {
        self.id_to_status.values()
    }

    /// The recorded parent of `id`, if any.
    #[must_use]
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.child_to_parent.get(id).map(String::as_str)
    }

    /// Look up the parent status of a child that is known to have one.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::MissingKey`] if `child_id` has no recorded
    /// parent, or if the parent status itself is absent.
    pub fn parent_status_guaranteed(&self, child_id: &str) -> Result<&Status, ForestError> {
        let parent_id = self
            .child_to_parent
            .get(child_id)
            .ok_or_else(|| ForestError::MissingKey {
                map: "child_to_parent",
                key: child_id.to_string(),
            })?;
        self.status_guaranteed(parent_id)
    }

    /// Direct children of `id` in ascending id order.
    pub fn children_of(&self, id: &str) -> impl Iterator<Item = &str> {
        self.parent_to_children
            .get(id)
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Returns `true` if `id` has at least one recorded child.
    #[must_use]
    pub fn has_children(&self, id: &str) -> bool {
        self.parent_to_children
            .get(id)
            .is_some_and(|children| !children.is_empty())
    }

    /// Fold flag for `id`, once classified.
    #[must_use]
    pub fn is_folded(&self, id: &str) -> Option<bool> {
        self.folded.get(id).copied()
    }

    /// Descendant counts for `id`, once classified.
    #[must_use]
    pub fn counts(&self, id: &str) -> Option<DescendantCounts> {
        self.descendant_counts.get(id).copied()
    }

    /// The span of author status ids merged so far.
    #[must_use]
    pub const fn covered_range(&self) -> &CoveredRange {
        &self.covered_range
    }

    /// Walk up from `id` to its progenitor.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::MissingKey`] if `id` is not in the forest, or
    /// [`ForestError::CycleDetected`] if the walk revisits a status.
    pub fn progenitor_of(&self, id: &str) -> Result<&str, ForestError> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut current = self
            .id_to_status
            .get_key_value(id)
            .map(|(key, _)| key.as_str())
            .ok_or_else(|| ForestError::MissingKey {
                map: "id_to_status",
                key: id.to_string(),
            })?;

        while let Some(parent) = self.parent_of(current) {
            if !seen.insert(current) {
                return Err(ForestError::CycleDetected(current.to_string()));
            }
            current = parent;
        }

        Ok(current)
    }

    /// All ids in the subtree rooted at `root_id`, root first, depth first.
    ///
    /// # Errors
    ///
    /// Returns [`ForestError::CycleDetected`] if a status is reached twice.
    pub fn subtree_ids(&self, root_id: &str) -> Result<Vec<String>, ForestError> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![root_id];
        let mut result = Vec::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                return Err(ForestError::CycleDetected(current.to_string()));
            }
            result.push(current.to_string());
            // Reverse so the smallest child is visited first.
            let children: Vec<&str> = self.children_of(current).collect();
            stack.extend(children.into_iter().rev());
        }

        Ok(result)
    }

    /// Re-verify every structural invariant.
    ///
    /// Checks that the two link maps mirror each other, that every parent
    /// walk terminates, that each walk ends at a recorded progenitor, and that
    /// progenitors have no parent and exist as statuses.
    ///
    /// # Errors
    ///
    /// Returns the first breach found as a [`ForestError`].
    pub fn check_invariants(&self) -> Result<(), ForestError> {
        for (child, parent) in &self.child_to_parent {
            let mirrored = self
                .parent_to_children
                .get(parent)
                .is_some_and(|children| children.contains(child));
            if !mirrored {
                return Err(ForestError::MissingKey {
                    map: "parent_to_children",
                    key: child.clone(),
                });
            }
        }
        for (parent, children) in &self.parent_to_children {
            for child in children {
                if self.child_to_parent.get(child) != Some(parent) {
                    return Err(ForestError::MissingKey {
                        map: "child_to_parent",
                        key: child.clone(),
                    });
                }
            }
        }

        for progenitor in &self.progenitor_ids {
            self.status_guaranteed(progenitor)?;
            if self.child_to_parent.contains_key(progenitor) {
                return Err(ForestError::MissingKey {
                    map: "progenitor_ids",
                    key: progenitor.clone(),
                });
            }
        }

        for id in self.id_to_status.keys() {
            let root = self.progenitor_of(id)?;
            if !self.progenitor_ids.contains(root) {
                return Err(ForestError::MissingKey {
                    map: "progenitor_ids",
                    key: root.to_string(),
                });
            }
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Crate-private mutation
    // -----------------------------------------------------------------------

    pub(crate) fn extend_covered_range<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        self.covered_range.extend(ids);
    }

    /// Insert or overwrite a status.
    pub(crate) fn merge_status(&mut self, status: Status) {
        self.id_to_status.insert(status.id.clone(), status);
    }

    /// Record `id` as a thread root. Returns `true` if it was not one already.
    pub(crate) fn add_progenitor(&mut self, id: &str, degraded: bool) -> bool {
        if degraded {
            self.degraded_ids.insert(id.to_string());
        }
        self.progenitor_ids.insert(id.to_string())
    }

    /// Record `child → parent`, refusing any edge that would close a cycle.
    pub(crate) fn link(&mut self, child: &str, parent: &str) -> LinkOutcome {
        if child == parent {
            return LinkOutcome::SelfLoop;
        }
        if self.is_ancestor_or_self(child, parent) {
            return LinkOutcome::WouldCycle;
        }

        let moved_from = match self.child_to_parent.get(child) {
            Some(existing) if existing == parent => return LinkOutcome::Unchanged,
            Some(existing) => {
                let existing = existing.clone();
                self.unlink_child(&existing, child);
                Some(existing)
            }
            None => None,
        };

        self.child_to_parent
            .insert(child.to_string(), parent.to_string());
        self.parent_to_children
            .entry(parent.to_string())
            .or_default()
            .insert(child.to_string());

        let was_progenitor = self.progenitor_ids.remove(child);
        self.degraded_ids.remove(child);
        match moved_from {
            Some(from) => LinkOutcome::Moved { from },
            None if was_progenitor => LinkOutcome::Demoted,
            None => LinkOutcome::Linked,
        }
    }

    pub(crate) fn set_classification(&mut self, id: &str, folded: bool, counts: DescendantCounts) {
        self.folded.insert(id.to_string(), folded);
        self.descendant_counts.insert(id.to_string(), counts);
    }

    /// Returns `true` if `candidate` is `id` or lies on `id`'s parent chain.
    fn is_ancestor_or_self(&self, candidate: &str, id: &str) -> bool {
        let mut current = id;
        // A well-formed chain is never longer than the forest itself.
        for _ in 0..=self.child_to_parent.len() {
            if current == candidate {
                return true;
            }
            match self.parent_of(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
        true
    }

    fn unlink_child(&mut self, parent: &str, child: &str) {
        if let Some(children) = self.parent_to_children.get_mut(parent) {
            children.remove(child);
            if children.is_empty() {
                self.parent_to_children.remove(parent);
            }
        }
        self.child_to_parent.remove(child);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn forest_with(ids: &[&str]) -> ForestState {
        let mut forest = ForestState::new();
        for id in ids {
            forest.merge_status(Status::new(*id, "a"));
        }
        forest
    }

    #[test]
    fn link_is_mirrored_in_both_maps() {
        let mut forest = forest_with(&["1", "2"]);
        forest.add_progenitor("1", false);
        assert_eq!(forest.link("2", "1"), LinkOutcome::Linked);
        assert_eq!(forest.parent_of("2"), Some("1"));
        assert_eq!(forest.children_of("1").collect::<Vec<_>>(), ["2"]);
        forest.check_invariants().expect("consistent");
    }

    #[test]
    fn relinking_same_edge_is_unchanged() {
        let mut forest = forest_with(&["1", "2"]);
        forest.link("2", "1");
        assert_eq!(forest.link("2", "1"), LinkOutcome::Unchanged);
        assert_eq!(forest.children_of("1").count(), 1);
    }

    #[test]
    fn self_loop_is_refused() {
        let mut forest = forest_with(&["1"]);
        assert_eq!(forest.link("1", "1"), LinkOutcome::SelfLoop);
        assert_eq!(forest.parent_of("1"), None);
        assert!(!forest.has_children("1"));
    }

    #[test]
    fn longer_cycle_is_refused() {
        let mut forest = forest_with(&["1", "2", "3"]);
        forest.link("2", "1");
        forest.link("3", "2");
        assert_eq!(forest.link("1", "3"), LinkOutcome::WouldCycle);
        assert!(forest.link("1", "3").is_dropped());
        assert_eq!(forest.parent_of("1"), None);
    }

    #[test]
    fn moving_a_child_updates_old_parent() {
        let mut forest = forest_with(&["1", "2", "3"]);
        forest.link("3", "1");
        forest.link("3", "2");
        assert!(!forest.has_children("1"));
        assert_eq!(forest.children_of("2").collect::<Vec<_>>(), ["3"]);
    }

    #[test]
    fn linking_a_progenitor_demotes_it() {
        let mut forest = forest_with(&["1", "2"]);
        forest.add_progenitor("1", false);
        forest.add_progenitor("2", true);
        assert_eq!(forest.link("2", "1"), LinkOutcome::Demoted);
        assert_eq!(forest.thread_count(), 1);
        assert!(!forest.is_degraded("2"));
        forest.check_invariants().expect("consistent");
    }

    #[test]
    fn relinking_to_another_parent_moves_the_child() {
        let mut forest = forest_with(&["1", "2", "3"]);
        forest.add_progenitor("1", false);
        forest.add_progenitor("2", false);
        forest.link("3", "1");

        assert_eq!(
            forest.link("3", "2"),
            LinkOutcome::Moved { from: "1".to_string() }
        );
        assert_eq!(forest.parent_of("3"), Some("2"));
        assert!(!forest.has_children("1"));
        assert_eq!(forest.children_of("2").collect::<Vec<_>>(), ["3"]);
        forest.check_invariants().expect("consistent");
    }

    #[test]
    fn guaranteed_lookups_fail_loudly() {
        let forest = forest_with(&["1"]);
        let err = forest.status_guaranteed("nope").expect_err("absent");
        assert!(err.is_invariant_violation());

        let err = forest.parent_status_guaranteed("1").expect_err("no parent");
        assert!(matches!(
            err,
            ForestError::MissingKey { map: "child_to_parent", .. }
        ));
    }

    #[test]
    fn unreachable_status_breaks_invariants() {
        let forest = forest_with(&["1"]);
        let err = forest.check_invariants().expect_err("no progenitor");
        assert!(matches!(err, ForestError::MissingKey { map: "progenitor_ids", .. }));
    }

    #[test]
    fn subtree_is_depth_first_root_first() {
        let mut forest = forest_with(&["1", "2", "3", "4"]);
        forest.link("2", "1");
        forest.link("3", "2");
        forest.link("4", "1");
        assert_eq!(forest.subtree_ids("1").expect("subtree"), ["1", "2", "3", "4"]);
        assert_eq!(forest.progenitor_of("3").expect("root"), "1");
    }

    #[test]
    fn threads_are_listed_newest_first() {
        let mut forest = forest_with(&["1", "5", "3"]);
        for id in ["1", "5", "3"] {
            forest.add_progenitor(id, false);
        }
        assert_eq!(forest.threads_newest_first(), ["5", "3", "1"]);
    }

    #[test]
    fn hidden_count_never_underflows() {
        let counts = DescendantCounts { total: 3, shown: 1 };
        assert_eq!(counts.hidden(), 2);
        assert_eq!(DescendantCounts::default().hidden(), 0);
    }
}
