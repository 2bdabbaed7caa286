//! Fold classification and descendant counting.
//!
//! A status is **folded** when neither it nor anything below it was written
//! by the tracked author; its whole subtree may then collapse in display.
//! Because a node's fold decision depends on every descendant, the traversal
//! is post-order: children are classified before their parent.
//!
//! For each node:
//!
//! - `has_author` = own authorship OR any child's `has_author`
//! - `total` = number of children + Σ child `total`
//! - `shown` = number of unfolded children + Σ child `shown`
//! - `folded` = `!has_author`
//!
//! The reduction over children is commutative, so the result does not depend
//! on sibling order.
//!
//! The traversal uses an explicit stack rather than native recursion, since
//! federated reply chains may nest arbitrarily deep. It performs no I/O.

use std::collections::{HashMap, HashSet};

use crate::error::ForestError;
use crate::forest::{DescendantCounts, ForestState};

/// Result of classifying one subtree root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub counts: DescendantCounts,
    /// `true` if the tracked author wrote this status or any descendant.
    pub has_author: bool,
}

impl Classification {
    /// The fold flag implied by this classification.
    #[must_use]
    pub const fn folded(&self) -> bool {
        !self.has_author
    }
}

enum Visit {
    Enter(String),
    Exit(String),
}

/// Recompute fold flags and counts for every node in the subtree at `root_id`.
///
/// Writes each node's fold flag and [`DescendantCounts`] into `forest` and
/// returns the root's [`Classification`].
///
/// # Errors
///
/// Returns [`ForestError::MissingKey`] if a linked status is absent from the
/// forest, or [`ForestError::CycleDetected`] if a status is reached twice.
/// Either means the forest is corrupt.
pub fn classify(
    forest: &mut ForestState,
    root_id: &str,
    author_id: &str,
) -> Result<Classification, ForestError> {
    let mut finished: HashMap<String, Classification> = HashMap::new();
    let mut entered: HashSet<String> = HashSet::new();
    let mut stack = vec![Visit::Enter(root_id.to_string())];

    while let Some(visit) = stack.pop() {
        match visit {
            Visit::Enter(id) => {
                if !entered.insert(id.clone()) {
                    return Err(ForestError::CycleDetected(id));
                }
                let children: Vec<String> =
                    forest.children_of(&id).map(str::to_string).collect();
                stack.push(Visit::Exit(id));
                stack.extend(children.into_iter().map(Visit::Enter));
            }
            Visit::Exit(id) => {
                let mut result = Classification {
                    counts: DescendantCounts::default(),
                    has_author: forest.status_guaranteed(&id)?.is_by(author_id),
                };

                for child in forest.children_of(&id) {
                    let child_result =
                        finished
                            .remove(child)
                            .ok_or_else(|| ForestError::MissingKey {
                                map: "classification",
                                key: child.to_string(),
                            })?;
                    result.has_author |= child_result.has_author;
                    result.counts.total += 1 + child_result.counts.total;
                    result.counts.shown +=
                        usize::from(!child_result.folded()) + child_result.counts.shown;
                }

                forest.set_classification(&id, result.folded(), result.counts);
                finished.insert(id, result);
            }
        }
    }

    finished
        .remove(root_id)
        .ok_or_else(|| ForestError::MissingKey {
            map: "classification",
            key: root_id.to_string(),
        })
}

/// Reclassify every thread in the forest.
///
/// Threads never share nodes, so each is classified independently.
///
/// # Errors
///
/// Propagates the first error from [`classify`].
pub fn classify_all(forest: &mut ForestState, author_id: &str) -> Result<(), ForestError> {
    let roots: Vec<String> = forest.progenitor_ids().iter().cloned().collect();
    for root in roots {
        classify(forest, &root, author_id)?;
    }
    Ok(())
}
