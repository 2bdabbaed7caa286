use serde::{Deserialize, Serialize};

/// The span of the author's own status ids merged so far.
///
/// Both ends are inclusive and compared lexicographically. The range only
/// ever widens; it is the cursor source for "newer" and "older" pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoveredRange {
    pub min: Option<String>,
    pub max: Option<String>,
}

impl CoveredRange {
    /// Returns `true` until the first id is recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Widen the range to include every id in `ids`.
    pub fn extend<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            if self.min.as_deref().is_none_or(|min| id < min) {
                self.min = Some(id.to_string());
            }
            if self.max.as_deref().is_none_or(|max| id > max) {
                self.max = Some(id.to_string());
            }
        }
    }

    /// Returns `true` if `id` lies within the range.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        match (self.min.as_deref(), self.max.as_deref()) {
            (Some(min), Some(max)) => min <= id && id <= max,
            _ => false,
        }
    }
}
