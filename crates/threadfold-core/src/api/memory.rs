//! In-memory [`ConversationApi`] over a fixed set of statuses.
//!
//! Page semantics follow the upstream service:
//!
//! - no cursor or `max_id`: the newest `limit` statuses below the cursor,
//!   newest first;
//! - `min_id`: the `limit` statuses immediately above the cursor, newest
//!   first.
//!
//! Context requests walk `in_reply_to_id` links. Ancestors stop at the first
//! parent that is not in the set, so a status whose parent is missing has an
//! empty ancestor chain even though it is a reply.

use std::cell::Cell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::model::Status;

use super::{ApiError, ContextQuery, ConversationApi, ConversationContext, PageQuery};

/// Page size when the query carries no limit.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
/// Largest page the upstream service will return.
pub const MAX_PAGE_LIMIT: u32 = 40;

/// Serves statuses from memory and counts the requests made against it.
#[derive(Debug, Default)]
pub struct MemoryApi {
    statuses: BTreeMap<String, Status>,
    failing_context: HashSet<String>,
    page_requests: Cell<usize>,
    context_requests: Cell<usize>,
}

impl MemoryApi {
    /// Build from any collection of statuses. Later duplicates win.
    #[must_use]
    pub fn new(statuses: impl IntoIterator<Item = Status>) -> Self {
        Self {
            statuses: statuses
                .into_iter()
                .map(|status| (status.id.clone(), status))
                .collect(),
            ..Self::default()
        }
    }

    /// Build from a JSON array of statuses, e.g. a saved replay file.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Decode`] if `raw` is not a JSON array of statuses.
    pub fn from_json(raw: &str) -> Result<Self, ApiError> {
        let statuses: Vec<Status> =
            serde_json::from_str(raw).map_err(|err| ApiError::Decode {
                endpoint: "replay".to_string(),
                message: err.to_string(),
            })?;
        Ok(Self::new(statuses))
    }

    /// Make every context request for `status_id` fail with a request error.
    #[must_use]
    pub fn with_failing_context(mut self, status_id: impl Into<String>) -> Self {
        self.failing_context.insert(status_id.into());
        self
    }

    /// Add or replace a status after construction.
    pub fn insert(&mut self, status: Status) {
        self.statuses.insert(status.id.clone(), status);
    }

    /// Number of account-status page requests served so far.
    #[must_use]
    pub fn page_requests(&self) -> usize {
        self.page_requests.get()
    }

    /// Number of conversation-context requests served so far.
    #[must_use]
    pub fn context_requests(&self) -> usize {
        self.context_requests.get()
    }

    fn ancestors_of(&self, status: &Status) -> Vec<Status> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([status.id.as_str()]);
        let mut next = status.parent_id();

        while let Some(parent_id) = next {
            if !seen.insert(parent_id) {
                break; // malformed fixture loops back on itself
            }
            let Some(parent) = self.statuses.get(parent_id) else {
                break;
            };
            chain.push(parent.clone());
            next = parent.parent_id();
        }

        chain.reverse();
        chain
    }

    fn descendants_of(&self, root_id: &str) -> Vec<Status> {
        let mut children: HashMap<&str, Vec<&Status>> = HashMap::new();
        for status in self.statuses.values() {
            if let Some(parent_id) = status.parent_id() {
                children.entry(parent_id).or_default().push(status);
            }
        }

        let mut found = Vec::new();
        let mut seen = HashSet::from([root_id]);
        let mut queue = VecDeque::from([root_id]);

        while let Some(current) = queue.pop_front() {
            for child in children.get(current).into_iter().flatten() {
                if seen.insert(child.id.as_str()) {
                    found.push((*child).clone());
                    queue.push_back(child.id.as_str());
                }
            }
        }

        found.sort_by(|a, b| a.id.cmp(&b.id));
        found
    }
}

impl ConversationApi for MemoryApi {
    fn account_statuses(
        &self,
        account_id: &str,
        query: &PageQuery,
    ) -> Result<Vec<Status>, ApiError> {
        self.page_requests.set(self.page_requests.get() + 1);

        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT) as usize;

        let in_window = |status: &&Status| {
            status.is_by(account_id)
                && query.min_id.as_deref().is_none_or(|min| status.id.as_str() > min)
                && query.max_id.as_deref().is_none_or(|max| status.id.as_str() < max)
        };

        let mut page: Vec<Status> = if query.min_id.is_some() {
            self.statuses
                .values()
                .filter(in_window)
                .take(limit)
                .cloned()
                .collect()
        } else {
            self.statuses
                .values()
                .rev()
                .filter(in_window)
                .take(limit)
                .cloned()
                .collect()
        };

        page.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(page)
    }

    fn conversation_context(
        &self,
        status_id: &str,
        query: &ContextQuery,
    ) -> Result<ConversationContext, ApiError> {
        self.context_requests.set(self.context_requests.get() + 1);

        if self.failing_context.contains(status_id) {
            return Err(ApiError::Request {
                endpoint: format!("statuses/{status_id}/context"),
                message: "injected failure".to_string(),
            });
        }

        let status = self
            .statuses
            .get(status_id)
            .ok_or_else(|| ApiError::NotFound(status_id.to_string()))?;

        let below_cap =
            |s: &Status| query.max_id.as_deref().is_none_or(|max| s.id.as_str() <= max);

        Ok(ConversationContext {
            ancestors: self
                .ancestors_of(status)
                .into_iter()
                .filter(|s| below_cap(s))
                .collect(),
            descendants: self
                .descendants_of(status_id)
                .into_iter()
                .filter(|s| below_cap(s))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(statuses: &[Status]) -> Vec<&str> {
        statuses.iter().map(|s| s.id.as_str()).collect()
    }

    fn api() -> MemoryApi {
        MemoryApi::new([
            Status::new("01", "me"),
            Status::new("02", "other").replying_to("01"),
            Status::new("03", "me").replying_to("02"),
            Status::new("04", "me"),
            Status::new("05", "other").replying_to("03"),
            Status::new("06", "me"),
        ])
    }

    #[test]
    fn newest_page_is_newest_first_and_author_only() {
        let api = api();
        let page = api
            .account_statuses("me", &PageQuery::newest().with_limit(Some(2)))
            .expect("page");
        assert_eq!(ids(&page), ["06", "04"]);
        assert_eq!(api.page_requests(), 1);
    }

    #[test]
    fn min_id_returns_page_adjacent_above_cursor() {
        let api = api();
        let page = api
            .account_statuses("me", &PageQuery::newer_than("01").with_limit(Some(2)))
            .expect("page");
        assert_eq!(ids(&page), ["04", "03"]);
    }

    #[test]
    fn max_id_is_exclusive() {
        let api = api();
        let page = api
            .account_statuses("me", &PageQuery::older_than("04"))
            .expect("page");
        assert_eq!(ids(&page), ["03", "01"]);
    }

    #[test]
    fn exhausted_cursor_yields_empty_page() {
        let api = api();
        let page = api
            .account_statuses("me", &PageQuery::newer_than("06"))
            .expect("page");
        assert!(page.is_empty());
    }

    #[test]
    fn context_has_root_first_ancestors_and_all_descendants() {
        let api = api();
        let ctx = api
            .conversation_context("03", &ContextQuery::default())
            .expect("context");
        assert_eq!(ids(&ctx.ancestors), ["01", "02"]);
        assert_eq!(ids(&ctx.descendants), ["05"]);

        let root = api
            .conversation_context("01", &ContextQuery::default())
            .expect("context");
        assert!(root.ancestors.is_empty());
        assert_eq!(ids(&root.descendants), ["02", "03", "05"]);
        assert_eq!(api.context_requests(), 2);
    }

    #[test]
    fn missing_parent_gives_empty_ancestors() {
        let api = MemoryApi::new([Status::new("10", "me").replying_to("gone")]);
        let ctx = api
            .conversation_context("10", &ContextQuery::default())
            .expect("context");
        assert!(ctx.ancestors.is_empty());
    }

    #[test]
    fn unknown_status_is_not_found() {
        let err = api()
            .conversation_context("99", &ContextQuery::default())
            .expect_err("should fail");
        assert!(matches!(err, ApiError::NotFound(id) if id == "99"));
    }

    #[test]
    fn injected_failure_is_a_request_error() {
        let api = api().with_failing_context("01");
        let err = api
            .conversation_context("01", &ContextQuery::default())
            .expect_err("should fail");
        assert!(matches!(err, ApiError::Request { .. }));
    }

    #[test]
    fn replay_json_round_trips_into_pages() {
        let raw = r#"[
            {"id": "1", "account": {"id": "me"}},
            {"id": "2", "account": {"id": "me"}, "in_reply_to_id": "1"}
        ]"#;
        let api = MemoryApi::from_json(raw).expect("replay");
        let page = api
            .account_statuses("me", &PageQuery::newest())
            .expect("page");
        assert_eq!(ids(&page), ["2", "1"]);

        assert!(matches!(
            MemoryApi::from_json("{}"),
            Err(ApiError::Decode { .. })
        ));
    }
}
