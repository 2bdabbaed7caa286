//! Target-seeking pagination over the author's own statuses.
//!
//! The [`Paginator`] owns the session's [`ForestState`] and exposes the four
//! loads behind the viewer's buttons:
//!
//! - [`Paginator::load_newest`] / [`Paginator::load_oldest`] discard the
//!   forest and ingest one page at the newest / oldest edge.
//! - [`Paginator::load_newer_threads`] / [`Paginator::load_older_threads`]
//!   keep fetching pages beyond the covered range until the forest has
//!   gained `n` threads or the source runs dry.
//!
//! One raw page can collapse into fewer new threads than it has statuses
//! (several of the author's replies may land in one known thread), so the
//! loop counts threads, not pages.
//!
//! Every load takes `&mut self`: there is only ever one writer. Callers that
//! share a paginator across threads put it behind a `Mutex`.

use serde::Serialize;
use tracing::{info, warn};

use crate::api::{ConversationApi, PageQuery};
use crate::error::ForestError;
use crate::forest::ForestState;
use crate::ingest::{IngestReport, Ingestor};

/// Cursor used to request the very first page of an account.
const OLDEST_CURSOR: &str = "0";

/// Which edge of the covered range a load extends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Newer,
    Older,
}

/// Summary of one pagination call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadOutcome {
    /// Account-status pages requested.
    pub fetches: usize,
    /// Net growth of the thread count.
    pub threads_added: usize,
    /// `true` if the source returned an empty page or stopped advancing.
    pub exhausted: bool,
    /// Ingestion tallies across every page.
    pub ingest: IngestReport,
}

/// Drives fetch-and-ingest cycles for one tracked author.
#[derive(Debug)]
pub struct Paginator<A> {
    api: A,
    account_id: String,
    page_limit: Option<u32>,
    forest: ForestState,
}

impl<A: ConversationApi> Paginator<A> {
    /// Start an empty session for `account_id`.
    pub fn new(api: A, account_id: impl Into<String>) -> Self {
        Self {
            api,
            account_id: account_id.into(),
            page_limit: None,
            forest: ForestState::new(),
        }
    }

    /// Set the page size sent with every account-status request.
    #[must_use]
    pub const fn with_page_limit(mut self, limit: Option<u32>) -> Self {
        self.page_limit = limit;
        self
    }

    /// The live forest.
    pub const fn forest(&self) -> &ForestState {
        &self.forest
    }

    /// The tracked author.
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Discard the forest and ingest the newest page.
    ///
    /// # Errors
    ///
    /// Propagates API failures and invariant violations from ingestion.
    pub fn load_newest(&mut self) -> Result<LoadOutcome, ForestError> {
        self.reload(PageQuery::newest())
    }

    /// Discard the forest and ingest the oldest page.
    ///
    /// # Errors
    ///
    /// Propagates API failures and invariant violations from ingestion.
    pub fn load_oldest(&mut self) -> Result<LoadOutcome, ForestError> {
        self.reload(PageQuery::newer_than(OLDEST_CURSOR))
    }

    /// Fetch pages newer than the covered range until `n` threads are added.
    ///
    /// # Errors
    ///
    /// Propagates API failures and invariant violations from ingestion.
    /// Pages ingested before the failure stay in the forest.
    pub fn load_newer_threads(&mut self, n: usize) -> Result<LoadOutcome, ForestError> {
        self.load_threads(Direction::Newer, n)
    }

    /// Fetch pages older than the covered range until `n` threads are added.
    ///
    /// # Errors
    ///
    /// Propagates API failures and invariant violations from ingestion.
    /// Pages ingested before the failure stay in the forest.
    pub fn load_older_threads(&mut self, n: usize) -> Result<LoadOutcome, ForestError> {
        self.load_threads(Direction::Older, n)
    }

    /// Dispatch on `direction`.
    ///
    /// # Errors
    ///
    /// See [`Paginator::load_newer_threads`].
    pub fn load_threads(
        &mut self,
        direction: Direction,
        n: usize,
    ) -> Result<LoadOutcome, ForestError> {
        let start = self.forest.thread_count();
        let target = start.saturating_add(n);
        let mut outcome = LoadOutcome::default();

        while self.forest.thread_count() < target {
            let query = self.next_query(direction);
            let page = self.api.account_statuses(&self.account_id, &query)?;
            outcome.fetches += 1;

            if page.is_empty() {
                outcome.exhausted = true;
                break;
            }

            let before = self.forest.covered_range().clone();
            let report = Ingestor::new(&self.api, &self.account_id).ingest(&mut self.forest, &page)?;
            outcome.ingest.absorb(&report);

            if *self.forest.covered_range() == before {
                warn!(
                    ?direction,
                    page = page.len(),
                    "page did not extend the covered range; treating source as exhausted"
                );
                outcome.exhausted = true;
                break;
            }
        }

        outcome.threads_added = self.forest.thread_count().saturating_sub(start);
        info!(
            ?direction,
            requested = n,
            added = outcome.threads_added,
            fetches = outcome.fetches,
            exhausted = outcome.exhausted,
            threads = self.forest.thread_count(),
            "loaded threads"
        );
        Ok(outcome)
    }

    fn reload(&mut self, query: PageQuery) -> Result<LoadOutcome, ForestError> {
        self.forest = ForestState::new();

        let query = query.with_limit(self.page_limit);
        let page = self.api.account_statuses(&self.account_id, &query)?;
        let ingest = Ingestor::new(&self.api, &self.account_id).ingest(&mut self.forest, &page)?;

        let outcome = LoadOutcome {
            fetches: 1,
            threads_added: self.forest.thread_count(),
            exhausted: page.is_empty(),
            ingest,
        };
        info!(
            cursor = ?query.min_id,
            statuses = page.len(),
            threads = outcome.threads_added,
            "reloaded forest"
        );
        Ok(outcome)
    }

    fn next_query(&self, direction: Direction) -> PageQuery {
        let range = self.forest.covered_range();
        let query = match direction {
            Direction::Newer => range.max.as_deref().map(PageQuery::newer_than),
            Direction::Older => range.min.as_deref().map(PageQuery::older_than),
        };
        query
            .unwrap_or_else(PageQuery::newest)
            .with_limit(self.page_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryApi;
    use crate::model::Status;

    const ME: &str = "me";

    const fn assert_send<T: Send>() {}

    #[test]
    fn paginator_is_send() {
        assert_send::<Paginator<MemoryApi>>();
        assert_send::<std::sync::Mutex<Paginator<MemoryApi>>>();
    }

    /// Ten standalone author posts, ids "00".."09".
    fn standalone_posts() -> MemoryApi {
        MemoryApi::new((0..10).map(|i| Status::new(format!("{i:02}"), ME)))
    }

    #[test]
    fn newest_loads_the_top_page() {
        let mut pager = Paginator::new(standalone_posts(), ME).with_page_limit(Some(3));
        let outcome = pager.load_newest().expect("load");

        assert_eq!(outcome.threads_added, 3);
        assert_eq!(pager.forest().threads_newest_first(), ["09", "08", "07"]);
        assert_eq!(pager.forest().covered_range().min.as_deref(), Some("07"));
    }

    #[test]
    fn oldest_loads_the_bottom_page() {
        let mut pager = Paginator::new(standalone_posts(), ME).with_page_limit(Some(3));
        pager.load_oldest().expect("load");
        assert_eq!(pager.forest().threads_newest_first(), ["02", "01", "00"]);
    }

    #[test]
    fn reload_discards_previous_forest() {
        let mut pager = Paginator::new(standalone_posts(), ME).with_page_limit(Some(3));
        pager.load_oldest().expect("load");
        pager.load_newest().expect("load");
        assert!(!pager.forest().contains("00"));
        assert_eq!(pager.forest().thread_count(), 3);
    }

    #[test]
    fn older_threads_extend_below_covered_range() {
        let mut pager = Paginator::new(standalone_posts(), ME).with_page_limit(Some(3));
        pager.load_newest().expect("load");
        let outcome = pager.load_older_threads(4).expect("load");

        assert_eq!(outcome.fetches, 2);
        assert_eq!(outcome.threads_added, 6);
        assert_eq!(pager.forest().covered_range().min.as_deref(), Some("01"));
    }

    #[test]
    fn newer_threads_stop_on_empty_page() {
        let mut pager = Paginator::new(standalone_posts(), ME).with_page_limit(Some(4));
        pager.load_oldest().expect("load");
        let outcome = pager.load_newer_threads(100).expect("load");

        assert!(outcome.exhausted);
        assert_eq!(pager.forest().thread_count(), 10);
        // One full page, one short page, then the empty page.
        assert_eq!(outcome.fetches, 3);
    }

    #[test]
    fn zero_threads_requested_fetches_nothing() {
        let mut pager = Paginator::new(standalone_posts(), ME);
        let outcome = pager.load_newer_threads(0).expect("load");
        assert_eq!(outcome.fetches, 0);
        assert!(pager.forest().is_empty());
    }

    /// Ignores every cursor and always serves the same page.
    struct StuckApi(MemoryApi);

    impl ConversationApi for StuckApi {
        fn account_statuses(
            &self,
            account_id: &str,
            _query: &PageQuery,
        ) -> Result<Vec<Status>, crate::api::ApiError> {
            self.0.account_statuses(account_id, &PageQuery::newest())
        }

        fn conversation_context(
            &self,
            status_id: &str,
            query: &crate::api::ContextQuery,
        ) -> Result<crate::api::ConversationContext, crate::api::ApiError> {
            self.0.conversation_context(status_id, query)
        }
    }

    #[test]
    fn stalled_cursor_is_treated_as_exhausted() {
        let mut pager = Paginator::new(StuckApi(standalone_posts()), ME);
        pager.load_newest().expect("load");
        let outcome = pager.load_older_threads(5).expect("load");

        assert!(outcome.exhausted);
        assert_eq!(outcome.fetches, 1);
        assert_eq!(outcome.threads_added, 0);
    }
}
