//! The remote conversation API the forest is grown from.
//!
//! Ingestion needs exactly two upstream operations:
//!
//! - [`ConversationApi::account_statuses`]: one page of an account's own
//!   statuses, bounded by `min_id` / `max_id` cursors.
//! - [`ConversationApi::conversation_context`]: the ancestor chain and the
//!   descendant set of one status.
//!
//! Calls are blocking and issued one at a time by the ingestor; retry and
//! timeout policy belongs to the implementation.
//!
//! [`MemoryApi`] serves a fixed status set with upstream cursor semantics and
//! backs both the test suite and offline replay.

pub mod memory;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::model::Status;

pub use memory::MemoryApi;

/// Cursor and size for one page of account statuses.
///
/// `min_id` asks for the page immediately newer than the cursor; `max_id`
/// asks for the newest page strictly older than it. Both are exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub min_id: Option<String>,
    pub max_id: Option<String>,
    pub limit: Option<u32>,
}

impl PageQuery {
    /// The newest page, no cursor.
    #[must_use]
    pub fn newest() -> Self {
        Self::default()
    }

    /// The page immediately newer than `id`.
    #[must_use]
    pub fn newer_than(id: impl Into<String>) -> Self {
        Self {
            min_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// The newest page strictly older than `id`.
    #[must_use]
    pub fn older_than(id: impl Into<String>) -> Self {
        Self {
            max_id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Attach a page size. `None` leaves the server default.
    #[must_use]
    pub const fn with_limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }
}

/// Options for a conversation-context request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextQuery {
    /// Only return context statuses with ids at or below this one.
    pub max_id: Option<String>,
}

/// Ancestors (root first) and descendants of one status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationContext {
    #[serde(default)]
    pub ancestors: Vec<Status>,
    #[serde(default)]
    pub descendants: Vec<Status>,
}

/// Failures reported by a [`ConversationApi`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Transport failure or non-success HTTP status.
    #[error("request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    /// The response body could not be decoded.
    #[error("malformed response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    /// The requested account or status does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// A handle lookup matched no account.
    #[error("no account matches '{0}'")]
    AccountNotFound(String),
}

impl ApiError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Request { .. } => ErrorCode::ApiRequestFailed,
            Self::Decode { .. } => ErrorCode::ApiDecodeFailed,
            Self::NotFound(_) => ErrorCode::StatusNotFound,
            Self::AccountNotFound(_) => ErrorCode::AccountNotFound,
        }
    }
}

/// The two upstream operations ingestion and pagination consume.
pub trait ConversationApi {
    /// Fetch one page of `account_id`'s own statuses.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails or cannot be decoded.
    fn account_statuses(&self, account_id: &str, query: &PageQuery)
    -> Result<Vec<Status>, ApiError>;

    /// Fetch the ancestors and descendants of `status_id`.
    ///
    /// # Errors
    ///
    /// Returns an [`ApiError`] if the request fails, the status is unknown,
    /// or the response cannot be decoded.
    fn conversation_context(
        &self,
        status_id: &str,
        query: &ContextQuery,
    ) -> Result<ConversationContext, ApiError>;
}

impl<T: ConversationApi + ?Sized> ConversationApi for &T {
    fn account_statuses(
        &self,
        account_id: &str,
        query: &PageQuery,
    ) -> Result<Vec<Status>, ApiError> {
        (**self).account_statuses(account_id, query)
    }

    fn conversation_context(
        &self,
        status_id: &str,
        query: &ContextQuery,
    ) -> Result<ConversationContext, ApiError> {
        (**self).conversation_context(status_id, query)
    }
}

impl<T: ConversationApi + ?Sized> ConversationApi for Box<T> {
    fn account_statuses(
        &self,
        account_id: &str,
        query: &PageQuery,
    ) -> Result<Vec<Status>, ApiError> {
        (**self).account_statuses(account_id, query)
    }

    fn conversation_context(
        &self,
        status_id: &str,
        query: &ContextQuery,
    ) -> Result<ConversationContext, ApiError> {
        (**self).conversation_context(status_id, query)
    }
}
