//! Status and account records as returned by the conversation API.
//!
//! Only the fields the forest needs are interpreted: the status id, the
//! author's account id, and the id of the status being replied to. Everything
//! else is carried through untouched for the display layer.
//!
//! # Id ordering
//!
//! Status ids are opaque strings whose lexicographic order coincides with
//! chronological order (snowflake-style). [`Status`] ordering helpers and the
//! covered-range bookkeeping in [`crate::forest`] rely on this; comparisons
//! are plain byte-wise `str` ordering.

use serde::{Deserialize, Serialize};

/// The author of a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Instance-local account id.
    pub id: String,
    /// Bare username, without the instance domain.
    #[serde(default)]
    pub username: String,
    /// `user` for local accounts, `user@domain` for remote ones.
    #[serde(default)]
    pub acct: String,
}

impl Account {
    /// Build an account with only an id; the handle fields mirror it.
    #[must_use]
    pub fn with_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            username: id.clone(),
            acct: id.clone(),
            id,
        }
    }
}

/// A single post on the federated service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Opaque id; lexicographic order is chronological order.
    pub id: String,
    /// Who wrote it.
    pub account: Account,
    /// The status this one replies to, if any.
    #[serde(default)]
    pub in_reply_to_id: Option<String>,
    /// Rendered HTML body. Never interpreted by the forest.
    #[serde(default)]
    pub content: String,
    /// Content warning text, empty when absent.
    #[serde(default)]
    pub spoiler_text: String,
    /// RFC 3339 creation timestamp as sent by the server.
    #[serde(default)]
    pub created_at: Option<String>,
    /// Permalink to the status on its home instance.
    #[serde(default)]
    pub url: Option<String>,
}

impl Status {
    /// Build a minimal status. Mostly useful for tests and replay fixtures.
    #[must_use]
    pub fn new(id: impl Into<String>, author_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            account: Account::with_id(author_id),
            in_reply_to_id: None,
            content: String::new(),
            spoiler_text: String::new(),
            created_at: None,
            url: None,
        }
    }

    /// Builder-style setter for the parent id.
    #[must_use]
    pub fn replying_to(mut self, parent_id: impl Into<String>) -> Self {
        self.in_reply_to_id = Some(parent_id.into());
        self
    }

    /// Builder-style setter for the body.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// The author's account id.
    #[must_use]
    pub fn author_id(&self) -> &str {
        &self.account.id
    }

    /// The parent id, treating an empty string as "no parent".
    ///
    /// Some servers send `""` instead of `null` for top-level posts.
    #[must_use]
    pub fn parent_id(&self) -> Option<&str> {
        self.in_reply_to_id.as_deref().filter(|id| !id.is_empty())
    }

    /// Returns `true` if this status was written by `author_id`.
    #[must_use]
    pub fn is_by(&self, author_id: &str) -> bool {
        self.account.id == author_id
    }
}
